// Cardforge - Core Library
// BIN lookup + test-card generation; exposed for the CLI, API server, and tests

pub mod avs;
pub mod cvv;
pub mod error;
pub mod expiry;
pub mod generator;
pub mod luhn;
pub mod record;
pub mod store;
pub mod table;

// Re-export commonly used types
pub use error::{CardError, Result, MAX_BATCH};
pub use expiry::{derive_expiry, Expiry};
pub use generator::{CardGenerator, GenerateOptions, GeneratedCard, DIGIT_FREQUENCY_CAP};
pub use luhn::{compute_check_digit, is_valid_luhn};
pub use record::{BinRecord, CardBrand, CardType, KEY_WIDTH, UNKNOWN};
pub use store::{import_csv, insert_blocked, load_table, setup_database, verify_count};
pub use table::{
    normalize_prefix, BinFilter, BinTable, TableStats, SEARCH_LIMIT_DEFAULT, SEARCH_LIMIT_MAX,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
