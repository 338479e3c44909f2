// 💳 BIN Records - Typed rows of the BIN table
// One record per BIN range (or exact prefix when bin_start == bin_end)
//
// Problem solved:
// - Source datasets are merged from several providers with loose, free-text
//   columns ("VISA", "Visa Inc", "AMEX", ...) and plenty of blanks
// - Every field here is typed; blanks become the explicit UNKNOWN sentinel
//   instead of nulls leaking into responses

use serde::{Deserialize, Serialize};

/// Sentinel for fields absent in the source data - never null-propagated
pub const UNKNOWN: &str = "UNKNOWN";

/// Width of the table's lookup key, in digits
pub const KEY_WIDTH: usize = 6;

// ============================================================================
// CARD BRAND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    AmericanExpress,
    Discover,
    DinersClub,
    Jcb,
    UnionPay,
    Maestro,
    Unknown,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "VISA",
            CardBrand::Mastercard => "MASTERCARD",
            CardBrand::AmericanExpress => "AMERICAN EXPRESS",
            CardBrand::Discover => "DISCOVER",
            CardBrand::DinersClub => "DINERS CLUB",
            CardBrand::Jcb => "JCB",
            CardBrand::UnionPay => "UNIONPAY",
            CardBrand::Maestro => "MAESTRO",
            CardBrand::Unknown => UNKNOWN,
        }
    }

    /// Parse the free-text brand column of merged BIN datasets.
    ///
    /// Matching is deliberately loose: "AMEX", "American Express Company"
    /// and "AMERICAN EXPRESS" all map to the same brand. Maestro is checked
    /// before Mastercard so "MAESTRO" never falls through on "MASTER".
    pub fn parse(text: &str) -> CardBrand {
        let upper = text.trim().to_uppercase();

        if upper.is_empty() {
            CardBrand::Unknown
        } else if upper.contains("AMERICAN EXPRESS") || upper.contains("AMEX") {
            CardBrand::AmericanExpress
        } else if upper.contains("DINERS") {
            CardBrand::DinersClub
        } else if upper.contains("DISCOVER") {
            CardBrand::Discover
        } else if upper.contains("MAESTRO") {
            CardBrand::Maestro
        } else if upper.contains("MASTER") {
            CardBrand::Mastercard
        } else if upper.contains("VISA") {
            CardBrand::Visa
        } else if upper.contains("JCB") {
            CardBrand::Jcb
        } else if upper.contains("UNIONPAY") || upper.contains("UNION PAY") {
            CardBrand::UnionPay
        } else {
            CardBrand::Unknown
        }
    }
}

// ============================================================================
// CARD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Credit,
    Debit,
    Prepaid,
    Unknown,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Credit => "CREDIT",
            CardType::Debit => "DEBIT",
            CardType::Prepaid => "PREPAID",
            CardType::Unknown => UNKNOWN,
        }
    }

    pub fn parse(text: &str) -> CardType {
        let upper = text.trim().to_uppercase();

        if upper.contains("PREPAID") {
            CardType::Prepaid
        } else if upper.contains("DEBIT") {
            CardType::Debit
        } else if upper.contains("CREDIT") {
            CardType::Credit
        } else {
            CardType::Unknown
        }
    }
}

// ============================================================================
// BIN RECORD
// ============================================================================

/// One row of the BIN table.
///
/// `bin_start`/`bin_end` are numeric 6-digit keys; an exact (unranged) BIN
/// has bin_start == bin_end. All descriptive fields default to UNKNOWN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinRecord {
    pub bin_start: u32,
    pub bin_end: u32,
    pub brand: CardBrand,
    pub card_type: CardType,
    pub category: String,
    pub issuer: String,
    pub country: String,
    pub country_code: String,
    pub currency: String,
    pub bank_phone: String,
    pub bank_url: String,
}

impl BinRecord {
    /// Exact-prefix record (bin_start == bin_end), all metadata UNKNOWN
    pub fn exact(bin: u32) -> Self {
        BinRecord {
            bin_start: bin,
            bin_end: bin,
            brand: CardBrand::Unknown,
            card_type: CardType::Unknown,
            category: UNKNOWN.to_string(),
            issuer: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN.to_string(),
            currency: UNKNOWN.to_string(),
            bank_phone: UNKNOWN.to_string(),
            bank_url: UNKNOWN.to_string(),
        }
    }

    /// Ranged record, all metadata UNKNOWN
    pub fn ranged(bin_start: u32, bin_end: u32) -> Self {
        let mut record = BinRecord::exact(bin_start);
        record.bin_end = bin_end;
        record
    }

    /// True when the 6-digit key falls inside this record's range
    pub fn contains(&self, key: u32) -> bool {
        self.bin_start <= key && key <= self.bin_end
    }

    /// Range width (1 for exact records) - used for specificity tie-breaks
    pub fn width(&self) -> u32 {
        self.bin_end - self.bin_start + 1
    }

    /// Display form of the key: "400000" or "400000-400999"
    pub fn bin_display(&self) -> String {
        if self.bin_start == self.bin_end {
            format!("{:0width$}", self.bin_start, width = KEY_WIDTH)
        } else {
            format!(
                "{:0width$}-{:0width$}",
                self.bin_start,
                self.bin_end,
                width = KEY_WIDTH
            )
        }
    }
}

/// Normalize a loose source value: trimmed, empty/placeholder -> UNKNOWN
pub fn normalize_field(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "-" {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

// ============================================================================
// CSV ROW (source dataset shape)
// ============================================================================

/// Raw CSV row as exported by the merged BIN datasets.
///
/// Column aliases cover the two provider schemas we merge: one uses
/// `category`/`alpha_2`, the other `level`/`country_code`.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvBinRow {
    pub bin: String,

    #[serde(default)]
    pub bin_end: Option<String>,

    #[serde(default)]
    pub brand: String,

    #[serde(default, rename = "type")]
    pub card_type: String,

    #[serde(default, alias = "level")]
    pub category: String,

    #[serde(default, alias = "bank")]
    pub issuer: String,

    #[serde(default, alias = "country_name")]
    pub country: String,

    #[serde(default, alias = "alpha_2")]
    pub country_code: String,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub bank_phone: String,

    #[serde(default)]
    pub bank_url: String,
}

// ============================================================================
// TESTS
// ============================================================================
