// 📅 Expiry Derivation - Future-dated month/year per card type
//
// Prepaid products carry shorter validity windows (12-24 months ahead);
// everything else gets 36-60. Both brackets start at or past a full year,
// so a derived expiry is strictly future by construction.

use crate::record::CardType;
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const PREPAID_MONTHS_MIN: u32 = 12;
const PREPAID_MONTHS_MAX: u32 = 24;
const STANDARD_MONTHS_MIN: u32 = 36;
const STANDARD_MONTHS_MAX: u32 = 60;

// ============================================================================
// EXPIRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expiry {
    /// 1-12
    pub month: u32,
    pub year: i32,
}

impl Expiry {
    /// Calendar month `months_ahead` after `now` (real month arithmetic,
    /// not the 30-day-month approximation)
    pub fn months_from(now: DateTime<Utc>, months_ahead: u32) -> Expiry {
        let total = now.year() * 12 + now.month0() as i32 + months_ahead as i32;
        Expiry {
            month: (total % 12) as u32 + 1,
            year: total / 12,
        }
    }

    /// Strictly after `now`'s calendar month
    pub fn is_future(&self, now: DateTime<Utc>) -> bool {
        (self.year, self.month) > (now.year(), now.month())
    }

    /// Whole months between `now`'s month and this expiry
    pub fn months_after(&self, now: DateTime<Utc>) -> i32 {
        (self.year * 12 + self.month as i32 - 1) - (now.year() * 12 + now.month0() as i32)
    }
}

impl std::fmt::Display for Expiry {
    /// "MM/YYYY" - the form the original service printed and the seeded
    /// CVV derivation hashes
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

// ============================================================================
// DERIVATION
// ============================================================================

/// Derive an expiry for the card type, relative to the current time
pub fn derive_expiry(card_type: CardType) -> Expiry {
    derive_expiry_at(card_type, Utc::now(), &mut rand::rng())
}

/// Deterministic form: explicit clock and RNG (used by tests)
pub fn derive_expiry_at(
    card_type: CardType,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Expiry {
    let months_ahead = match card_type {
        CardType::Prepaid => rng.random_range(PREPAID_MONTHS_MIN..=PREPAID_MONTHS_MAX),
        _ => rng.random_range(STANDARD_MONTHS_MIN..=STANDARD_MONTHS_MAX),
    };

    Expiry::months_from(now, months_ahead)
}

// ============================================================================
// TESTS
// ============================================================================
