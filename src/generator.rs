// 🎲 Card Number Generator - Weighted synthesis with pattern rejection
//
// Pipeline per card:
// 1. Resolve BIN metadata (blocked check, table lookup - unmatched BINs
//    proceed with UNKNOWN metadata, marked)
// 2. Pick the target length from brand/type
// 3. Synthesize filler digits: weighted toward 0-5, no 3-runs, each digit
//    value capped at 2 occurrences, bounded redraws
// 4. Append the Luhn check digit
// 5. Derive expiry and CVV per the request options

use crate::avs;
use crate::cvv;
use crate::error::{CardError, Result, MAX_BATCH};
use crate::expiry::derive_expiry_at;
use crate::luhn;
use crate::record::{BinRecord, CardBrand, CardType, UNKNOWN};
use crate::table::BinTable;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sampling table for filler digits: 0-5 appear twice (weight 2),
/// 6-9 once (weight 1) - the low-digit skew observed on real cards
const WEIGHTED_DIGITS: [u8; 16] = [0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7, 8, 9];

/// Max occurrences of any digit value within the filler region
pub const DIGIT_FREQUENCY_CAP: usize = 2;

/// Redraw budget per filler digit before the documented fallback kicks in
const MAX_REDRAWS: usize = 32;

/// Caller-supplied length overrides must stay in real card-number bounds
const LENGTH_MIN: usize = 12;
const LENGTH_MAX: usize = 19;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateOptions {
    /// Override the brand-derived target length (12-19)
    #[serde(default)]
    pub length: Option<usize>,

    #[serde(default = "default_true")]
    pub include_cvv: bool,

    #[serde(default = "default_true")]
    pub include_expiry: bool,

    /// Seeded CVVs reproduce across runs for identical number + expiry
    #[serde(default = "default_true")]
    pub seeded_cvv: bool,

    #[serde(default)]
    pub include_avs: bool,

    #[serde(default)]
    pub avs_country: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            length: None,
            include_cvv: true,
            include_expiry: true,
            seeded_cvv: true,
            include_avs: false,
            avs_country: None,
        }
    }
}

// ============================================================================
// GENERATED CARD
// ============================================================================

/// Ephemeral generation result - returned, never stored
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCard {
    pub number: String,

    /// The prefix the caller supplied (6-8 digits)
    pub bin: String,

    /// Verified against the Luhn validator, not assumed
    pub luhn_valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvv: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<i32>,

    // Metadata copied from the matched record (UNKNOWN when unmatched)
    pub brand: String,
    pub issuer: String,
    pub card_type: String,
    pub country: String,
    pub country_code: String,

    /// False when the BIN had no table match and defaults were used
    pub bin_matched: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl GeneratedCard {
    /// Display spacing: Amex-style 4-6-5 for 15 digits, groups of 4 otherwise
    pub fn formatted_number(&self) -> String {
        if self.number.len() == 15 {
            format!(
                "{} {} {}",
                &self.number[..4],
                &self.number[4..10],
                &self.number[10..]
            )
        } else {
            self.number
                .as_bytes()
                .chunks(4)
                .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Card generator over an injected, read-only BIN table.
///
/// Stateless per call: safe to share across request handlers.
pub struct CardGenerator<'a> {
    table: &'a BinTable,
}

impl<'a> CardGenerator<'a> {
    pub fn new(table: &'a BinTable) -> Self {
        CardGenerator { table }
    }

    /// Generate one card for the BIN prefix
    pub fn generate(&self, bin: &str, options: &GenerateOptions) -> Result<GeneratedCard> {
        self.generate_at(bin, options, Utc::now(), &mut rand::rng())
    }

    /// Batch form; the count is bounded and never partially fulfilled
    pub fn generate_many(
        &self,
        bin: &str,
        count: usize,
        options: &GenerateOptions,
    ) -> Result<Vec<GeneratedCard>> {
        if count == 0 {
            return Err(CardError::InvalidInput(
                "count must be at least 1".to_string(),
            ));
        }
        if count > MAX_BATCH {
            return Err(CardError::BatchLimitExceeded {
                requested: count,
                limit: MAX_BATCH,
            });
        }

        let now = Utc::now();
        let mut rng = rand::rng();

        (0..count)
            .map(|_| self.generate_at(bin, options, now, &mut rng))
            .collect()
    }

    /// Deterministic form: explicit clock and RNG
    fn generate_at(
        &self,
        bin: &str,
        options: &GenerateOptions,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<GeneratedCard> {
        let bin = validate_bin_prefix(bin)?;

        if let Some(reason) = self.table.blocked_reason(bin)? {
            return Err(CardError::BlockedBin {
                bin: bin.to_string(),
                reason: reason.to_string(),
            });
        }

        // NotFound is fine here: generate with UNKNOWN metadata, marked
        let record = self.table.lookup(bin)?;
        let brand = record.map(|r| r.brand).unwrap_or(CardBrand::Unknown);
        let card_type = record.map(|r| r.card_type).unwrap_or(CardType::Unknown);

        let target_length = match options.length {
            Some(length) => validate_length_override(length, bin.len())?,
            None => target_length_for(brand, rng),
        };

        let number = synthesize_number(bin, target_length, rng)?;
        let luhn_valid = luhn::is_valid_luhn(&number)?;
        debug_assert!(luhn_valid, "generated number failed Luhn: {}", number);

        // Expiry is always derived - the seeded CVV hashes it even when the
        // response omits it
        let expiry = derive_expiry_at(card_type, now, rng);

        let cvv = if options.include_cvv {
            Some(cvv::derive_cvv(&number, expiry, brand, options.seeded_cvv))
        } else {
            None
        };

        let postal_code = if options.include_avs {
            Some(resolve_avs(options, rng)?)
        } else {
            None
        };

        Ok(GeneratedCard {
            number,
            bin: bin.to_string(),
            luhn_valid,
            cvv,
            expiry_month: options.include_expiry.then_some(expiry.month),
            expiry_year: options.include_expiry.then_some(expiry.year),
            brand: brand.as_str().to_string(),
            issuer: field_or_unknown(record, |r| r.issuer.as_str()),
            card_type: card_type.as_str().to_string(),
            country: field_or_unknown(record, |r| r.country.as_str()),
            country_code: field_or_unknown(record, |r| r.country_code.as_str()),
            bin_matched: record.is_some(),
            postal_code,
        })
    }
}

fn field_or_unknown<'r>(
    record: Option<&'r BinRecord>,
    field: impl Fn(&'r BinRecord) -> &'r str,
) -> String {
    record.map(field).unwrap_or(UNKNOWN).to_string()
}

/// AVS was requested: a country is required and must have a postal pool
fn resolve_avs(options: &GenerateOptions, rng: &mut impl Rng) -> Result<String> {
    let country = options.avs_country.as_deref().ok_or_else(|| {
        CardError::InvalidInput("avs_country is required when include_avs is set".to_string())
    })?;

    avs::postal_code_with(country, rng).ok_or_else(|| {
        CardError::InvalidInput(format!(
            "AVS not supported for country: {} (supported: {})",
            country,
            avs::supported_countries().join(", ")
        ))
    })
}

/// Generation wants the real leading digits: 6-8 ASCII digits, no padding
fn validate_bin_prefix(bin: &str) -> Result<&str> {
    let trimmed = bin.trim();

    if trimmed.len() < 6 || trimmed.len() > 8 {
        return Err(CardError::InvalidBin(format!(
            "BIN must be 6-8 digits, got {} characters",
            trimmed.len()
        )));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardError::InvalidBin(format!(
            "BIN must be ASCII digits only, got '{}'",
            trimmed
        )));
    }

    Ok(trimmed)
}

fn validate_length_override(length: usize, bin_len: usize) -> Result<usize> {
    if !(LENGTH_MIN..=LENGTH_MAX).contains(&length) {
        return Err(CardError::InvalidInput(format!(
            "card length must be {}-{}, got {}",
            LENGTH_MIN, LENGTH_MAX, length
        )));
    }
    if length < bin_len + 2 {
        return Err(CardError::InvalidInput(format!(
            "length {} leaves no room after the {}-digit BIN",
            length, bin_len
        )));
    }
    Ok(length)
}

/// Brand-driven number length (prepaid and everything else stay at 16)
fn target_length_for(brand: CardBrand, rng: &mut impl Rng) -> usize {
    match brand {
        CardBrand::AmericanExpress => 15,
        CardBrand::DinersClub => *pick(&[14, 16], rng),
        CardBrand::Discover => *pick(&[16, 19], rng),
        _ => 16,
    }
}

fn pick<'v, T>(values: &'v [T], rng: &mut impl Rng) -> &'v T {
    &values[rng.random_range(0..values.len())]
}

/// BIN + weighted filler + Luhn check digit
fn synthesize_number(bin: &str, target_length: usize, rng: &mut impl Rng) -> Result<String> {
    let filler_len = target_length - bin.len() - 1;
    let filler = synthesize_filler(filler_len, rng);

    let mut partial = String::with_capacity(target_length);
    partial.push_str(bin);
    for digit in &filler {
        partial.push(char::from(b'0' + digit));
    }

    let check = luhn::compute_check_digit(&partial)?;
    partial.push(char::from(b'0' + check));
    Ok(partial)
}

fn synthesize_filler(len: usize, rng: &mut impl Rng) -> Vec<u8> {
    let mut filler = Vec::with_capacity(len);
    let mut counts = [0usize; 10];

    for _ in 0..len {
        let digit = draw_digit(&filler, &counts, rng);
        counts[digit as usize] += 1;
        filler.push(digit);
    }

    filler
}

/// Draw one filler digit from the weighted distribution, honoring the
/// frequency cap and the run filters.
///
/// Redraws are bounded. On exhaustion the digit falls back to the first
/// value still under the cap that avoids a run; if even that fails, a fully
/// unfiltered draw is accepted. Generation therefore always terminates.
fn draw_digit(filler: &[u8], counts: &[usize; 10], rng: &mut impl Rng) -> u8 {
    for _ in 0..MAX_REDRAWS {
        let candidate = WEIGHTED_DIGITS[rng.random_range(0..WEIGHTED_DIGITS.len())];
        if counts[candidate as usize] >= DIGIT_FREQUENCY_CAP {
            continue;
        }
        if forms_run(filler, candidate) {
            continue;
        }
        return candidate;
    }

    for candidate in 0..10u8 {
        if counts[candidate as usize] < DIGIT_FREQUENCY_CAP && !forms_run(filler, candidate) {
            return candidate;
        }
    }

    WEIGHTED_DIGITS[rng.random_range(0..WEIGHTED_DIGITS.len())]
}

/// Would appending `candidate` create a 3-run in the filler region?
/// Checks identical runs and strict ascending/descending sequences. The
/// window never crosses the BIN/filler boundary.
fn forms_run(filler: &[u8], candidate: u8) -> bool {
    let n = filler.len();
    if n < 2 {
        return false;
    }

    let last = filler[n - 1];
    let before = filler[n - 2];

    if candidate == last && last == before {
        return true; // three identical
    }
    if last == before + 1 && candidate == last + 1 {
        return true; // strictly ascending
    }
    if before == last + 1 && last == candidate + 1 {
        return true; // strictly descending
    }

    false
}

// ============================================================================
// TESTS
// ============================================================================
