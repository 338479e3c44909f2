// ✔️ Luhn Checksum - Validation + check digit computation
//
// Used in both directions:
// - isValidLuhn on externally supplied numbers
// - computeCheckDigit when synthesizing new ones

use crate::error::{CardError, Result};

/// Validate a digit string with the Luhn algorithm.
///
/// Starting from the rightmost digit, every second digit is doubled
/// (subtracting 9 when the double exceeds 9); the number is valid iff the
/// digit sum is divisible by 10. Rejects non-digit input and anything
/// shorter than 2 digits.
pub fn is_valid_luhn(digits: &str) -> Result<bool> {
    if digits.len() < 2 {
        return Err(CardError::InvalidInput(format!(
            "Luhn input needs at least 2 digits, got {}",
            digits.len()
        )));
    }

    let sum = luhn_sum(digits, true)?;
    Ok(sum % 10 == 0)
}

/// Compute the check digit that makes `partial + digit` Luhn-valid.
///
/// `partial` is the full number minus its trailing check digit. The digit
/// adjacent to the (missing) check digit is the first to be doubled.
pub fn compute_check_digit(partial: &str) -> Result<u8> {
    if partial.is_empty() {
        return Err(CardError::InvalidInput(
            "cannot compute a check digit for an empty number".to_string(),
        ));
    }

    let sum = luhn_sum(partial, false)?;
    Ok(((10 - (sum % 10)) % 10) as u8)
}

/// Shared doubling pass.
///
/// `includes_check_digit` shifts the parity: when the string already ends in
/// its check digit, doubling starts at the second digit from the right;
/// without it, doubling starts at the rightmost digit.
fn luhn_sum(digits: &str, includes_check_digit: bool) -> Result<u32> {
    let mut sum = 0u32;

    for (i, ch) in digits.chars().rev().enumerate() {
        let digit = ch.to_digit(10).ok_or_else(|| {
            CardError::InvalidInput(format!("non-digit character '{}' in number", ch))
        })?;

        let doubled_position = if includes_check_digit {
            i % 2 == 1
        } else {
            i % 2 == 0
        };

        sum += if doubled_position {
            let doubled = digit * 2;
            if doubled > 9 {
                doubled - 9
            } else {
                doubled
            }
        } else {
            digit
        };
    }

    Ok(sum)
}

// ============================================================================
// TESTS
// ============================================================================
