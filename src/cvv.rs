// 🔐 CVV Derivation - Seeded (SHA-256) or random
//
// Seeded CVVs are reproducible test fixtures: the same number + expiry
// always hash to the same code. Random CVVs use the process RNG. The CVV is
// an opaque code - there is nothing to checksum-validate.

use crate::expiry::Expiry;
use crate::record::CardBrand;
use rand::Rng;
use sha2::{Digest, Sha256};

/// CVV length for a brand: American Express uses 4 digits, everyone else 3
pub fn cvv_length(brand: CardBrand) -> usize {
    match brand {
        CardBrand::AmericanExpress => 4,
        _ => 3,
    }
}

/// Derive a CVV for a generated card.
///
/// `seeded == true` hashes `number + "MM/YYYY"` with SHA-256 and takes the
/// digest's numeric residue modulo 10^len, zero-padded. `seeded == false`
/// draws uniformly at random.
pub fn derive_cvv(number: &str, expiry: Expiry, brand: CardBrand, seeded: bool) -> String {
    let len = cvv_length(brand);

    if seeded {
        seeded_cvv(number, expiry, len)
    } else {
        random_cvv(len, &mut rand::rng())
    }
}

fn seeded_cvv(number: &str, expiry: Expiry, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(number.as_bytes());
    hasher.update(expiry.to_string().as_bytes());
    let digest = hasher.finalize();

    // First 8 digest bytes as a big-endian integer, reduced to len digits
    let mut value = 0u64;
    for byte in &digest[..8] {
        value = (value << 8) | *byte as u64;
    }

    let modulus = 10u64.pow(len as u32);
    format!("{:0len$}", value % modulus, len = len)
}

pub(crate) fn random_cvv(len: usize, rng: &mut impl Rng) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
