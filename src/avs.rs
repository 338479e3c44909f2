// 📮 AVS Postal Codes - Plausible codes per country for AVS testing
// Pools cover major cities of each supported country.

use rand::Rng;

/// (ISO 3166-1 alpha-2, postal codes of major cities)
const AVS_POSTAL_CODES: &[(&str, &[&str])] = &[
    ("US", &["10001", "90210", "60601", "94102", "33101"]),
    ("IT", &["00100", "20100", "80100", "40100", "50100"]),
    ("GB", &["SW1A 1AA", "M1 1AA", "B1 1AA", "L1 1AA", "CF1 1AA"]),
    ("CA", &["M5H 2N2", "V6B 1A1", "T2P 1J9", "H2Y 1A6", "K1A 0A6"]),
    ("AU", &["2000", "3000", "4000", "5000", "6000"]),
    ("DE", &["10115", "20095", "80331", "50667", "01067"]),
    ("FR", &["75001", "69001", "13001", "31000", "59000"]),
];

/// Countries with an AVS pool, in declaration order
pub fn supported_countries() -> Vec<&'static str> {
    AVS_POSTAL_CODES.iter().map(|(code, _)| *code).collect()
}

/// Draw a postal code for the country, None when AVS is unsupported there
pub fn postal_code_for(country_code: &str) -> Option<String> {
    postal_code_with(country_code, &mut rand::rng())
}

pub(crate) fn postal_code_with(country_code: &str, rng: &mut impl Rng) -> Option<String> {
    let upper = country_code.trim().to_uppercase();

    AVS_POSTAL_CODES
        .iter()
        .find(|(code, _)| *code == upper)
        .map(|(_, pool)| pool[rng.random_range(0..pool.len())].to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_supported_countries() {
        let countries = supported_countries();
        assert_eq!(countries.len(), 7);
        assert!(countries.contains(&"US"));
        assert!(countries.contains(&"GB"));
    }

    #[test]
    fn test_postal_code_from_pool() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let code = postal_code_with("US", &mut rng).unwrap();
            assert!(["10001", "90210", "60601", "94102", "33101"]
                .contains(&code.as_str()));
        }
    }

    #[test]
    fn test_case_insensitive_country() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(postal_code_with("de", &mut rng).is_some());
        assert!(postal_code_with(" fr ", &mut rng).is_some());
    }

    #[test]
    fn test_unsupported_country() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!(postal_code_with("JP", &mut rng).is_none());
        assert!(postal_code_with("", &mut rng).is_none());
    }
}
