// ⚠️ Error Taxonomy
// Typed errors for lookup and generation; NotFound is NOT here on purpose -
// a BIN with no match is a normal outcome and surfaces as Option::None.

use thiserror::Error;

/// Ceiling for a single bulk generation request
pub const MAX_BATCH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Malformed input: wrong length, non-digit characters, bad options
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// BIN prefix unusable for generation (must be 6-8 ASCII digits)
    #[error("invalid BIN: {0}")]
    InvalidBin(String),

    /// BIN is on the blocked list (published test BINs, operator blocks)
    #[error("BIN {bin} blocked: {reason}")]
    BlockedBin { bin: String, reason: String },

    /// Bulk request above the policy ceiling - rejected, never partially filled
    #[error("batch of {requested} exceeds limit of {limit}")]
    BatchLimitExceeded { requested: usize, limit: usize },
}

impl CardError {
    /// Short machine-readable code (used by the API layer)
    pub fn code(&self) -> &'static str {
        match self {
            CardError::InvalidInput(_) => "invalid_input",
            CardError::InvalidBin(_) => "invalid_bin",
            CardError::BlockedBin { .. } => "blocked_bin",
            CardError::BatchLimitExceeded { .. } => "batch_limit_exceeded",
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CardError::InvalidInput("expected digits".to_string());
        assert_eq!(err.to_string(), "invalid input: expected digits");

        let err = CardError::BlockedBin {
            bin: "411111".to_string(),
            reason: "test BIN".to_string(),
        };
        assert_eq!(err.to_string(), "BIN 411111 blocked: test BIN");

        let err = CardError::BatchLimitExceeded {
            requested: 10000,
            limit: MAX_BATCH,
        };
        assert_eq!(err.to_string(), "batch of 10000 exceeds limit of 1000");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CardError::InvalidBin("x".to_string()).code(),
            "invalid_bin"
        );
        assert_eq!(
            CardError::BatchLimitExceeded {
                requested: 2000,
                limit: 1000
            }
            .code(),
            "batch_limit_exceeded"
        );
    }
}
