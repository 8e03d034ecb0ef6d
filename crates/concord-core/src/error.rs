use rust_decimal::Decimal;
use thiserror::Error;

/// Protocol-wide error types for Concord.
///
/// The first five variants are message-time validation failures and are
/// reported back to the submitter. `Storage` and `Serialization` come from
/// the key-value view underneath the module state.
#[derive(Debug, Error)]
pub enum ConcordError {
    /// A reveal did not match its commitment, or no commitment exists.
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// A revealed price was negative.
    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Malformed message field (denom, title, hash, reveal window, params).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Signer is not allowed to perform the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Key-value layer error (RocksDB, branch commit).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl ConcordError {
    /// Whether this error is a message-time rejection (as opposed to a
    /// failure of the state layer itself).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConcordError::VerificationFailed(_)
                | ConcordError::InvalidPrice(_)
                | ConcordError::InvalidInput(_)
                | ConcordError::NotFound(_)
                | ConcordError::Unauthorized(_)
        )
    }
}

impl From<serde_json::Error> for ConcordError {
    fn from(e: serde_json::Error) -> Self {
        ConcordError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ConcordError::VerificationFailed("x".into()).is_validation());
        assert!(ConcordError::InvalidPrice(Decimal::NEGATIVE_ONE).is_validation());
        assert!(ConcordError::Unauthorized("x".into()).is_validation());
        assert!(!ConcordError::Storage("x".into()).is_validation());
        assert!(!ConcordError::Serialization("x".into()).is_validation());
    }

    #[test]
    fn test_display() {
        let err = ConcordError::NotFound("program 7".into());
        assert_eq!(err.to_string(), "Not found: program 7");
    }
}
