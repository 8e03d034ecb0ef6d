// crates/concord-core/src/crypto.rs
//
// Commitment hashing for the oracle's commit-reveal protocol.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConcordError;
use crate::identity::ValidatorId;

/// Length of a price commitment hash (truncated SHA-256).
pub const VOTE_HASH_LEN: usize = 20;

/// A hash-locked price commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteHash(pub [u8; VOTE_HASH_LEN]);

impl VoteHash {
    pub fn as_bytes(&self) -> &[u8; VOTE_HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for VoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for VoteHash {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| ConcordError::InvalidInput(format!("malformed vote hash: {}", e)))?;
        let arr: [u8; VOTE_HASH_LEN] = bytes.as_slice().try_into().map_err(|_| {
            ConcordError::InvalidInput(format!(
                "vote hash must be {} bytes, got {}",
                VOTE_HASH_LEN,
                bytes.len()
            ))
        })?;
        Ok(VoteHash(arr))
    }
}

/// Compute the commitment for a price reveal.
///
/// `SHA-256("{salt}:{price}:{denom}:{validator_hex}")`, truncated to 20 bytes.
/// The price is normalized first so `1.50` and `1.5` commit identically.
pub fn vote_hash(salt: &str, price: Decimal, denom: &str, voter: &ValidatorId) -> VoteHash {
    let preimage = format!("{}:{}:{}:{}", salt, price.normalize(), denom, voter.to_hex());
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; VOTE_HASH_LEN];
    out.copy_from_slice(&digest[..VOTE_HASH_LEN]);
    VoteHash(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn voter() -> ValidatorId {
        ValidatorId([3; 20])
    }

    #[test]
    fn test_hash_deterministic() {
        let a = vote_hash("salt", dec!(1.25), "ukrw", &voter());
        let b = vote_hash("salt", dec!(1.25), "ukrw", &voter());
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_ignores_trailing_zeros() {
        let a = vote_hash("salt", dec!(1.5), "ukrw", &voter());
        let b = vote_hash("salt", dec!(1.500), "ukrw", &voter());
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_binds_every_field() {
        let base = vote_hash("salt", dec!(1.5), "ukrw", &voter());
        assert_ne!(base, vote_hash("salt2", dec!(1.5), "ukrw", &voter()));
        assert_ne!(base, vote_hash("salt", dec!(1.6), "ukrw", &voter()));
        assert_ne!(base, vote_hash("salt", dec!(1.5), "usdr", &voter()));
        assert_ne!(base, vote_hash("salt", dec!(1.5), "ukrw", &ValidatorId([4; 20])));
    }

    #[test]
    fn test_hex_round_trip() {
        let h = vote_hash("1", dec!(3), "usdr", &voter());
        assert_eq!(h.to_hex().parse::<VoteHash>().unwrap(), h);
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!("abcd".parse::<VoteHash>().is_err());
    }
}
