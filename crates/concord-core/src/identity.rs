// crates/concord-core/src/identity.rs
//
// Fixed-width identities for validators and accounts.
//
// Both are 20 raw bytes. A validator operator's account shares the bytes of
// the validator identity, which is how reward recipients and governance
// voters are mapped back and forth without a lookup table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConcordError;

/// Length in bytes of every identity.
pub const ID_LEN: usize = 20;

/// Identity of a bonded validator (operator address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValidatorId(pub [u8; ID_LEN]);

/// Identity of an account (feeder, governance voter, reward recipient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub [u8; ID_LEN]);

macro_rules! impl_identity {
    ($ty:ident, $label:literal) => {
        impl $ty {
            /// Raw identity bytes.
            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            /// Parse from exactly `ID_LEN` bytes.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, ConcordError> {
                let arr: [u8; ID_LEN] = bytes.try_into().map_err(|_| {
                    ConcordError::InvalidInput(format!(
                        "{} must be {} bytes, got {}",
                        $label,
                        ID_LEN,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }

            /// Lowercase hex rendering, used in vote hashes and logs.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $ty {
            type Err = ConcordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| {
                    ConcordError::InvalidInput(format!("malformed {} {:?}: {}", $label, s, e))
                })?;
                Self::from_slice(&bytes)
            }
        }
    };
}

impl_identity!(ValidatorId, "validator address");
impl_identity!(AccountId, "account address");

impl From<ValidatorId> for AccountId {
    fn from(v: ValidatorId) -> Self {
        AccountId(v.0)
    }
}

impl From<AccountId> for ValidatorId {
    fn from(a: AccountId) -> Self {
        ValidatorId(a.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let v = ValidatorId([0xab; ID_LEN]);
        let parsed: ValidatorId = v.to_hex().parse().unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = "abcd".parse::<AccountId>().unwrap_err();
        assert!(matches!(err, ConcordError::InvalidInput(_)));
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!("zz".repeat(ID_LEN).parse::<ValidatorId>().is_err());
    }

    #[test]
    fn test_operator_account_shares_bytes() {
        let v = ValidatorId([7; ID_LEN]);
        let a = AccountId::from(v);
        assert_eq!(a.as_bytes(), v.as_bytes());
        assert_eq!(ValidatorId::from(a), v);
    }
}
