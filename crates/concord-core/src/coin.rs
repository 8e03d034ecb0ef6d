// crates/concord-core/src/coin.rs
//
// Integer token amounts. All money and stake values are tracked in the
// smallest unit of their denomination as u128; there is no fractional unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Amount in the smallest unit of a denomination.
pub type Amount = u128;

/// An amount tagged with its denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
