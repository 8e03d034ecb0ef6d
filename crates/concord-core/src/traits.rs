// crates/concord-core/src/traits.rs
//
// Narrow capability interfaces onto the modules Concord does not own.
//
// All methods take `&self`: capabilities are handed to the keepers by
// reference once per block context. Implementations that mutate external
// state (minting, draining fees) use their own interior mutability.

use rust_decimal::Decimal;

use crate::coin::{Amount, Coin};
use crate::error::ConcordError;
use crate::identity::{AccountId, ValidatorId};

/// Read access to the bonded validator set.
///
/// Implemented by the staking module.
pub trait ValidatorWeightSource {
    /// Total bonded stake across all validators.
    fn total_bonded_stake(&self) -> Amount;

    /// Current bonded stake of `validator`, or `None` if it is not a
    /// validator (never bonded, unbonded, or removed).
    fn stake_of(&self, validator: &ValidatorId) -> Option<Amount>;

    /// Account that receives rewards earned by `validator`.
    fn reward_recipient(&self, validator: &ValidatorId) -> AccountId {
        AccountId::from(*validator)
    }
}

/// Per-epoch seigniorage bookkeeping.
///
/// Implemented by the mint/treasury modules.
pub trait SeigniorageSource {
    /// Seigniorage issued during `epoch`, in the native denom, without
    /// consuming it.
    fn peek_epoch_seigniorage(&self, epoch: u64) -> Amount;

    /// Share of seigniorage already earmarked for stakers in `epoch`.
    fn reward_weight(&self, epoch: u64) -> Decimal;
}

/// Exchange-rate conversion between denoms.
///
/// Implemented by the market module.
pub trait SwapRateSource {
    /// Convert `coin` into `to_denom`, truncating. `None` when no rate exists.
    fn convert(&self, coin: &Coin, to_denom: &str) -> Option<Coin>;
}

/// Mints new coins into an account.
///
/// Implemented by the bank/mint modules.
pub trait MintSink {
    fn mint(&self, recipient: &AccountId, coin: &Coin) -> Result<(), ConcordError>;
}

/// Source of protocol fees collected since the last distribution.
///
/// Implemented by the fee collection module.
pub trait FeeCollector {
    /// Take every collected fee coin, leaving the pool empty.
    fn drain_fee_pool(&self) -> Vec<Coin>;
}
