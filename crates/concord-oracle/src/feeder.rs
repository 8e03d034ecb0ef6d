// crates/concord-oracle/src/feeder.rs
//
// Feeder delegation: which account may submit oracle messages on behalf of a
// validator. Without a delegation the operator's own account is the feeder.

use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::keys::feeder_key;
use concord_core::traits::ValidatorWeightSource;
use concord_store::{KvStore, KvStoreExt};

/// The account currently allowed to feed prices for `operator`.
pub fn feed_delegate(store: &dyn KvStore, operator: &ValidatorId) -> Result<AccountId, ConcordError> {
    Ok(store
        .get_json(&feeder_key(operator))?
        .unwrap_or_else(|| AccountId::from(*operator)))
}

/// Record `delegate` as the feeder for `operator`.
///
/// Delegating back to the operator's own account removes the record.
pub fn set_feed_delegate(
    store: &mut dyn KvStore,
    operator: &ValidatorId,
    delegate: &AccountId,
) -> Result<(), ConcordError> {
    if *delegate == AccountId::from(*operator) {
        store.delete(&feeder_key(operator))
    } else {
        store.set_json(&feeder_key(operator), delegate)
    }
}

/// Check that `validator` is bonded and `feeder` holds its feed right.
pub fn authorize_feeder(
    store: &dyn KvStore,
    weights: &dyn ValidatorWeightSource,
    feeder: &AccountId,
    validator: &ValidatorId,
) -> Result<(), ConcordError> {
    if weights.stake_of(validator).is_none() {
        return Err(ConcordError::Unauthorized(format!(
            "{} is not a validator",
            validator
        )));
    }
    let delegate = feed_delegate(store, validator)?;
    if delegate != *feeder {
        return Err(ConcordError::Unauthorized(format!(
            "{} is not the feeder for {} (delegate is {})",
            feeder, validator, delegate
        )));
    }
    Ok(())
}
