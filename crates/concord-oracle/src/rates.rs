// crates/concord-oracle/src/rates.rs
//
// Accepted exchange rates, one per denom, under `0x03 ‖ denom`.

use concord_core::error::ConcordError;
use concord_core::keys::{denom_from_exchange_rate_key, exchange_rate_key, exchange_rate_prefix};
use concord_core::Decimal;
use concord_store::{KvStore, KvStoreExt};

pub fn exchange_rate(store: &dyn KvStore, denom: &str) -> Result<Option<Decimal>, ConcordError> {
    store.get_json(&exchange_rate_key(denom))
}

pub fn set_exchange_rate(
    store: &mut dyn KvStore,
    denom: &str,
    rate: Decimal,
) -> Result<(), ConcordError> {
    store.set_json(&exchange_rate_key(denom), &rate)
}

/// Remove the rate for `denom`. Returns whether one existed.
pub fn delete_exchange_rate(store: &mut dyn KvStore, denom: &str) -> Result<bool, ConcordError> {
    let key = exchange_rate_key(denom);
    let existed = store.has(&key)?;
    if existed {
        store.delete(&key)?;
    }
    Ok(existed)
}

/// Denoms that currently have an exchange rate, in key order.
pub fn active_denoms(store: &dyn KvStore) -> Result<Vec<String>, ConcordError> {
    store
        .collect_keys(&exchange_rate_prefix())?
        .iter()
        .map(|key| denom_from_exchange_rate_key(key))
        .collect()
}
