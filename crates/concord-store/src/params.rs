// crates/concord-store/src/params.rs
//
// ParamStore: typed read/write access to module parameters.
//
// Each module's params live under `0x30 ‖ module`. Reads fall back to the
// defaults when nothing has been written yet; writes validate first, so the
// store never holds params a tally cannot run with.

use concord_core::error::ConcordError;
use concord_core::keys::params_key;
use concord_core::params::{BudgetParams, OracleParams, RewardParams};

use crate::kv::{KvStore, KvStoreExt};

const MODULE_ORACLE: u8 = 0x01;
const MODULE_BUDGET: u8 = 0x02;
const MODULE_REWARDS: u8 = 0x03;

/// Typed accessor for module parameters.
pub struct ParamStore;

impl ParamStore {
    pub fn oracle(store: &dyn KvStore) -> Result<OracleParams, ConcordError> {
        Ok(store
            .get_json(&params_key(MODULE_ORACLE))?
            .unwrap_or_default())
    }

    pub fn set_oracle(store: &mut dyn KvStore, params: &OracleParams) -> Result<(), ConcordError> {
        params.validate()?;
        store.set_json(&params_key(MODULE_ORACLE), params)?;
        tracing::info!(?params, "oracle params updated");
        Ok(())
    }

    pub fn budget(store: &dyn KvStore) -> Result<BudgetParams, ConcordError> {
        Ok(store
            .get_json(&params_key(MODULE_BUDGET))?
            .unwrap_or_default())
    }

    pub fn set_budget(store: &mut dyn KvStore, params: &BudgetParams) -> Result<(), ConcordError> {
        params.validate()?;
        store.set_json(&params_key(MODULE_BUDGET), params)?;
        tracing::info!(?params, "budget params updated");
        Ok(())
    }

    pub fn rewards(store: &dyn KvStore) -> Result<RewardParams, ConcordError> {
        Ok(store
            .get_json(&params_key(MODULE_REWARDS))?
            .unwrap_or_default())
    }

    pub fn set_rewards(store: &mut dyn KvStore, params: &RewardParams) -> Result<(), ConcordError> {
        params.validate()?;
        store.set_json(&params_key(MODULE_REWARDS), params)?;
        tracing::info!(?params, "reward params updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_when_unset() {
        let store = MemoryStore::new();
        assert_eq!(ParamStore::oracle(&store).unwrap(), OracleParams::default());
        assert_eq!(ParamStore::budget(&store).unwrap(), BudgetParams::default());
        assert_eq!(ParamStore::rewards(&store).unwrap(), RewardParams::default());
    }

    #[test]
    fn test_set_then_get() {
        let mut store = MemoryStore::new();
        let params = OracleParams {
            vote_period: 10,
            vote_threshold: dec!(0.67),
            ..OracleParams::default()
        };
        ParamStore::set_oracle(&mut store, &params).unwrap();
        assert_eq!(ParamStore::oracle(&store).unwrap(), params);
    }

    #[test]
    fn test_invalid_params_not_written() {
        let mut store = MemoryStore::new();
        let params = BudgetParams {
            vote_period: 0,
            ..BudgetParams::default()
        };
        assert!(ParamStore::set_budget(&mut store, &params).is_err());
        assert!(store.is_empty());
    }
}
