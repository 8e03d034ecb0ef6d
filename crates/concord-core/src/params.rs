// crates/concord-core/src/params.rs
//
// Tunable module parameters.
//
// Defaults assume ~5 second blocks:
//   - Oracle vote period: 12 blocks (~1 minute)
//   - Budget vote period: 120,960 blocks (~1 week)
//   - Reward epoch: 120,960 blocks (~1 week)
//
// Params are read-mostly; they change only through the privileged update
// path (`ParamStore::set_*`), which validates them first.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConcordError;
use crate::keys::validate_denom;

/// Blocks per minute at the nominal block time.
pub const BLOCKS_PER_MINUTE: u64 = 12;

/// Blocks per week at the nominal block time.
pub const BLOCKS_PER_WEEK: u64 = BLOCKS_PER_MINUTE * 60 * 24 * 7;

/// Native staking denom used when no swap rate is available.
pub const DEFAULT_NATIVE_DENOM: &str = "ucon";

/// Denom rewards are preferably paid out in.
pub const DEFAULT_REWARD_DENOM: &str = "usdr";

/// Price oracle parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleParams {
    /// Blocks per oracle vote period.
    #[serde(default = "default_oracle_vote_period")]
    pub vote_period: u64,
    /// Minimum share of total bonded stake a ballot needs for its median to
    /// be accepted.
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: Decimal,
    /// Full width of the band around the median inside which voters are
    /// rewarded.
    #[serde(default = "default_reward_band")]
    pub reward_band: Decimal,
    /// Denoms that may be voted on. Empty means any well-formed denom.
    #[serde(default)]
    pub whitelist: Vec<String>,
}

fn default_oracle_vote_period() -> u64 {
    BLOCKS_PER_MINUTE
}

fn default_vote_threshold() -> Decimal {
    Decimal::new(50, 2)
}

fn default_reward_band() -> Decimal {
    Decimal::new(2, 2)
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            vote_period: default_oracle_vote_period(),
            vote_threshold: default_vote_threshold(),
            reward_band: default_reward_band(),
            whitelist: Vec::new(),
        }
    }
}

impl OracleParams {
    pub fn validate(&self) -> Result<(), ConcordError> {
        check_period("oracle vote_period", self.vote_period)?;
        check_ratio("oracle vote_threshold", self.vote_threshold)?;
        check_ratio("oracle reward_band", self.reward_band)?;
        for denom in &self.whitelist {
            validate_denom(denom)?;
        }
        Ok(())
    }

    /// Whether `denom` may be voted on under the current whitelist.
    pub fn accepts_denom(&self, denom: &str) -> bool {
        self.whitelist.is_empty() || self.whitelist.iter().any(|d| d == denom)
    }
}

/// Governance/budget parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetParams {
    /// Blocks a candidate stays open for voting, and the re-tally cadence
    /// for active programs.
    #[serde(default = "default_budget_vote_period")]
    pub vote_period: u64,
    /// Share of total bonded stake (net yes) a candidate needs to activate.
    #[serde(default = "default_active_threshold")]
    pub active_threshold: Decimal,
    /// Share an active program needs to keep receiving claims.
    #[serde(default = "default_legacy_threshold")]
    pub legacy_threshold: Decimal,
}

fn default_budget_vote_period() -> u64 {
    BLOCKS_PER_WEEK
}

fn default_active_threshold() -> Decimal {
    Decimal::new(10, 2)
}

fn default_legacy_threshold() -> Decimal {
    Decimal::ZERO
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self {
            vote_period: default_budget_vote_period(),
            active_threshold: default_active_threshold(),
            legacy_threshold: default_legacy_threshold(),
        }
    }
}

impl BudgetParams {
    pub fn validate(&self) -> Result<(), ConcordError> {
        check_period("budget vote_period", self.vote_period)?;
        check_ratio("budget active_threshold", self.active_threshold)?;
        check_ratio("budget legacy_threshold", self.legacy_threshold)?;
        Ok(())
    }
}

/// Epoch reward distribution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardParams {
    #[serde(default = "default_blocks_per_epoch")]
    pub blocks_per_epoch: u64,
    #[serde(default = "default_native_denom")]
    pub native_denom: String,
    #[serde(default = "default_reward_denom")]
    pub reward_denom: String,
}

fn default_blocks_per_epoch() -> u64 {
    BLOCKS_PER_WEEK
}

fn default_native_denom() -> String {
    DEFAULT_NATIVE_DENOM.to_string()
}

fn default_reward_denom() -> String {
    DEFAULT_REWARD_DENOM.to_string()
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            blocks_per_epoch: default_blocks_per_epoch(),
            native_denom: default_native_denom(),
            reward_denom: default_reward_denom(),
        }
    }
}

impl RewardParams {
    pub fn validate(&self) -> Result<(), ConcordError> {
        check_period("blocks_per_epoch", self.blocks_per_epoch)?;
        validate_denom(&self.native_denom)?;
        validate_denom(&self.reward_denom)?;
        Ok(())
    }
}

fn check_period(name: &str, value: u64) -> Result<(), ConcordError> {
    if value == 0 {
        return Err(ConcordError::InvalidInput(format!("{} must be > 0", name)));
    }
    Ok(())
}

fn check_ratio(name: &str, value: Decimal) -> Result<(), ConcordError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConcordError::InvalidInput(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        assert!(OracleParams::default().validate().is_ok());
        assert!(BudgetParams::default().validate().is_ok());
        assert!(RewardParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_period_rejected() {
        let params = OracleParams {
            vote_period: 0,
            ..OracleParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let params = BudgetParams {
            active_threshold: dec!(1.01),
            ..BudgetParams::default()
        };
        assert!(params.validate().is_err());

        let params = BudgetParams {
            legacy_threshold: dec!(-0.1),
            ..BudgetParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_whitelist() {
        let open = OracleParams::default();
        assert!(open.accepts_denom("ukrw"));

        let closed = OracleParams {
            whitelist: vec!["usdr".to_string()],
            ..OracleParams::default()
        };
        assert!(closed.accepts_denom("usdr"));
        assert!(!closed.accepts_denom("ukrw"));
    }

    #[test]
    fn test_json_round_trip_keeps_decimal_scale() {
        let params = OracleParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: OracleParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
