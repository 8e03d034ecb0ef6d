// crates/concord-node/src/config.rs
//
// Runtime configuration for the Concord simulation node.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use concord_core::error::ConcordError;
use concord_core::params::{BudgetParams, OracleParams, RewardParams};
use concord_core::Decimal;

/// One simulated validator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatorConfig {
    /// Operator address, 40 hex characters.
    pub address: String,
    /// Bonded stake in the smallest unit.
    pub stake: u64,
}

/// Simulated market and treasury inputs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Denoms validators vote on.
    #[serde(default = "default_denoms")]
    pub denoms: Vec<String>,

    /// Reference price every validator jitters around.
    #[serde(default = "default_base_price")]
    pub base_price: Decimal,

    /// Maximum jitter applied to each vote, in basis points.
    #[serde(default = "default_jitter_bps")]
    pub jitter_bps: u32,

    /// Seigniorage issued per epoch, in the native denom.
    #[serde(default = "default_seigniorage_per_epoch")]
    pub seigniorage_per_epoch: u64,

    /// Share of seigniorage earmarked for stakers.
    #[serde(default = "default_reward_weight")]
    pub reward_weight: Decimal,

    /// Native-to-reward-denom swap rate. Zero disables swapping.
    #[serde(default = "default_swap_rate")]
    pub swap_rate: Decimal,

    /// Fees collected per block, in the reward denom.
    #[serde(default = "default_fees_per_block")]
    pub fees_per_block: u64,

    /// Simulated validator set.
    #[serde(default = "default_validators")]
    pub validators: Vec<ValidatorConfig>,
}

fn default_denoms() -> Vec<String> {
    vec!["ukrw".to_string(), "usdr".to_string()]
}

fn default_base_price() -> Decimal {
    Decimal::new(125, 2)
}

fn default_jitter_bps() -> u32 {
    50
}

fn default_seigniorage_per_epoch() -> u64 {
    1_000_000
}

fn default_reward_weight() -> Decimal {
    Decimal::new(5, 1)
}

fn default_swap_rate() -> Decimal {
    Decimal::new(2, 0)
}

fn default_fees_per_block() -> u64 {
    100
}

fn default_validators() -> Vec<ValidatorConfig> {
    (1u8..=4)
        .map(|i| ValidatorConfig {
            address: hex_address(i),
            stake: 1_000_000,
        })
        .collect()
}

fn hex_address(byte: u8) -> String {
    format!("{:02x}", byte).repeat(20)
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            denoms: default_denoms(),
            base_price: default_base_price(),
            jitter_bps: default_jitter_bps(),
            seigniorage_per_epoch: default_seigniorage_per_epoch(),
            reward_weight: default_reward_weight(),
            swap_rate: default_swap_rate(),
            fees_per_block: default_fees_per_block(),
            validators: default_validators(),
        }
    }
}

/// Runtime configuration for the node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persisted state (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Number of blocks to simulate.
    #[serde(default = "default_blocks")]
    pub blocks: u64,

    /// Seed for the simulation's price jitter and salts.
    #[serde(default)]
    pub seed: u64,

    #[serde(default = "default_oracle_params")]
    pub oracle: OracleParams,

    #[serde(default = "default_budget_params")]
    pub budget: BudgetParams,

    #[serde(default = "default_reward_params")]
    pub rewards: RewardParams,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "~/.concord/data".to_string()
}

fn default_blocks() -> u64 {
    240
}

// Shorter than the chain defaults so a default run crosses several
// oracle periods, budget periods and reward epochs.
fn default_oracle_params() -> OracleParams {
    OracleParams {
        vote_period: 12,
        ..OracleParams::default()
    }
}

fn default_budget_params() -> BudgetParams {
    BudgetParams {
        vote_period: 48,
        ..BudgetParams::default()
    }
}

fn default_reward_params() -> RewardParams {
    RewardParams {
        blocks_per_epoch: 96,
        ..RewardParams::default()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            blocks: default_blocks(),
            seed: 0,
            oracle: default_oracle_params(),
            budget: default_budget_params(),
            rewards: default_reward_params(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns `ConcordError::Config` if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, ConcordError> {
        let contents = fs::read_to_string(expand_tilde(path))
            .map_err(|e| ConcordError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, ConcordError> {
        toml::from_str(contents).map_err(|e| ConcordError::Config(e.to_string()))
    }

    /// Check module params and the simulated validator set.
    pub fn validate(&self) -> Result<(), ConcordError> {
        self.oracle.validate()?;
        self.budget.validate()?;
        self.rewards.validate()?;
        if self.simulation.validators.is_empty() {
            return Err(ConcordError::InvalidInput(
                "at least one validator is required".into(),
            ));
        }
        Ok(())
    }

    /// `data_dir` with a leading `~` expanded.
    pub fn expanded_data_dir(&self) -> String {
        expand_tilde(&self.data_dir)
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
