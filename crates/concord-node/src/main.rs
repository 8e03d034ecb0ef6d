// crates/concord-node/src/main.rs
//
// Binary entrypoint for the Concord simulator.
//
// Loads configuration, initializes tracing, builds the simulated validator
// set and capabilities, then finalizes the configured number of blocks and
// logs what the engine did.

use clap::Parser;

use concord_core::error::ConcordError;
use concord_core::traits::ValidatorWeightSource;
use concord_node::config::NodeConfig;
use concord_node::sim::{capabilities_from_config, SimBank, SimReport, Simulator};
use concord_node::{App, Capabilities};
use concord_store::KvStore;

/// Concord simulator: runs the oracle and budget tallies over a scripted
/// validator set.
#[derive(Parser, Debug)]
#[command(name = "concord-sim", version = "0.1.0", about = "Concord tally engine simulator")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.concord/config.toml")]
    config: String,

    /// Number of blocks to finalize. Overrides the config file.
    #[arg(long)]
    blocks: Option<u64>,

    /// Simulation seed. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset. Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Persist state to RocksDB under the configured data directory.
    #[cfg(feature = "rocksdb")]
    #[arg(long)]
    persist: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing is not up yet; keep the load error for after init.
    let (mut config, load_error) = match NodeConfig::load(&args.config) {
        Ok(cfg) => (cfg, None),
        Err(e) => (NodeConfig::default(), Some(e)),
    };

    if let Some(blocks) = args.blocks {
        config.blocks = blocks;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match load_error {
        None => tracing::info!("Loaded configuration from {}", args.config),
        Some(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    config.validate()?;

    tracing::info!("Concord simulator v0.1.0");
    tracing::info!("Blocks: {}, seed: {}", config.blocks, config.seed);
    tracing::info!(
        "Oracle vote period: {}, budget vote period: {}, blocks per epoch: {}",
        config.oracle.vote_period,
        config.budget.vote_period,
        config.rewards.blocks_per_epoch
    );

    #[cfg(feature = "rocksdb")]
    if args.persist {
        let path = format!("{}/state", config.expanded_data_dir());
        let store = concord_store::RocksStore::open(&path)?;
        tracing::info!("State persisted at {}", path);
        return run(&config, store);
    }

    run(&config, concord_store::MemoryStore::new())
}

fn run<S: KvStore>(config: &NodeConfig, store: S) -> Result<(), Box<dyn std::error::Error>> {
    let (staking, treasury, market, bank) = capabilities_from_config(config)?;
    tracing::info!(
        "{} validators, {} bonded",
        staking.validators().len(),
        staking.total_bonded_stake()
    );

    let caps = Capabilities {
        weights: &staking,
        seigniorage: &treasury,
        swap: &market,
        mint: &bank,
        fees: &bank,
    };
    let mut app = App::new(store, caps);
    app.init_params(&config.oracle, &config.budget, &config.rewards)?;

    let mut simulator = Simulator::new(config.clone());
    let report = simulator.run(&mut app, &staking.validators(), &bank);
    log_report(&report, &bank);

    if report.pass_errors > 0 {
        return Err(ConcordError::InvalidInput(format!(
            "{} periodic passes failed",
            report.pass_errors
        ))
        .into());
    }
    Ok(())
}

fn log_report(report: &SimReport, bank: &SimBank) {
    tracing::info!(
        "Finalized {} blocks: {} messages delivered, {} rejected",
        report.blocks,
        report.messages_delivered,
        report.messages_rejected
    );
    tracing::info!(
        "{} rates accepted, {} programs passed, {} distributions",
        report.rates_accepted,
        report.programs_passed,
        report.distributions
    );
    for (denom, rate) in &report.final_rates {
        tracing::info!("Exchange rate {}: {}", denom, rate);
    }
    for (account, denom, amount) in bank.balances() {
        tracing::info!("Balance {} {}{}", account, amount, denom);
    }
}
