// crates/concord-node/src/sim.rs
//
// In-memory capabilities and a scripted validator set for running the
// engine end to end without the surrounding chain.
//
// The simulator drives every validator through the oracle's commit-reveal
// cycle with seeded price jitter, submits one budget program that all
// validators support, and collects fees every block. Given the same config
// and seed it always produces the same state.

use std::cell::RefCell;
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use concord_budget::VoteOption;
use concord_core::coin::Coin;
use concord_core::crypto::vote_hash;
use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::math::mul_ratio_floor;
use concord_core::traits::{
    FeeCollector, MintSink, SeigniorageSource, SwapRateSource, ValidatorWeightSource,
};
use concord_core::Decimal;
use concord_store::KvStore;

use crate::app::{App, BlockOutcome, Msg, MsgResponse};
use crate::config::NodeConfig;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Fixed bonded validator set.
#[derive(Debug, Clone, Default)]
pub struct SimStaking {
    stakes: RefCell<BTreeMap<ValidatorId, u128>>,
}

impl SimStaking {
    pub fn new(stakes: BTreeMap<ValidatorId, u128>) -> Self {
        Self {
            stakes: RefCell::new(stakes),
        }
    }

    pub fn validators(&self) -> Vec<ValidatorId> {
        self.stakes.borrow().keys().copied().collect()
    }

    /// Remove a validator from the bonded set.
    pub fn unbond(&self, validator: &ValidatorId) {
        self.stakes.borrow_mut().remove(validator);
    }
}

impl ValidatorWeightSource for SimStaking {
    fn total_bonded_stake(&self) -> u128 {
        self.stakes
            .borrow()
            .values()
            .fold(0u128, |acc, s| acc.saturating_add(*s))
    }

    fn stake_of(&self, validator: &ValidatorId) -> Option<u128> {
        self.stakes.borrow().get(validator).copied()
    }
}

/// Constant seigniorage per epoch.
#[derive(Debug, Clone)]
pub struct SimTreasury {
    per_epoch: u128,
    reward_weight: Decimal,
}

impl SimTreasury {
    pub fn new(per_epoch: u128, reward_weight: Decimal) -> Self {
        Self {
            per_epoch,
            reward_weight,
        }
    }
}

impl SeigniorageSource for SimTreasury {
    fn peek_epoch_seigniorage(&self, _epoch: u64) -> u128 {
        self.per_epoch
    }

    fn reward_weight(&self, _epoch: u64) -> Decimal {
        self.reward_weight
    }
}

/// One-way swap between two denoms at a fixed rate.
#[derive(Debug, Clone)]
pub struct SimMarket {
    from: String,
    to: String,
    rate: Decimal,
}

impl SimMarket {
    pub fn new(from: impl Into<String>, to: impl Into<String>, rate: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            rate,
        }
    }
}

impl SwapRateSource for SimMarket {
    fn convert(&self, coin: &Coin, to_denom: &str) -> Option<Coin> {
        if coin.denom != self.from || to_denom != self.to || self.rate.is_zero() {
            return None;
        }
        mul_ratio_floor(coin.amount, self.rate).map(|amount| Coin::new(to_denom, amount))
    }
}

/// Account balances plus the fee pool.
#[derive(Debug, Default)]
pub struct SimBank {
    balances: RefCell<BTreeMap<AccountId, BTreeMap<String, u128>>>,
    fee_pool: RefCell<Vec<Coin>>,
}

impl SimBank {
    pub fn collect_fee(&self, coin: Coin) {
        if !coin.is_zero() {
            self.fee_pool.borrow_mut().push(coin);
        }
    }

    pub fn balance(&self, account: &AccountId, denom: &str) -> u128 {
        self.balances
            .borrow()
            .get(account)
            .and_then(|b| b.get(denom))
            .copied()
            .unwrap_or(0)
    }

    /// Every non-zero balance as `(account, denom, amount)`.
    pub fn balances(&self) -> Vec<(AccountId, String, u128)> {
        self.balances
            .borrow()
            .iter()
            .flat_map(|(account, coins)| {
                coins
                    .iter()
                    .map(move |(denom, amount)| (*account, denom.clone(), *amount))
            })
            .collect()
    }
}

impl MintSink for SimBank {
    fn mint(&self, recipient: &AccountId, coin: &Coin) -> Result<(), ConcordError> {
        let mut balances = self.balances.borrow_mut();
        let slot = balances
            .entry(*recipient)
            .or_default()
            .entry(coin.denom.clone())
            .or_insert(0);
        *slot = slot
            .checked_add(coin.amount)
            .ok_or_else(|| ConcordError::InvalidInput(format!("balance overflow for {}", recipient)))?;
        Ok(())
    }
}

impl FeeCollector for SimBank {
    fn drain_fee_pool(&self) -> Vec<Coin> {
        std::mem::take(&mut *self.fee_pool.borrow_mut())
    }
}

/// Build the capabilities described by `config.simulation`.
pub fn capabilities_from_config(
    config: &NodeConfig,
) -> Result<(SimStaking, SimTreasury, SimMarket, SimBank), ConcordError> {
    let mut stakes = BTreeMap::new();
    for v in &config.simulation.validators {
        let id: ValidatorId = v.address.parse()?;
        stakes.insert(id, u128::from(v.stake));
    }
    Ok((
        SimStaking::new(stakes),
        SimTreasury::new(
            u128::from(config.simulation.seigniorage_per_epoch),
            config.simulation.reward_weight,
        ),
        SimMarket::new(
            config.rewards.native_denom.clone(),
            config.rewards.reward_denom.clone(),
            config.simulation.swap_rate,
        ),
        SimBank::default(),
    ))
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// A price a validator has committed to but not yet revealed.
#[derive(Debug, Clone)]
struct PendingReveal {
    price: Decimal,
    salt: String,
}

/// Summary of a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimReport {
    pub blocks: u64,
    pub messages_delivered: usize,
    pub messages_rejected: usize,
    pub rates_accepted: usize,
    pub programs_passed: usize,
    pub distributions: usize,
    pub pass_errors: usize,
    /// Exchange rates in state after the last block.
    pub final_rates: BTreeMap<String, Decimal>,
}

/// Scripted validator behavior.
pub struct Simulator {
    config: NodeConfig,
    rng: StdRng,
    pending: BTreeMap<(ValidatorId, String), PendingReveal>,
    program_id: Option<u64>,
}

impl Simulator {
    pub fn new(config: NodeConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            pending: BTreeMap::new(),
            program_id: None,
        }
    }

    /// Run `config.blocks` blocks against `app`.
    pub fn run<S: KvStore>(
        &mut self,
        app: &mut App<'_, S>,
        validators: &[ValidatorId],
        bank: &SimBank,
    ) -> SimReport {
        let mut report = SimReport::default();
        for height in 0..self.config.blocks {
            let msgs = self.messages_for(height, validators);
            for msg in msgs {
                match app.deliver(msg, height) {
                    Ok(MsgResponse::ProgramSubmitted(id)) => {
                        self.program_id = Some(id);
                        report.messages_delivered += 1;
                    }
                    Ok(MsgResponse::Done) => report.messages_delivered += 1,
                    Err(e) => {
                        tracing::warn!(height, "simulated message rejected: {}", e);
                        report.messages_rejected += 1;
                    }
                }
            }

            bank.collect_fee(Coin::new(
                self.config.rewards.reward_denom.clone(),
                u128::from(self.config.simulation.fees_per_block),
            ));

            let outcome = app.end_block(height);
            tally_outcome(&mut report, &outcome);
            report.blocks += 1;
        }

        let oracle = app.oracle();
        for denom in &self.config.simulation.denoms {
            match oracle.exchange_rate(app.store(), denom) {
                Ok(Some(rate)) => {
                    report.final_rates.insert(denom.clone(), rate);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(denom = %denom, "cannot read exchange rate: {}", e),
            }
        }
        report
    }

    /// Messages the validator set sends at `height`.
    fn messages_for(&mut self, height: u64, validators: &[ValidatorId]) -> Vec<Msg> {
        let mut msgs = Vec::new();
        let vote_period = self.config.oracle.vote_period.max(1);

        // First block of each oracle period: reveal last period's prices,
        // then commit to new ones.
        if height % vote_period == 0 {
            for validator in validators {
                for denom in self.config.simulation.denoms.clone() {
                    if let Some(pending) = self.pending.remove(&(*validator, denom.clone())) {
                        msgs.push(Msg::SubmitVote {
                            denom: denom.clone(),
                            price: pending.price,
                            salt: pending.salt,
                            feeder: AccountId::from(*validator),
                            validator: *validator,
                        });
                    }

                    let price = self.jittered_price();
                    let salt = format!("{:08x}", self.rng.gen::<u32>());
                    msgs.push(Msg::SubmitCommitment {
                        denom: denom.clone(),
                        hash: vote_hash(&salt, price, &denom, validator),
                        feeder: AccountId::from(*validator),
                        validator: *validator,
                    });
                    self.pending
                        .insert((*validator, denom), PendingReveal { price, salt });
                }
            }
        }

        if height == 1 {
            if let Some(first) = validators.first() {
                msgs.push(Msg::SubmitProgram {
                    title: "Oracle feeder infrastructure".into(),
                    description: "Fund redundant price feeds for every whitelisted denom.".into(),
                    submitter: AccountId::from(*first),
                    executor: AccountId::from(*first),
                });
            }
        }

        if height == 2 {
            if let Some(program_id) = self.program_id {
                for validator in validators {
                    msgs.push(Msg::SubmitGovernanceVote {
                        program_id,
                        voter: AccountId::from(*validator),
                        option: VoteOption::Yes,
                    });
                }
            }
        }

        msgs
    }

    fn jittered_price(&mut self) -> Decimal {
        let bps = i64::from(self.config.simulation.jitter_bps);
        let jitter = self.rng.gen_range(-bps..=bps);
        let factor = Decimal::ONE + Decimal::new(jitter, 4);
        (self.config.simulation.base_price * factor).round_dp(6)
    }
}

fn tally_outcome(report: &mut SimReport, outcome: &BlockOutcome) {
    if let Some(price) = &outcome.price {
        report.rates_accepted += price
            .denoms
            .iter()
            .filter(|d| matches!(d.decision, concord_oracle::RateDecision::Accepted { .. }))
            .count();
        for denom in &price.denoms {
            tracing::info!(height = outcome.height, denom = %denom.denom, decision = ?denom.decision, "price pass");
        }
    }
    if let Some(gov) = &outcome.governance {
        report.programs_passed += gov
            .events
            .iter()
            .filter(|e| e.action == concord_budget::ProgramAction::Passed)
            .count();
    }
    report.distributions += usize::from(outcome.oracle_rewards.is_some())
        + usize::from(outcome.budget_rewards.is_some());
    report.pass_errors += outcome.errors.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_converts_one_way() {
        let market = SimMarket::new("ucon", "usdr", dec!(1.5));
        assert_eq!(
            market.convert(&Coin::new("ucon", 10), "usdr"),
            Some(Coin::new("usdr", 15))
        );
        assert_eq!(market.convert(&Coin::new("usdr", 10), "ucon"), None);
    }

    #[test]
    fn test_bank_mints_and_drains() {
        let bank = SimBank::default();
        bank.mint(&AccountId([1; 20]), &Coin::new("usdr", 5)).unwrap();
        bank.mint(&AccountId([1; 20]), &Coin::new("usdr", 7)).unwrap();
        assert_eq!(bank.balance(&AccountId([1; 20]), "usdr"), 12);

        bank.collect_fee(Coin::new("usdr", 3));
        bank.collect_fee(Coin::new("usdr", 0));
        assert_eq!(bank.drain_fee_pool(), vec![Coin::new("usdr", 3)]);
        assert!(bank.drain_fee_pool().is_empty());
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let mut config = NodeConfig::default();
        config.simulation.base_price = dec!(100);
        config.simulation.jitter_bps = 100;
        let mut sim = Simulator::new(config);
        for _ in 0..200 {
            let p = sim.jittered_price();
            assert!(p >= dec!(99) && p <= dec!(101));
        }
    }

    #[test]
    fn test_capabilities_from_default_config() {
        let (staking, _, _, _) = capabilities_from_config(&NodeConfig::default()).unwrap();
        assert_eq!(staking.validators().len(), 4);
        assert_eq!(staking.total_bonded_stake(), 4_000_000);
    }
}
