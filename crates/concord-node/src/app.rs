// crates/concord-node/src/app.rs
//
// Block finalizer.
//
// `deliver` executes one message inside its own write branch: a failing
// message leaves no trace in state. `end_block` runs the periodic passes in a
// fixed order:
//
//   1. oracle price pass      (last block of an oracle vote period)
//   2. governance pass        (every block)
//   3. oracle distribution    (last block of a reward epoch)
//   4. budget distribution    (last block of a reward epoch)
//
// Each pass also runs in its own branch. A pass that fails is discarded and
// reported in the block outcome; the remaining passes still run.

use serde::Serialize;

use concord_budget::{BudgetKeeper, GovernancePassOutcome, VoteOption};
use concord_core::crypto::VoteHash;
use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::params::{BudgetParams, OracleParams, RewardParams};
use concord_core::period::{epoch_of, is_period_last_block};
use concord_core::traits::{
    FeeCollector, MintSink, SeigniorageSource, SwapRateSource, ValidatorWeightSource,
};
use concord_core::Decimal;
use concord_economics::DistributionOutcome;
use concord_oracle::{OracleKeeper, PricePassOutcome};
use concord_store::{BranchStore, KvStore, ParamStore};

/// A state-changing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    SubmitCommitment {
        denom: String,
        hash: VoteHash,
        feeder: AccountId,
        validator: ValidatorId,
    },
    SubmitVote {
        denom: String,
        price: Decimal,
        salt: String,
        feeder: AccountId,
        validator: ValidatorId,
    },
    DelegateVoteRight {
        operator: ValidatorId,
        delegate: AccountId,
        signer: AccountId,
    },
    SubmitProgram {
        title: String,
        description: String,
        submitter: AccountId,
        executor: AccountId,
    },
    SubmitGovernanceVote {
        program_id: u64,
        voter: AccountId,
        option: VoteOption,
    },
    WithdrawProgram {
        program_id: u64,
        signer: AccountId,
    },
}

impl Msg {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::SubmitCommitment { .. } => "submit_commitment",
            Msg::SubmitVote { .. } => "submit_vote",
            Msg::DelegateVoteRight { .. } => "delegate_vote_right",
            Msg::SubmitProgram { .. } => "submit_program",
            Msg::SubmitGovernanceVote { .. } => "submit_governance_vote",
            Msg::WithdrawProgram { .. } => "withdraw_program",
        }
    }
}

/// What a successfully delivered message produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgResponse {
    Done,
    ProgramSubmitted(u64),
}

/// Everything `end_block` did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockOutcome {
    pub height: u64,
    pub price: Option<PricePassOutcome>,
    pub governance: Option<GovernancePassOutcome>,
    pub oracle_rewards: Option<DistributionOutcome>,
    pub budget_rewards: Option<DistributionOutcome>,
    /// Passes that failed, as `(pass, error)`.
    pub errors: Vec<(String, String)>,
}

/// External capabilities the engine consumes.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub weights: &'a dyn ValidatorWeightSource,
    pub seigniorage: &'a dyn SeigniorageSource,
    pub swap: &'a dyn SwapRateSource,
    pub mint: &'a dyn MintSink,
    pub fees: &'a dyn FeeCollector,
}

/// The engine: a state store plus the capabilities it runs against.
pub struct App<'a, S: KvStore> {
    store: S,
    caps: Capabilities<'a>,
}

impl<'a, S: KvStore> App<'a, S> {
    pub fn new(store: S, caps: Capabilities<'a>) -> Self {
        Self { store, caps }
    }

    /// Write module params through the validating param store.
    pub fn init_params(
        &mut self,
        oracle: &OracleParams,
        budget: &BudgetParams,
        rewards: &RewardParams,
    ) -> Result<(), ConcordError> {
        ParamStore::set_oracle(&mut self.store, oracle)?;
        ParamStore::set_budget(&mut self.store, budget)?;
        ParamStore::set_rewards(&mut self.store, rewards)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn oracle(&self) -> OracleKeeper<'a> {
        OracleKeeper::new(self.caps.weights, self.caps.fees, self.caps.mint)
    }

    pub fn budget(&self) -> BudgetKeeper<'a> {
        BudgetKeeper::new(
            self.caps.weights,
            self.caps.seigniorage,
            self.caps.swap,
            self.caps.mint,
        )
    }

    /// Execute `msg` at `height`. On error nothing is written.
    pub fn deliver(&mut self, msg: Msg, height: u64) -> Result<MsgResponse, ConcordError> {
        let oracle = self.oracle();
        let budget = self.budget();
        let kind = msg.kind();

        let mut branch = BranchStore::new(&mut self.store);
        let result = match msg {
            Msg::SubmitCommitment {
                denom,
                hash,
                feeder,
                validator,
            } => oracle
                .submit_commitment(&mut branch, &denom, hash, &feeder, &validator, height)
                .map(|_| MsgResponse::Done),
            Msg::SubmitVote {
                denom,
                price,
                salt,
                feeder,
                validator,
            } => oracle
                .submit_vote(&mut branch, &denom, price, &salt, &feeder, &validator, height)
                .map(|_| MsgResponse::Done),
            Msg::DelegateVoteRight {
                operator,
                delegate,
                signer,
            } => oracle
                .delegate_vote_right(&mut branch, &operator, &delegate, &signer)
                .map(|_| MsgResponse::Done),
            Msg::SubmitProgram {
                title,
                description,
                submitter,
                executor,
            } => budget
                .submit_program(&mut branch, &title, &description, &submitter, &executor, height)
                .map(MsgResponse::ProgramSubmitted),
            Msg::SubmitGovernanceVote {
                program_id,
                voter,
                option,
            } => budget
                .submit_governance_vote(&mut branch, program_id, &voter, option, height)
                .map(|_| MsgResponse::Done),
            Msg::WithdrawProgram { program_id, signer } => budget
                .withdraw_program(&mut branch, program_id, &signer)
                .map(|_| MsgResponse::Done),
        };

        match result {
            Ok(response) => {
                branch.commit()?;
                Ok(response)
            }
            Err(e) => {
                if e.is_validation() {
                    tracing::debug!(height, msg = kind, "message rejected: {}", e);
                } else {
                    tracing::warn!(height, msg = kind, "message failed: {}", e);
                }
                Err(e)
            }
        }
    }

    /// Run the periodic passes for `height`.
    pub fn end_block(&mut self, height: u64) -> BlockOutcome {
        let mut outcome = BlockOutcome {
            height,
            ..BlockOutcome::default()
        };
        let oracle = self.oracle();
        let budget = self.budget();

        let oracle_params = match ParamStore::oracle(&self.store) {
            Ok(p) => Some(p),
            Err(e) => {
                record_failure(&mut outcome, "oracle_params", e);
                None
            }
        };
        let reward_params = match ParamStore::rewards(&self.store) {
            Ok(p) => Some(p),
            Err(e) => {
                record_failure(&mut outcome, "reward_params", e);
                None
            }
        };

        if let Some(params) = &oracle_params {
            if is_period_last_block(height, params.vote_period) {
                outcome.price = self.run_pass(&mut outcome, "price", |store| {
                    oracle.run_price_pass(store, height)
                });
            }
        }

        outcome.governance = self.run_pass(&mut outcome, "governance", |store| {
            budget.run_governance_pass(store, height)
        });

        if let Some(params) = &reward_params {
            if is_period_last_block(height, params.blocks_per_epoch) {
                let epoch = epoch_of(height, params.blocks_per_epoch);
                outcome.oracle_rewards = self.run_pass(&mut outcome, "oracle_rewards", |store| {
                    oracle.run_epoch_distribution(store, epoch)
                });
                outcome.budget_rewards = self.run_pass(&mut outcome, "budget_rewards", |store| {
                    budget.run_epoch_distribution(store, epoch)
                });
                tracing::info!(height, epoch, "reward epoch closed");
            }
        }

        outcome
    }

    /// Run one pass in a branch, committing only if it succeeds.
    fn run_pass<T>(
        &mut self,
        outcome: &mut BlockOutcome,
        name: &str,
        pass: impl FnOnce(&mut dyn KvStore) -> Result<T, ConcordError>,
    ) -> Option<T> {
        let mut branch = BranchStore::new(&mut self.store);
        match pass(&mut branch).and_then(|value| branch.commit().map(|_| value)) {
            Ok(value) => Some(value),
            Err(e) => {
                record_failure(outcome, name, e);
                None
            }
        }
    }
}

fn record_failure(outcome: &mut BlockOutcome, pass: &str, error: ConcordError) {
    tracing::error!(height = outcome.height, pass, "periodic pass failed: {}", error);
    outcome.errors.push((pass.to_string(), error.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBank, SimMarket, SimStaking, SimTreasury};
    use concord_core::crypto::vote_hash;
    use concord_core::keys::{params_key, vote_key};
    use concord_store::{KvStoreExt, MemoryStore};
    use rust_decimal_macros::dec;

    fn val(b: u8) -> ValidatorId {
        ValidatorId([b; 20])
    }

    fn fixtures() -> (SimStaking, SimTreasury, SimMarket, SimBank) {
        (
            SimStaking::new((1..=3).map(|b| (val(b), 100)).collect()),
            SimTreasury::new(1_000, dec!(0.5)),
            SimMarket::new("ucon", "usdr", dec!(1)),
            SimBank::default(),
        )
    }

    #[test]
    fn test_failed_message_leaves_no_writes() {
        let (staking, treasury, market, bank) = fixtures();
        let caps = Capabilities {
            weights: &staking,
            seigniorage: &treasury,
            swap: &market,
            mint: &bank,
            fees: &bank,
        };
        let mut app = App::new(MemoryStore::new(), caps);

        let err = app
            .deliver(
                Msg::SubmitCommitment {
                    denom: "ukrw".into(),
                    hash: vote_hash("s", dec!(1), "ukrw", &val(1)),
                    feeder: AccountId([9; 20]),
                    validator: val(1),
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, ConcordError::Unauthorized(_)));
        assert!(app.store().is_empty());
    }

    #[test]
    fn test_submit_program_returns_id() {
        let (staking, treasury, market, bank) = fixtures();
        let caps = Capabilities {
            weights: &staking,
            seigniorage: &treasury,
            swap: &market,
            mint: &bank,
            fees: &bank,
        };
        let mut app = App::new(MemoryStore::new(), caps);

        let response = app
            .deliver(
                Msg::SubmitProgram {
                    title: "t".into(),
                    description: "d".into(),
                    submitter: AccountId([1; 20]),
                    executor: AccountId([2; 20]),
                },
                0,
            )
            .unwrap();
        assert_eq!(response, MsgResponse::ProgramSubmitted(1));
    }

    #[test]
    fn test_end_block_runs_passes_on_schedule() {
        let (staking, treasury, market, bank) = fixtures();
        let caps = Capabilities {
            weights: &staking,
            seigniorage: &treasury,
            swap: &market,
            mint: &bank,
            fees: &bank,
        };
        let mut app = App::new(MemoryStore::new(), caps);
        app.init_params(
            &OracleParams {
                vote_period: 4,
                ..OracleParams::default()
            },
            &BudgetParams {
                vote_period: 4,
                ..BudgetParams::default()
            },
            &RewardParams {
                blocks_per_epoch: 8,
                ..RewardParams::default()
            },
        )
        .unwrap();

        let mid = app.end_block(2);
        assert!(mid.price.is_none());
        assert!(mid.governance.is_some());
        assert!(mid.oracle_rewards.is_none());

        let period_end = app.end_block(3);
        assert!(period_end.price.is_some());
        assert!(period_end.budget_rewards.is_none());

        let epoch_end = app.end_block(7);
        assert!(epoch_end.price.is_some());
        assert_eq!(epoch_end.oracle_rewards.unwrap().epoch, 0);
        assert_eq!(epoch_end.budget_rewards.unwrap().epoch, 0);
        assert!(epoch_end.errors.is_empty());
    }

    #[test]
    fn test_unreadable_params_reported_not_fatal() {
        let (staking, treasury, market, bank) = fixtures();
        let caps = Capabilities {
            weights: &staking,
            seigniorage: &treasury,
            swap: &market,
            mint: &bank,
            fees: &bank,
        };
        let mut store = MemoryStore::new();
        store.set(&params_key(0x01), b"not json").unwrap();
        let mut app = App::new(store, caps);

        let outcome = app.end_block(11);
        assert!(outcome.price.is_none());
        assert!(outcome.governance.is_some());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].0, "oracle_params");
    }

    #[test]
    fn test_undecodable_vote_does_not_block_price_pass() {
        let (staking, treasury, market, bank) = fixtures();
        let caps = Capabilities {
            weights: &staking,
            seigniorage: &treasury,
            swap: &market,
            mint: &bank,
            fees: &bank,
        };
        let mut store = MemoryStore::new();
        let bad_vote = vote_key("ukrw", &val(1));
        store.set(&bad_vote, b"not json").unwrap();
        let mut app = App::new(store, caps);

        let outcome = app.end_block(OracleParams::default().vote_period - 1);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.price.unwrap().votes_cleared, 1);
        assert!(!app.store().has(&bad_vote).unwrap());
    }
}
