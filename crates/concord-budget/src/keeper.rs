// crates/concord-budget/src/keeper.rs
//
// BudgetKeeper: program lifecycle, governance votes, and the budget's share
// of epoch rewards.
//
// Every block the keeper resolves the candidates whose voting window ends
// at that height. On the last block of each budget vote period it re-tallies
// every Active program: programs that still clear `legacy_threshold` earn a
// budget claim for their executor worth their net vote power, the rest are
// retired. At the end of each reward epoch the un-earmarked seigniorage is
// paid out over the budget claim pool.

use serde::{Deserialize, Serialize};

use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::math::clears_threshold;
use concord_core::params::BudgetParams;
use concord_core::period::is_period_last_block;
use concord_core::traits::{MintSink, SeigniorageSource, SwapRateSource, ValidatorWeightSource};
use concord_economics::{
    denominate, seigniorage_reward, ClaimPool, DistributionOutcome, RewardDistributor,
};
use concord_store::{KvStore, ParamStore};

use crate::program::{validate_program_text, GovernanceVote, Program, ProgramStatus, VoteOption};
use crate::store::ProgramStore;
use crate::tally::tally;

/// What the governance pass did to a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramAction {
    /// Candidate cleared `active_threshold` and became Active.
    Passed,
    /// Candidate failed `active_threshold` and was deleted.
    Rejected,
    /// Active program cleared `legacy_threshold` and earned a claim.
    Granted,
    /// Active program failed `legacy_threshold` and was deleted.
    Legacied,
}

/// One program decision in a governance pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEvent {
    pub program_id: u64,
    pub action: ProgramAction,
    pub vote_power: i128,
    pub total_power: u128,
}

/// Result of one governance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePassOutcome {
    pub height: u64,
    /// Whether Active programs were re-tallied this block.
    pub retallied: bool,
    pub events: Vec<ProgramEvent>,
}

impl GovernancePassOutcome {
    pub fn action_for(&self, program_id: u64) -> Option<ProgramAction> {
        self.events
            .iter()
            .rev()
            .find(|e| e.program_id == program_id)
            .map(|e| e.action)
    }
}

/// Budget/governance service for one block context.
pub struct BudgetKeeper<'a> {
    weights: &'a dyn ValidatorWeightSource,
    seigniorage: &'a dyn SeigniorageSource,
    swap: &'a dyn SwapRateSource,
    mint: &'a dyn MintSink,
}

impl<'a> BudgetKeeper<'a> {
    pub fn new(
        weights: &'a dyn ValidatorWeightSource,
        seigniorage: &'a dyn SeigniorageSource,
        swap: &'a dyn SwapRateSource,
        mint: &'a dyn MintSink,
    ) -> Self {
        Self {
            weights,
            seigniorage,
            swap,
            mint,
        }
    }

    pub fn params(&self, store: &dyn KvStore) -> Result<BudgetParams, ConcordError> {
        ParamStore::budget(store)
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Submit a new candidate program.
    ///
    /// # Returns
    /// The new program id. Ids start at 1 and are never reused.
    ///
    /// # Errors
    /// `InvalidInput` when the title or description is empty or too long.
    pub fn submit_program(
        &self,
        store: &mut dyn KvStore,
        title: &str,
        description: &str,
        submitter: &AccountId,
        executor: &AccountId,
        height: u64,
    ) -> Result<u64, ConcordError> {
        validate_program_text(title, description)?;
        let params = self.params(store)?;

        let id = ProgramStore::allocate_id(store)?;
        let voting_end_block = height.saturating_add(params.vote_period);
        let program = Program {
            id,
            title: title.to_string(),
            description: description.to_string(),
            submitter: *submitter,
            executor: *executor,
            submit_block: height,
            voting_end_block,
            status: ProgramStatus::Candidate,
        };
        ProgramStore::put(store, &program)?;
        ProgramStore::enqueue(store, voting_end_block, id)?;

        tracing::info!(program_id = id, %submitter, %executor, voting_end_block, "program submitted");
        Ok(id)
    }

    /// Cast or replace `voter`'s vote on `program_id`.
    ///
    /// # Errors
    /// - `NotFound` when the program does not exist.
    /// - `InvalidInput` when a candidate's voting window has already closed.
    /// - `Unauthorized` when `voter` is not a current validator.
    pub fn submit_governance_vote(
        &self,
        store: &mut dyn KvStore,
        program_id: u64,
        voter: &AccountId,
        option: VoteOption,
        height: u64,
    ) -> Result<(), ConcordError> {
        let program = ProgramStore::get(store, program_id)?
            .ok_or_else(|| ConcordError::NotFound(format!("program {}", program_id)))?;
        if program.status == ProgramStatus::Candidate && height > program.voting_end_block {
            return Err(ConcordError::InvalidInput(format!(
                "voting on program {} closed at block {}",
                program_id, program.voting_end_block
            )));
        }
        if self.weights.stake_of(&ValidatorId::from(*voter)).is_none() {
            return Err(ConcordError::Unauthorized(format!(
                "{} is not a validator",
                voter
            )));
        }

        ProgramStore::put_vote(
            store,
            &GovernanceVote {
                program_id,
                voter: *voter,
                option,
            },
        )?;
        tracing::debug!(program_id, %voter, ?option, height, "governance vote recorded");
        Ok(())
    }

    /// Withdraw a program. Only its submitter may do this.
    pub fn withdraw_program(
        &self,
        store: &mut dyn KvStore,
        program_id: u64,
        signer: &AccountId,
    ) -> Result<(), ConcordError> {
        let program = ProgramStore::get(store, program_id)?
            .ok_or_else(|| ConcordError::NotFound(format!("program {}", program_id)))?;
        if program.submitter != *signer {
            return Err(ConcordError::Unauthorized(format!(
                "{} did not submit program {}",
                signer, program_id
            )));
        }

        ProgramStore::purge(store, program_id)?;
        ProgramStore::dequeue(store, program.voting_end_block, program_id)?;
        tracing::info!(program_id, %signer, "program withdrawn");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn program(&self, store: &dyn KvStore, program_id: u64) -> Result<Option<Program>, ConcordError> {
        ProgramStore::get(store, program_id)
    }

    /// Every stored program, optionally only Active ones.
    pub fn programs(&self, store: &dyn KvStore, active_only: bool) -> Result<Vec<Program>, ConcordError> {
        let mut programs = ProgramStore::all(store)?;
        if active_only {
            programs.retain(Program::is_active);
        }
        Ok(programs)
    }

    pub fn votes_for(
        &self,
        store: &dyn KvStore,
        program_id: u64,
    ) -> Result<Vec<GovernanceVote>, ConcordError> {
        ProgramStore::votes_for(store, program_id)
    }

    /// The candidate queue as `(voting_end_block, program_id)`.
    pub fn candidate_queue(&self, store: &dyn KvStore) -> Result<Vec<(u64, u64)>, ConcordError> {
        ProgramStore::queue(store)
    }

    // -----------------------------------------------------------------------
    // Periodic
    // -----------------------------------------------------------------------

    /// Resolve expiring candidates and, on a period's last block, re-weight
    /// Active programs.
    pub fn run_governance_pass(
        &self,
        store: &mut dyn KvStore,
        height: u64,
    ) -> Result<GovernancePassOutcome, ConcordError> {
        let params = self.params(store)?;
        let mut outcome = GovernancePassOutcome {
            height,
            ..GovernancePassOutcome::default()
        };

        self.resolve_candidates(store, &params, height, &mut outcome)?;

        if is_period_last_block(height, params.vote_period) {
            outcome.retallied = true;
            self.retally_active(store, &params, &mut outcome)?;
        }
        Ok(outcome)
    }

    fn resolve_candidates(
        &self,
        store: &mut dyn KvStore,
        params: &BudgetParams,
        height: u64,
        outcome: &mut GovernancePassOutcome,
    ) -> Result<(), ConcordError> {
        for (end_block, program_id) in ProgramStore::due_by(store, height)? {
            ProgramStore::dequeue(store, end_block, program_id)?;

            let mut program = match ProgramStore::get(store, program_id) {
                Ok(Some(p)) => p,
                Ok(None) => {
                    tracing::warn!(program_id, height, "queued program missing, skipping");
                    continue;
                }
                Err(ConcordError::Serialization(e)) => {
                    tracing::warn!(program_id, height, "deleting undecodable program: {}", e);
                    ProgramStore::purge(store, program_id)?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let t = tally(store, self.weights, program_id)?;
            let action = if clears_threshold(t.vote_power, t.total_power, params.active_threshold) {
                program.status = ProgramStatus::Active;
                ProgramStore::put(store, &program)?;
                ProgramAction::Passed
            } else {
                ProgramStore::purge(store, program_id)?;
                ProgramAction::Rejected
            };

            tracing::info!(
                program_id,
                vote_power = t.vote_power,
                total_power = t.total_power,
                ?action,
                "candidate program resolved"
            );
            outcome.events.push(ProgramEvent {
                program_id,
                action,
                vote_power: t.vote_power,
                total_power: t.total_power,
            });
        }
        Ok(())
    }

    fn retally_active(
        &self,
        store: &mut dyn KvStore,
        params: &BudgetParams,
        outcome: &mut GovernancePassOutcome,
    ) -> Result<(), ConcordError> {
        let pool = ClaimPool::budget();
        let scan = ProgramStore::scan(store)?;
        for key in &scan.corrupt {
            store.delete(key)?;
        }
        for program in scan.into_values().into_iter().filter(Program::is_active) {
            let t = tally(store, self.weights, program.id)?;
            let action = if clears_threshold(t.vote_power, t.total_power, params.legacy_threshold) {
                // Clearing a non-negative threshold implies vote_power >= 0.
                pool.add(store, &program.executor, t.vote_power.max(0) as u128)?;
                ProgramAction::Granted
            } else {
                ProgramStore::purge(store, program.id)?;
                ProgramAction::Legacied
            };

            tracing::info!(
                program_id = program.id,
                executor = %program.executor,
                vote_power = t.vote_power,
                ?action,
                "active program re-weighted"
            );
            outcome.events.push(ProgramEvent {
                program_id: program.id,
                action,
                vote_power: t.vote_power,
                total_power: t.total_power,
            });
        }
        Ok(())
    }

    /// Pay this epoch's budget share of seigniorage over the budget claim
    /// pool and clear it.
    pub fn run_epoch_distribution(
        &self,
        store: &mut dyn KvStore,
        epoch: u64,
    ) -> Result<DistributionOutcome, ConcordError> {
        let rewards = ParamStore::rewards(store)?;
        let native = seigniorage_reward(self.seigniorage, epoch, &rewards.native_denom);
        let reward = denominate(native, self.swap, &rewards.reward_denom);
        RewardDistributor::new(self.mint).distribute(store, &ClaimPool::budget(), epoch, &[reward])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::coin::Coin;
    use concord_core::keys::{governance_vote_key, program_key};
    use concord_core::Decimal;
    use concord_store::MemoryStore;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    /// Validators 1..=4 with 25 stake each.
    struct Stakes;

    impl ValidatorWeightSource for Stakes {
        fn total_bonded_stake(&self) -> u128 {
            100
        }

        fn stake_of(&self, validator: &ValidatorId) -> Option<u128> {
            (1..=4).contains(&validator.0[0]).then_some(25)
        }
    }

    struct Treasury;

    impl SeigniorageSource for Treasury {
        fn peek_epoch_seigniorage(&self, _epoch: u64) -> u128 {
            1_000
        }

        fn reward_weight(&self, _epoch: u64) -> Decimal {
            dec!(0.5)
        }
    }

    struct NoMarket;

    impl SwapRateSource for NoMarket {
        fn convert(&self, _coin: &Coin, _to_denom: &str) -> Option<Coin> {
            None
        }
    }

    #[derive(Default)]
    struct Bank(RefCell<Vec<(AccountId, Coin)>>);

    impl MintSink for Bank {
        fn mint(&self, recipient: &AccountId, coin: &Coin) -> Result<(), ConcordError> {
            self.0.borrow_mut().push((*recipient, coin.clone()));
            Ok(())
        }
    }

    fn acct(b: u8) -> AccountId {
        AccountId([b; 20])
    }

    fn short_period(store: &mut MemoryStore) {
        ParamStore::set_budget(
            store,
            &BudgetParams {
                vote_period: 10,
                active_threshold: dec!(0.5),
                legacy_threshold: Decimal::ZERO,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_submit_program_enqueues_candidate() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);

        let id = keeper
            .submit_program(&mut store, "grants", "fund things", &acct(9), &acct(8), 5)
            .unwrap();
        assert_eq!(id, 1);

        let program = keeper.program(&store, id).unwrap().unwrap();
        assert_eq!(program.status, ProgramStatus::Candidate);
        assert_eq!(program.voting_end_block, 15);
        assert_eq!(keeper.candidate_queue(&store).unwrap(), vec![(15, 1)]);
    }

    #[test]
    fn test_submit_program_rejects_empty_title() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        let err = keeper
            .submit_program(&mut store, "", "d", &acct(9), &acct(8), 0)
            .unwrap_err();
        assert!(matches!(err, ConcordError::InvalidInput(_)));
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_vote_validation() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 0)
            .unwrap();

        assert!(matches!(
            keeper.submit_governance_vote(&mut store, 99, &acct(1), VoteOption::Yes, 1),
            Err(ConcordError::NotFound(_))
        ));
        assert!(matches!(
            keeper.submit_governance_vote(&mut store, id, &acct(7), VoteOption::Yes, 1),
            Err(ConcordError::Unauthorized(_))
        ));
        assert!(matches!(
            keeper.submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 11),
            Err(ConcordError::InvalidInput(_))
        ));

        keeper
            .submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 10)
            .unwrap();
        keeper
            .submit_governance_vote(&mut store, id, &acct(1), VoteOption::No, 10)
            .unwrap();
        let votes = keeper.votes_for(&store, id).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].option, VoteOption::No);
    }

    #[test]
    fn test_candidate_passes_at_exact_threshold() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 3)
            .unwrap();
        // 50 of 100 against a 0.5 threshold.
        keeper.submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 4).unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(2), VoteOption::Yes, 4).unwrap();

        let before = keeper.run_governance_pass(&mut store, 12).unwrap();
        assert!(before.events.is_empty());

        let outcome = keeper.run_governance_pass(&mut store, 13).unwrap();
        assert_eq!(outcome.action_for(id), Some(ProgramAction::Passed));
        assert!(keeper.program(&store, id).unwrap().unwrap().is_active());
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_candidate_rejected_below_threshold() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 0)
            .unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 1).unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(2), VoteOption::Yes, 1).unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(3), VoteOption::No, 1).unwrap();

        let outcome = keeper.run_governance_pass(&mut store, 10).unwrap();
        assert_eq!(outcome.action_for(id), Some(ProgramAction::Rejected));
        assert!(keeper.program(&store, id).unwrap().is_none());
        assert!(keeper.votes_for(&store, id).unwrap().is_empty());
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_active_program_granted_then_legacied() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 0)
            .unwrap();
        for v in 1..=3 {
            keeper.submit_governance_vote(&mut store, id, &acct(v), VoteOption::Yes, 1).unwrap();
        }
        keeper.run_governance_pass(&mut store, 10).unwrap();

        // Height 19 is the last block of the second period.
        let granted = keeper.run_governance_pass(&mut store, 19).unwrap();
        assert!(granted.retallied);
        assert_eq!(granted.action_for(id), Some(ProgramAction::Granted));
        assert_eq!(ClaimPool::budget().weight_of(&store, &acct(8)).unwrap(), 75);

        for v in 1..=4 {
            keeper.submit_governance_vote(&mut store, id, &acct(v), VoteOption::No, 20).unwrap();
        }
        let legacied = keeper.run_governance_pass(&mut store, 29).unwrap();
        assert_eq!(legacied.action_for(id), Some(ProgramAction::Legacied));
        assert!(keeper.program(&store, id).unwrap().is_none());
    }

    #[test]
    fn test_missing_program_in_queue_skipped() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        ProgramStore::enqueue(&mut store, 7, 42).unwrap();

        let outcome = keeper.run_governance_pass(&mut store, 7).unwrap();
        assert!(outcome.events.is_empty());
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_overdue_candidate_resolved_on_later_block() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 0)
            .unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 1).unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(2), VoteOption::Yes, 1).unwrap();

        // The pass at height 10 never ran.
        let outcome = keeper.run_governance_pass(&mut store, 11).unwrap();
        assert_eq!(outcome.action_for(id), Some(ProgramAction::Passed));
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_records_skipped_by_governance_pass() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        short_period(&mut store);
        let good = keeper
            .submit_program(&mut store, "good", "d", &acct(9), &acct(8), 0)
            .unwrap();
        let bad = keeper
            .submit_program(&mut store, "bad", "d", &acct(9), &acct(8), 0)
            .unwrap();
        store.set(&program_key(bad), b"not json").unwrap();
        keeper.submit_governance_vote(&mut store, good, &acct(1), VoteOption::Yes, 1).unwrap();
        keeper.submit_governance_vote(&mut store, good, &acct(2), VoteOption::Yes, 1).unwrap();
        store
            .set(&governance_vote_key(good, &acct(3)), b"not json")
            .unwrap();

        let outcome = keeper.run_governance_pass(&mut store, 10).unwrap();
        assert_eq!(outcome.action_for(good), Some(ProgramAction::Passed));
        assert_eq!(outcome.action_for(bad), None);
        assert!(store.get(&program_key(bad)).unwrap().is_none());
        assert!(store.get(&governance_vote_key(good, &acct(3))).unwrap().is_none());
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_withdraw_program() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        let id = keeper
            .submit_program(&mut store, "t", "d", &acct(9), &acct(8), 0)
            .unwrap();
        keeper.submit_governance_vote(&mut store, id, &acct(1), VoteOption::Yes, 1).unwrap();

        assert!(matches!(
            keeper.withdraw_program(&mut store, id, &acct(8)),
            Err(ConcordError::Unauthorized(_))
        ));
        keeper.withdraw_program(&mut store, id, &acct(9)).unwrap();
        assert!(keeper.program(&store, id).unwrap().is_none());
        assert!(keeper.votes_for(&store, id).unwrap().is_empty());
        assert!(keeper.candidate_queue(&store).unwrap().is_empty());
    }

    #[test]
    fn test_epoch_distribution_falls_back_to_native() {
        let bank = Bank::default();
        let keeper = BudgetKeeper::new(&Stakes, &Treasury, &NoMarket, &bank);
        let mut store = MemoryStore::new();
        ClaimPool::budget().add(&mut store, &acct(8), 3).unwrap();

        let outcome = keeper.run_epoch_distribution(&mut store, 0).unwrap();
        assert_eq!(outcome.distributed("ucon"), 500);
        assert_eq!(*bank.0.borrow(), vec![(acct(8), Coin::new("ucon", 500))]);
    }
}
