// crates/concord-oracle/src/keeper.rs
//
// OracleKeeper: message handlers, queries, and periodic entry points of the
// price oracle.
//
// The keeper holds only capability references. All state goes through the
// `KvStore` passed into each call, so the caller decides whether a message
// runs in a discardable branch or directly against the block state.

use concord_core::crypto::{vote_hash, VoteHash};
use concord_core::error::ConcordError;
use concord_core::identity::{AccountId, ValidatorId};
use concord_core::keys::validate_denom;
use concord_core::params::OracleParams;
use concord_core::period::period_of;
use concord_core::traits::{FeeCollector, MintSink, ValidatorWeightSource};
use concord_core::Decimal;
use concord_economics::{fee_pool_rewards, ClaimPool, DistributionOutcome, RewardDistributor};
use concord_store::{KvStore, ParamStore};

use crate::commit::{CommitStore, Commitment};
use crate::feeder::{authorize_feeder, feed_delegate, set_feed_delegate};
use crate::rates;
use crate::reveal::{RevealStore, Vote};
use crate::tally::{PricePassOutcome, PriceTally};

/// Price oracle service for one block context.
pub struct OracleKeeper<'a> {
    weights: &'a dyn ValidatorWeightSource,
    fees: &'a dyn FeeCollector,
    mint: &'a dyn MintSink,
}

impl<'a> OracleKeeper<'a> {
    pub fn new(
        weights: &'a dyn ValidatorWeightSource,
        fees: &'a dyn FeeCollector,
        mint: &'a dyn MintSink,
    ) -> Self {
        Self {
            weights,
            fees,
            mint,
        }
    }

    pub fn params(&self, store: &dyn KvStore) -> Result<OracleParams, ConcordError> {
        ParamStore::oracle(store)
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Store (or replace) `validator`'s commitment for `denom`.
    pub fn submit_commitment(
        &self,
        store: &mut dyn KvStore,
        denom: &str,
        hash: VoteHash,
        feeder: &AccountId,
        validator: &ValidatorId,
        height: u64,
    ) -> Result<(), ConcordError> {
        let params = self.params(store)?;
        check_denom(&params, denom)?;
        authorize_feeder(store, self.weights, feeder, validator)?;

        CommitStore::put(
            store,
            &Commitment {
                denom: denom.to_string(),
                hash,
                feeder: *feeder,
                validator: *validator,
                submitted_at: height,
            },
        )?;
        tracing::debug!(denom, %validator, %hash, height, "price commitment stored");
        Ok(())
    }

    /// Reveal the price behind `validator`'s outstanding commitment.
    ///
    /// The reveal must hash to the stored commitment and arrive in the vote
    /// period right after the one the commitment was made in. On success
    /// the vote is stored and the commitment consumed.
    pub fn submit_vote(
        &self,
        store: &mut dyn KvStore,
        denom: &str,
        price: Decimal,
        salt: &str,
        feeder: &AccountId,
        validator: &ValidatorId,
        height: u64,
    ) -> Result<(), ConcordError> {
        let params = self.params(store)?;
        check_denom(&params, denom)?;
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ConcordError::InvalidPrice(price));
        }
        if salt.is_empty() {
            return Err(ConcordError::InvalidInput("salt must not be empty".into()));
        }
        authorize_feeder(store, self.weights, feeder, validator)?;

        let commitment = CommitStore::get(store, denom, validator)?.ok_or_else(|| {
            ConcordError::VerificationFailed(format!(
                "no commitment for {} from {}",
                denom, validator
            ))
        })?;
        let revealed = vote_hash(salt, price, denom, validator);
        if revealed != commitment.hash {
            return Err(ConcordError::VerificationFailed(format!(
                "reveal hash {} does not match commitment {}",
                revealed, commitment.hash
            )));
        }

        let committed_period = period_of(commitment.submitted_at, params.vote_period);
        let current_period = period_of(height, params.vote_period);
        if current_period.checked_sub(committed_period) != Some(1) {
            return Err(ConcordError::InvalidInput(format!(
                "reveal in period {} for commitment from period {}",
                current_period, committed_period
            )));
        }

        RevealStore::put(
            store,
            &Vote {
                denom: denom.to_string(),
                price,
                voter: *validator,
                revealed_at: height,
            },
        )?;
        CommitStore::remove(store, denom, validator)?;
        tracing::debug!(denom, %validator, %price, height, "price vote revealed");
        Ok(())
    }

    /// Let `delegate` feed prices for `operator`. Only the operator's own
    /// account may sign this.
    pub fn delegate_vote_right(
        &self,
        store: &mut dyn KvStore,
        operator: &ValidatorId,
        delegate: &AccountId,
        signer: &AccountId,
    ) -> Result<(), ConcordError> {
        if *signer != AccountId::from(*operator) {
            return Err(ConcordError::Unauthorized(format!(
                "{} cannot delegate the feed right of {}",
                signer, operator
            )));
        }
        if self.weights.stake_of(operator).is_none() {
            return Err(ConcordError::Unauthorized(format!(
                "{} is not a validator",
                operator
            )));
        }
        set_feed_delegate(store, operator, delegate)?;
        tracing::info!(%operator, %delegate, "feed right delegated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn exchange_rate(
        &self,
        store: &dyn KvStore,
        denom: &str,
    ) -> Result<Option<Decimal>, ConcordError> {
        rates::exchange_rate(store, denom)
    }

    pub fn active_denoms(&self, store: &dyn KvStore) -> Result<Vec<String>, ConcordError> {
        rates::active_denoms(store)
    }

    pub fn commitment(
        &self,
        store: &dyn KvStore,
        denom: &str,
        validator: &ValidatorId,
    ) -> Result<Option<Commitment>, ConcordError> {
        CommitStore::get(store, denom, validator)
    }

    pub fn vote(
        &self,
        store: &dyn KvStore,
        denom: &str,
        validator: &ValidatorId,
    ) -> Result<Option<Vote>, ConcordError> {
        RevealStore::get(store, denom, validator)
    }

    pub fn feed_delegate(
        &self,
        store: &dyn KvStore,
        operator: &ValidatorId,
    ) -> Result<AccountId, ConcordError> {
        feed_delegate(store, operator)
    }

    // -----------------------------------------------------------------------
    // Periodic
    // -----------------------------------------------------------------------

    /// Tally every ballot. Callers run this on the last block of a vote
    /// period.
    pub fn run_price_pass(
        &self,
        store: &mut dyn KvStore,
        height: u64,
    ) -> Result<PricePassOutcome, ConcordError> {
        let params = self.params(store)?;
        PriceTally::new(self.weights).run(store, &params, height)
    }

    /// Pay the collected fees out over the oracle claim pool and clear it.
    /// The fee pool is drained only after the claims have been read.
    pub fn run_epoch_distribution(
        &self,
        store: &mut dyn KvStore,
        epoch: u64,
    ) -> Result<DistributionOutcome, ConcordError> {
        RewardDistributor::new(self.mint).distribute_with(store, &ClaimPool::oracle(), epoch, || {
            fee_pool_rewards(self.fees)
        })
    }
}

fn check_denom(params: &OracleParams, denom: &str) -> Result<(), ConcordError> {
    validate_denom(denom)?;
    if !params.accepts_denom(denom) {
        return Err(ConcordError::InvalidInput(format!(
            "denom {:?} is not whitelisted",
            denom
        )));
    }
    Ok(())
}
