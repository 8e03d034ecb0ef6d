// crates/concord-oracle/src/ballot.rs
//
// Stake-weighted median over one denom's votes.
//
// Entries are sorted by price ascending (ties broken by voter bytes so the
// order is total), then cumulative stake is walked until it reaches half of
// the ballot power:
//
//   median = first price p_i with 2 * Σ_{j<=i} w_j >= Σ w
//
// On an exact midpoint the lower price wins, so an even number of
// equal-weight votes yields the lower middle price.

use serde::{Deserialize, Serialize};

use concord_core::identity::ValidatorId;
use concord_core::Decimal;

/// One weighted vote in a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub voter: ValidatorId,
    pub price: Decimal,
    pub weight: u128,
}

/// The votes cast for one denom in one period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ballot {
    entries: Vec<BallotEntry>,
}

impl Ballot {
    pub fn new(mut entries: Vec<BallotEntry>) -> Self {
        entries.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.voter.cmp(&b.voter)));
        Self { entries }
    }

    /// Entries sorted by (price, voter).
    pub fn entries(&self) -> &[BallotEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total stake behind the ballot.
    pub fn power(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.weight))
    }

    /// Stake-weighted median price, or `None` if the ballot has no power.
    pub fn weighted_median(&self) -> Option<Decimal> {
        let total = self.power();
        if total == 0 {
            return None;
        }
        let mut cumulative: u128 = 0;
        for entry in &self.entries {
            cumulative = cumulative.saturating_add(entry.weight);
            if cumulative >= total - cumulative {
                return Some(entry.price);
            }
        }
        // Unreachable with total > 0: the last entry brings cumulative to total.
        self.entries.last().map(|e| e.price)
    }

    /// Entries whose price lies within `median ± band / 2`, inclusive.
    pub fn winners(&self, median: Decimal, band: Decimal) -> Vec<&BallotEntry> {
        let half = band / Decimal::TWO;
        let low = median.checked_sub(half).unwrap_or(Decimal::MIN);
        let high = median.checked_add(half).unwrap_or(Decimal::MAX);
        self.entries
            .iter()
            .filter(|e| e.price >= low && e.price <= high)
            .collect()
    }
}
