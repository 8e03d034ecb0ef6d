// crates/concord-economics/src/funding.rs
//
// Where epoch rewards come from.
//
//   - Budget rewards: the share of the epoch's seigniorage not already
//     earmarked for stakers, i.e. `(1 - reward_weight) * seigniorage`,
//     denominated into the reward denom when a swap rate exists.
//   - Oracle rewards: whatever the fee collector has accumulated.
//
// Conversion is best-effort: with no swap rate the native amount is paid
// out instead, so distribution never stalls on a missing market price.

use std::collections::BTreeMap;

use concord_core::coin::Coin;
use concord_core::math::mul_ratio_floor;
use concord_core::traits::{FeeCollector, SeigniorageSource, SwapRateSource};
use concord_core::Decimal;

/// The un-earmarked seigniorage share for `epoch`, in `native_denom`.
pub fn seigniorage_reward(source: &dyn SeigniorageSource, epoch: u64, native_denom: &str) -> Coin {
    let seigniorage = source.peek_epoch_seigniorage(epoch);
    let reward_weight = source
        .reward_weight(epoch)
        .clamp(Decimal::ZERO, Decimal::ONE);
    let share = Decimal::ONE - reward_weight;
    let amount = mul_ratio_floor(seigniorage, share).unwrap_or_else(|| {
        tracing::warn!(epoch, seigniorage, "seigniorage share overflowed, paying nothing");
        0
    });
    tracing::debug!(epoch, seigniorage, %reward_weight, amount, "computed seigniorage reward");
    Coin::new(native_denom, amount)
}

/// Convert `coin` into `target`, falling back to `coin` unchanged when no
/// rate is available.
pub fn denominate(coin: Coin, swap: &dyn SwapRateSource, target: &str) -> Coin {
    if coin.denom == target || coin.is_zero() {
        return coin;
    }
    match swap.convert(&coin, target) {
        Some(converted) => converted,
        None => {
            tracing::warn!(
                from = %coin.denom,
                to = target,
                "no swap rate available, distributing unconverted"
            );
            coin
        }
    }
}

/// Drain the fee pool, merging duplicate denoms and dropping empty coins.
/// The result is sorted by denom.
pub fn fee_pool_rewards(fees: &dyn FeeCollector) -> Vec<Coin> {
    let mut merged: BTreeMap<String, u128> = BTreeMap::new();
    for coin in fees.drain_fee_pool() {
        let entry = merged.entry(coin.denom).or_insert(0);
        *entry = entry.saturating_add(coin.amount);
    }
    merged
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(denom, amount)| Coin::new(denom, amount))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    struct FixedSeigniorage {
        amount: u128,
        weight: Decimal,
    }

    impl SeigniorageSource for FixedSeigniorage {
        fn peek_epoch_seigniorage(&self, _epoch: u64) -> u128 {
            self.amount
        }

        fn reward_weight(&self, _epoch: u64) -> Decimal {
            self.weight
        }
    }

    struct DoubleRate;

    impl SwapRateSource for DoubleRate {
        fn convert(&self, coin: &Coin, to_denom: &str) -> Option<Coin> {
            (to_denom == "usdr").then(|| Coin::new(to_denom, coin.amount * 2))
        }
    }

    struct NoRate;

    impl SwapRateSource for NoRate {
        fn convert(&self, _coin: &Coin, _to_denom: &str) -> Option<Coin> {
            None
        }
    }

    struct Fees(RefCell<Vec<Coin>>);

    impl FeeCollector for Fees {
        fn drain_fee_pool(&self) -> Vec<Coin> {
            self.0.borrow_mut().drain(..).collect()
        }
    }

    #[test]
    fn test_seigniorage_share() {
        let source = FixedSeigniorage {
            amount: 1000,
            weight: dec!(0.25),
        };
        assert_eq!(seigniorage_reward(&source, 0, "ucon"), Coin::new("ucon", 750));
    }

    #[test]
    fn test_seigniorage_share_truncates() {
        let source = FixedSeigniorage {
            amount: 10,
            weight: dec!(0.33),
        };
        // 10 * 0.67 = 6.7
        assert_eq!(seigniorage_reward(&source, 0, "ucon").amount, 6);
    }

    #[test]
    fn test_full_reward_weight_leaves_nothing() {
        let source = FixedSeigniorage {
            amount: 1000,
            weight: dec!(1.5),
        };
        assert!(seigniorage_reward(&source, 0, "ucon").is_zero());
    }

    #[test]
    fn test_denominate_converts() {
        let coin = denominate(Coin::new("ucon", 5), &DoubleRate, "usdr");
        assert_eq!(coin, Coin::new("usdr", 10));
    }

    #[test]
    fn test_denominate_falls_back_to_native() {
        let coin = denominate(Coin::new("ucon", 5), &NoRate, "usdr");
        assert_eq!(coin, Coin::new("ucon", 5));
    }

    #[test]
    fn test_fee_pool_merges_and_sorts() {
        let fees = Fees(RefCell::new(vec![
            Coin::new("ukrw", 3),
            Coin::new("usdr", 0),
            Coin::new("uabc", 1),
            Coin::new("ukrw", 4),
        ]));
        let rewards = fee_pool_rewards(&fees);
        assert_eq!(rewards, vec![Coin::new("uabc", 1), Coin::new("ukrw", 7)]);
        assert!(fees.drain_fee_pool().is_empty());
    }
}
