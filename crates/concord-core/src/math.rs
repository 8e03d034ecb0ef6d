// crates/concord-core/src/math.rs
//
// Exact integer arithmetic for thresholds and payouts.
//
// Ratios are `Decimal` values in [0, 1]. Every comparison against a ratio is
// done on the exact rational `mantissa / 10^scale` with `U256` intermediate
// products, so no rounding ever decides a tally. Division truncates toward
// zero, which is what keeps payouts from exceeding the funds available.

use primitive_types::U256;
use rust_decimal::Decimal;

/// `floor(a * b / d)` without intermediate overflow.
///
/// Returns `None` when `d == 0` or when the quotient does not fit in u128.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(d);
    u128::try_from(quotient).ok()
}

/// Split a non-negative decimal into `(numerator, denominator)` with
/// `denominator = 10^scale`. Negative values yield `None`.
pub fn ratio_parts(ratio: Decimal) -> Option<(u128, u128)> {
    if ratio.is_sign_negative() && !ratio.is_zero() {
        return None;
    }
    let numerator = ratio.mantissa().unsigned_abs();
    let denominator = 10u128.pow(ratio.scale());
    Some((numerator, denominator))
}

/// `floor(amount * ratio)` for a non-negative ratio.
pub fn mul_ratio_floor(amount: u128, ratio: Decimal) -> Option<u128> {
    let (num, den) = ratio_parts(ratio)?;
    mul_div_floor(amount, num, den)
}

/// Whether `power >= ratio * total`, compared exactly (boundary inclusive).
///
/// A negative ratio is treated as zero.
pub fn clears_threshold(power: i128, total: u128, ratio: Decimal) -> bool {
    let (num, den) = ratio_parts(ratio).unwrap_or((0, 1));
    if power < 0 {
        return false;
    }
    U256::from(power as u128) * U256::from(den) >= U256::from(total) * U256::from(num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mul_div_floor_truncates() {
        assert_eq!(mul_div_floor(101, 1, 2), Some(50));
        assert_eq!(mul_div_floor(10, 3, 4), Some(7));
    }

    #[test]
    fn test_mul_div_floor_zero_divisor() {
        assert_eq!(mul_div_floor(1, 1, 0), None);
    }

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        let a = u128::MAX / 3;
        assert_eq!(mul_div_floor(a, 6, 3), Some(a * 2));
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
    }

    #[test]
    fn test_mul_div_floor_overflow() {
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), None);
    }

    #[test]
    fn test_ratio_parts() {
        assert_eq!(ratio_parts(dec!(0.5)), Some((5, 10)));
        assert_eq!(ratio_parts(dec!(0.667)), Some((667, 1000)));
        assert_eq!(ratio_parts(dec!(-0.1)), None);
    }

    #[test]
    fn test_mul_ratio_floor() {
        assert_eq!(mul_ratio_floor(1000, dec!(0.333)), Some(333));
        assert_eq!(mul_ratio_floor(7, dec!(0.5)), Some(3));
    }

    #[test]
    fn test_clears_threshold_inclusive_boundary() {
        assert!(clears_threshold(50, 100, dec!(0.5)));
        assert!(!clears_threshold(49, 100, dec!(0.5)));
    }

    #[test]
    fn test_clears_threshold_fractional_product() {
        // 0.1 * 15 = 1.5: power 1 fails, power 2 passes.
        assert!(!clears_threshold(1, 15, dec!(0.1)));
        assert!(clears_threshold(2, 15, dec!(0.1)));
    }

    #[test]
    fn test_clears_threshold_full_width() {
        // i128::MAX is just under half of u128::MAX.
        assert!(clears_threshold(i128::MAX, u128::MAX, dec!(0.49)));
        assert!(!clears_threshold(i128::MAX, u128::MAX, dec!(0.5)));
    }

    #[test]
    fn test_clears_threshold_negative_power() {
        assert!(!clears_threshold(-1, 100, dec!(0)));
    }
}
