//! Wide-integer reward math.
//!
//! Every reward formula in the payout engine has the shape
//! `(a * b * c) / (d * e)` with each factor up to 64 bits. We evaluate the
//! whole expression with a 128-bit intermediate and round down (floor),
//! the rounding direction matters: always floor.

use crate::error::CoreError;

/// Computes `floor(a * b / d)` using a 128-bit intermediate.
pub fn mul_div(a: u64, b: u64, d: u64) -> Result<u64, CoreError> {
    if d == 0 {
        return Err(CoreError::ArithmeticError);
    }
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(CoreError::ArithmeticError)?;
    let result = product / (d as u128);
    u64::try_from(result).map_err(|_| CoreError::ArithmeticError)
}

/// Computes `floor(a * b * c / (d * e))` using a single 128-bit intermediate
/// for the numerator and for the denominator, as called for by the reward
/// the payout engine's reward formulas (stake × balance × timePercent over
/// totalStake × 1000, and similar).
pub fn mul_mul_div_div(a: u64, b: u64, c: u64, d: u64, e: u64) -> Result<u64, CoreError> {
    let numerator = (a as u128)
        .checked_mul(b as u128)
        .and_then(|x| x.checked_mul(c as u128))
        .ok_or(CoreError::ArithmeticError)?;
    let denominator = (d as u128)
        .checked_mul(e as u128)
        .ok_or(CoreError::ArithmeticError)?;
    if denominator == 0 {
        return Err(CoreError::ArithmeticError);
    }
    let result = numerator / denominator;
    u64::try_from(result).map_err(|_| CoreError::ArithmeticError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(10, 3, 4).unwrap(), 7);
        assert_eq!(mul_div(0, 3, 4).unwrap(), 0);
    }

    #[test]
    fn mul_div_rejects_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0), Err(CoreError::ArithmeticError));
    }

    #[test]
    fn mul_mul_div_div_matches_scenario_two() {
        // 100 * 1000 * 500 / (2000 * 1000) = 25.
        assert_eq!(mul_mul_div_div(100, 1000, 500, 2000, 1000).unwrap(), 25);
    }

    #[test]
    fn mul_mul_div_div_handles_large_balances_without_overflow() {
        let a = u64::MAX / 2;
        let b = 2u64;
        let c = 1u64;
        let d = 1u64;
        let e = 1u64;
        assert_eq!(mul_mul_div_div(a, b, c, d, e).unwrap(), a * 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// `mul_div` always rounds toward zero: the result times the
            /// denominator never exceeds the numerator, and one unit more would.
            #[test]
            fn mul_div_floors_for_arbitrary_inputs(
                a in 0u64..=1_000_000_000,
                b in 0u64..=1_000_000_000,
                d in 1u64..=1_000_000_000,
            ) {
                let result = mul_div(a, b, d).unwrap();
                let product = a as u128 * b as u128;
                prop_assert!((result as u128) * (d as u128) <= product);
                prop_assert!(((result as u128) + 1) * (d as u128) > product);
            }

            /// `mul_mul_div_div` agrees with two chained `mul_div`-style
            /// divisions when the intermediate values stay within `u64`.
            #[test]
            fn mul_mul_div_div_matches_naive_u128_math(
                a in 0u64..=100_000,
                b in 0u64..=100_000,
                c in 0u64..=1_000,
                d in 1u64..=100_000,
                e in 1u64..=1_000,
            ) {
                let result = mul_mul_div_div(a, b, c, d, e).unwrap();
                let expected = (a as u128 * b as u128 * c as u128) / (d as u128 * e as u128);
                prop_assert_eq!(result as u128, expected);
            }
        }
    }
}
