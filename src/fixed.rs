//! Fixed-point arithmetic for quantities which feed the integer model.
//!
//! Every quantity is stored as an integer number of hundredths of its unit ([`SCALE`] = 100):
//! centi-hours for durations, centi-tonnes for volumes and hundredths of a currency unit for
//! money. Products and quotients are computed in 128-bit intermediates and rounded half away from
//! zero, so the same inputs always produce the same coefficients.
use std::fmt;
use std::iter::Sum;

/// The scale factor between decimal quantities and their fixed-point representation
pub const SCALE: i64 = 100;

/// A decimal quantity stored as an integer multiple of `1 / SCALE`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, derive_more::Add, derive_more::Sub,
)]
pub struct Fixed(i64);

impl Fixed {
    /// The value zero
    pub const ZERO: Fixed = Fixed(0);

    /// Create a value from its raw (already scaled) integer representation
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Convert a decimal value into fixed point, rounding to the nearest `1 / SCALE`.
    ///
    /// Returns `None` if the value is not finite or does not fit.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_f64(value: f64) -> Option<Self> {
        let scaled = (value * SCALE as f64).round();
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return None;
        }

        Some(Self(scaled as i64))
    }

    /// Convert a whole number of units into fixed point
    pub const fn from_units(units: i64) -> Self {
        Self(units * SCALE)
    }

    /// The raw integer representation
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Convert back to a decimal value for reporting
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Multiply by an integer count
    pub fn times(self, count: i64) -> Self {
        Self(self.0 * count)
    }

    /// Compute `self * rhs / divisor` where `rhs` is also fixed point and `divisor` is a plain
    /// (unscaled) number, keeping the result at the same scale.
    pub fn mul_div(self, rhs: Fixed, divisor: i64) -> Self {
        Self(div_round(
            i128::from(self.0) * i128::from(rhs.0),
            i128::from(SCALE) * i128::from(divisor),
        ))
    }

    /// Number of whole times `rhs` fits into `self` (both must be positive)
    pub fn whole_multiples(self, rhs: Fixed) -> i64 {
        assert!(rhs.0 > 0, "Divisor must be positive");
        self.0.max(0) / rhs.0
    }
}

/// Divide, rounding half away from zero
#[allow(clippy::cast_possible_truncation)]
fn div_round(numerator: i128, denominator: i128) -> i64 {
    assert!(denominator > 0, "Denominator must be positive");
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };

    rounded as i64
}

impl Sum for Fixed {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|x| x.0).sum())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / scale, abs % scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, Some(0))]
    #[case(1.0, Some(100))]
    #[case(0.125, Some(13))]
    #[case(9.6, Some(960))]
    #[case(-2.5, Some(-250))]
    #[case(f64::NAN, None)]
    #[case(f64::INFINITY, None)]
    #[case(1e300, None)]
    fn test_from_f64(#[case] value: f64, #[case] expected: Option<i64>) {
        assert_eq!(Fixed::from_f64(value).map(Fixed::raw), expected);
    }

    #[test]
    fn test_to_f64() {
        assert_approx_eq!(f64, Fixed::from_raw(12_345).to_f64(), 123.45);
        assert_approx_eq!(f64, Fixed::from_units(720).to_f64(), 720.0);
    }

    #[test]
    fn test_mul_div() {
        // 36 hours at 24,000 per day = 36,000
        let hours = Fixed::from_units(36);
        let rate = Fixed::from_units(24_000);
        assert_eq!(hours.mul_div(rate, 24), Fixed::from_units(36_000));

        // 0.01 * 0.01 rounds to zero; 0.5 * 0.01 rounds half up to 0.01
        assert_eq!(Fixed::from_raw(1).mul_div(Fixed::from_raw(1), 1), Fixed::ZERO);
        assert_eq!(Fixed::from_raw(50).mul_div(Fixed::from_raw(1), 1), Fixed::from_raw(1));
    }

    #[test]
    fn test_whole_multiples() {
        assert_eq!(Fixed::from_units(720).whole_multiples(Fixed::from_units(100)), 7);
        assert_eq!(Fixed::from_units(50).whole_multiples(Fixed::from_units(100)), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Fixed::from_raw(12_345).to_string(), "123.45");
        assert_eq!(Fixed::from_raw(-5).to_string(), "-0.05");
    }
}
