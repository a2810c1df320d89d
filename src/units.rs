//! This module defines various unit types used for decimal (reporting) quantities.
//!
//! Values which feed the integer model are converted to [`crate::fixed::Fixed`] first.
use serde::{Deserialize, Serialize};

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl std::ops::Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name {
                $name(self.0 * rhs)
            }
        }

        impl std::ops::Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name {
                $name(self.0 / rhs)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

// Base quantities
unit_struct!(Money);
unit_struct!(Tonnes);
unit_struct!(Hours);
unit_struct!(Days);

// Derived quantities
unit_struct!(MoneyPerDay);
unit_struct!(MoneyPerTonne);
unit_struct!(TonnesPerDay);

/// Number of hours in a day
pub const HOURS_PER_DAY: f64 = 24.0;

impl Hours {
    /// Convert to a number of days
    pub fn to_days(self) -> Days {
        Days(self.0 / HOURS_PER_DAY)
    }
}

// Multiplication rules
impl_mul!(MoneyPerDay, Days, Money);
impl_mul!(TonnesPerDay, Days, Tonnes);
impl_mul!(MoneyPerTonne, Tonnes, Money);
