//! Reports over the loaded tables, exported as CSV

pub mod export;
pub mod options;
pub mod pivot;
pub mod pull_through;
pub mod volume;

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::AddAssign;

pub use options::{ClosedFilter, LoanTypeSelection, VolumeOptions};

/// Summed loan amount in dollars
///
/// Whole amounts are written without a fractional part, so a sum of integer
/// loan amounts exports as `255000` rather than `255000.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Amount(pub f64);

impl Amount {
    /// Exactly representable whole value, if there is one
    fn whole(self) -> Option<i64> {
        const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
        (self.0.fract() == 0.0 && self.0.abs() <= MAX_EXACT).then_some(self.0 as i64)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.whole() {
            Some(whole) => write!(f, "{}", whole),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.whole() {
            Some(whole) => serializer.serialize_i64(whole),
            None => serializer.serialize_f64(self.0),
        }
    }
}

/// Round half away from zero to `places` decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Count in thousands, 2 places
pub(crate) fn thousands(count: i64) -> f64 {
    round_to(count as f64 / 1_000.0, 2)
}

/// Amount in billions, 3 places
pub(crate) fn billions(amount: f64) -> f64 {
    round_to(amount / 1_000_000_000.0, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(thousands(1_234), 1.23);
        assert_eq!(thousands(5), 0.01);
        assert_eq!(billions(2_345_678_901.0), 2.346);
        assert_eq!(billions(0.0), 0.0);
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(Amount(12_750_000.0).to_string(), "12750000");
        assert_eq!(Amount(0.0).to_string(), "0");
        assert_eq!(Amount(255_000.5).to_string(), "255000.5");

        let mut sum = Amount::default();
        sum += Amount(100.0);
        sum += Amount(50.0);
        assert_eq!(sum, Amount(150.0));
    }
}
