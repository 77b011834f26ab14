use std::fmt;
use std::ops::{Neg, Sub};
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid monetary amount '{0}'")]
    Parse(String),
}

/// Pad `value` to at least two decimal places. Extra precision is kept.
pub fn display_scale(value: &BigDecimal) -> BigDecimal {
    let (_, scale) = value.as_bigint_and_exponent();
    if scale < 2 {
        value.with_scale(2)
    } else {
        value.clone()
    }
}

/// Amount in shekels, kept at the precision the backend stored. Accepts JSON
/// numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "BigDecimal", into = "BigDecimal")]
pub struct Money(BigDecimal);

impl Money {
    pub fn new(raw: BigDecimal) -> Self {
        Self(raw)
    }

    pub fn zero() -> Self {
        Self::new(BigDecimal::zero())
    }

    pub fn from_major(units: i64) -> Self {
        Self::new(BigDecimal::from(units))
    }

    pub fn from_cents(cents: i64) -> Self {
        Self::new(BigDecimal::from(cents) / BigDecimal::from(100))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > BigDecimal::zero()
    }

    /// `self` as a whole percentage of `base`, rounded half up.
    /// Returns 0 when `base` is not positive.
    pub fn percent_of(&self, base: &Money) -> i64 {
        if !base.is_positive() {
            return 0;
        }
        let ratio = (self.0.clone() * BigDecimal::from(100)) / base.0.clone();
        let value = ratio.to_f64().unwrap_or(0.0);
        (value + 0.5).floor() as i64
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<BigDecimal> for Money {
    fn from(value: BigDecimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for BigDecimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim())
            .map(Money::new)
            .map_err(|_| MoneyError::Parse(s.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_scale(&self.0))
    }
}

impl Sub for &Money {
    type Output = Money;

    fn sub(self, rhs: &Money) -> Money {
        Money::new(self.0.clone() - rhs.0.clone())
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        &self - &rhs
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::new(-self.0)
    }
}
