use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const USD_CURRENCY_CODE: &str = "usd";

//--------------------------------------       Cents         ---------------------------------------------------------
/// A monetary amount in US cents.
///
/// All financial arithmetic in the payment gateway happens on integer cents. The one place amounts get rounded is
/// [`Cents::percent_of`], so a discount and a fee computed from the same base can never disagree on rounding rules.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {} is too large to convert to Cents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (sign, abs) = if self.0 < 0 { ("-", -self.0) } else { ("", self.0) };
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// The given whole-number percentage of this amount, rounded half-up to the nearest cent.
    ///
    /// Callers pass non-negative amounts; the rounding rule is only defined for those.
    pub fn percent_of(&self, percent: u32) -> Cents {
        Cents((self.0 * i64::from(percent) + 50) / 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}
