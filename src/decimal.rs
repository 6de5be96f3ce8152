use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// number of decimal places money is kept at (centavos)
pub const MONEY_SCALE: u32 = 2;

/// round to cents with the crate-wide policy (half to even)
pub fn round_cents(d: Decimal) -> Decimal {
    d.round_dp(MONEY_SCALE)
}

/// money amount in the contract currency, always held at cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// create from decimal, rounding to cents
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round_cents(d))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(round_cents(Decimal::from_str(s)?)))
    }

    /// create from whole currency units
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// apply a rate for one period (e.g. one month of interest), rounded to cents
    pub fn apply_rate(&self, rate: Rate) -> Self {
        Money::from_decimal(self.0 * rate.as_fraction())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

/// monthly interest rate, held as a percentage (2.5 means 2.5% a month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from percentage (e.g., 2.5 for 2.5%)
    pub fn from_percentage(p: Decimal) -> Self {
        Rate(p)
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0
    }

    /// rate as a fraction, the `i` of the annuity formula
    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_percentage(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_to_cents() {
        let m = Money::from_str_exact("100.126").unwrap();
        assert_eq!(m.to_string(), "100.13");

        // half to even
        assert_eq!(Money::from_decimal(dec!(0.125)), Money::from_decimal(dec!(0.12)));
        assert_eq!(Money::from_decimal(dec!(0.135)), Money::from_decimal(dec!(0.14)));
    }

    #[test]
    fn test_monthly_interest() {
        let balance = Money::from_major(50_000);
        let rate = Rate::from_percentage(dec!(2.5));

        assert_eq!(balance.apply_rate(rate), Money::from_major(1_250));
        // rounded half to even at cents
        assert_eq!(
            Money::from_str_exact("86414.40").unwrap().apply_rate(rate),
            Money::from_str_exact("2160.36").unwrap()
        );
        assert_eq!(rate.as_fraction(), dec!(0.025));
        assert_eq!(rate.to_string(), "2.5%");
    }
}
