//! Fixed-point money and percentage types backed by rust_decimal.
//!
//! Every monetary value in the ledger carries exactly two decimal places and is
//! rounded half-up (away from zero on a tie), matching how balances are stored.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of decimal places carried by every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Whole currency units accepted in one amount.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000_000;

/// Round half-up to the ledger's money scale and pin the scale to exactly 2.
fn to_money_scale(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// A signed monetary amount with 2-decimal fixed-point semantics.
///
/// Construction always rounds half-up, so two `Money` values compare equal
/// exactly when they render to the same 2-dp string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Create a Money value, rounding half-up to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        Money(to_money_scale(value))
    }

    /// Zero with the money scale applied.
    pub fn zero() -> Self {
        Money::new(Decimal::ZERO)
    }

    /// Parse a decimal string and round it to the money scale.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn parse(s: &str) -> Result<Self, rust_decimal::Error> {
        Decimal::from_str(s.trim()).map(Money::new)
    }

    /// Canonical storage/wire form: always two decimal places, no exponent.
    pub fn to_canonical_string(&self) -> String {
        format!("{:.2}", self.0)
    }

    /// Get the underlying decimal.
    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Largest amount a single event or setting may carry.
    pub fn max_amount() -> Money {
        Money::new(Decimal::from(MAX_AMOUNT_UNITS))
    }

    /// `None` when the sum leaves the decimal range.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money::new)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money::new)
    }

    /// The share of this amount at `percent`, rounded half-up to 2 decimals.
    ///
    /// Rounding happens once, on the share itself; callers derive any
    /// remainder by subtraction so the parts always sum back to `self`.
    pub fn checked_percent_of(&self, percent: Percent) -> Option<Money> {
        self.0
            .checked_mul(percent.inner())
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .map(Money::new)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::new(-self.0)
    }
}

// Money crosses the wire as a 2-dp string; JSON numbers are accepted on input.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::str::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Money::new)
    }
}

/// A commission percentage in `[0, 100]`.
///
/// Not rounded: the resolver hands back the configured percentage untouched and
/// rounding happens when a currency amount is derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(Decimal);

impl Percent {
    /// Create a percentage, rejecting values outside `[0, 100]`.
    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return None;
        }
        if value > Decimal::ONE_HUNDRED {
            return None;
        }
        Some(Percent(value.normalize()))
    }

    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s.trim()).ok().and_then(Percent::new)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::str::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Percent::new(value)
            .ok_or_else(|| serde::de::Error::custom("percent must be between 0 and 100"))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_half_up() {
        assert_eq!(Money::new(dec!(1.005)).to_canonical_string(), "1.01");
        assert_eq!(Money::new(dec!(1.004)).to_canonical_string(), "1.00");
        assert_eq!(Money::new(dec!(-1.005)).to_canonical_string(), "-1.01");
    }

    #[test]
    fn test_money_canonical_always_two_places() {
        assert_eq!(Money::parse("1000").unwrap().to_canonical_string(), "1000.00");
        assert_eq!(Money::parse("0.5").unwrap().to_canonical_string(), "0.50");
        assert_eq!(Money::zero().to_canonical_string(), "0.00");
    }

    #[test]
    fn test_money_equality_ignores_input_scale() {
        assert_eq!(Money::parse("12.3").unwrap(), Money::parse("12.30").unwrap());
    }

    #[test]
    fn test_percent_of_rounds_share_once() {
        let gross = Money::parse("1000.00").unwrap();
        let ten = Percent::parse("10").unwrap();
        assert_eq!(gross.checked_percent_of(ten), Money::parse("100.00").ok());

        let odd = Money::parse("33.35").unwrap();
        let rate = Percent::parse("12.5").unwrap();
        // 33.35 * 12.5% = 4.16875 -> 4.17
        let commission = odd.checked_percent_of(rate).unwrap();
        assert_eq!(commission.to_canonical_string(), "4.17");
        let net = odd.checked_sub(commission).unwrap();
        assert_eq!(commission.checked_add(net), Some(odd));
    }

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::parse("0").is_some());
        assert!(Percent::parse("100").is_some());
        assert!(Percent::parse("100.01").is_none());
        assert!(Percent::parse("-1").is_none());
        assert!(Percent::parse("abc").is_none());
    }

    #[test]
    fn test_money_json_is_string() {
        let json = serde_json::to_value(Money::parse("5").unwrap()).unwrap();
        assert_eq!(json, serde_json::json!("5.00"));
    }

    #[test]
    fn test_money_deserializes_from_number_or_string() {
        let from_str: Money = serde_json::from_str("\"900.01\"").unwrap();
        let from_num: Money = serde_json::from_str("900.01").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_percent_json_is_normalized_string() {
        let pct: Percent = serde_json::from_str("12.50").unwrap();
        assert_eq!(serde_json::to_value(pct).unwrap(), serde_json::json!("12.5"));
        assert!(serde_json::from_str::<Percent>("\"100.5\"").is_err());
    }

    #[test]
    fn test_arithmetic_past_decimal_range_is_none() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_add(Money::parse("1").unwrap()), None);
        assert_eq!(
            huge.checked_percent_of(Percent::parse("50").unwrap()),
            None
        );
        assert_eq!((-huge).checked_sub(Money::parse("1").unwrap()), None);
    }

    #[test]
    fn test_max_amount_has_headroom_for_commission() {
        let max = Money::max_amount();
        assert_eq!(max.to_canonical_string(), "1000000000000.00");
        assert!(max.checked_percent_of(Percent::parse("100").unwrap()).is_some());
    }
}
