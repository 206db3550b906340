//! Signed two-decimal amounts.
//!
//! Every amount and every profile total is a [`Money`]. The only rounding rule
//! in the crate lives here: [`round2`] rounds to cents, half away from zero.

use crate::error::LedgerError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// Round to two decimals, ties away from zero (`1.005 -> 1.01`, `-1.005 -> -1.01`).
pub fn round2(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // keep "-0.00" out of the store and the display
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Exclusive bound on the magnitude of a single entered amount.
pub const AMOUNT_LIMIT: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build from minor units, e.g. `Money::from_cents(-350)` is `-3.50`.
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Wrap a decimal, rounding it to cents.
    pub fn from_decimal(value: Decimal) -> Self {
        Money(round2(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Canonical text form used by the store.
    pub fn to_canonical(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_canonical())
    }
}

impl Money {
    /// Sum rounded to cents, `None` when it leaves the `Decimal` range.
    /// Running totals use this one step at a time.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money::from_decimal)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money::from_decimal)
    }

    /// Sums exactly and rounds once at the end.
    pub fn checked_sum<'a, I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        amounts
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.0))
            .map(Money::from_decimal)
    }

    /// Wrap a user-supplied value: rounded to cents, magnitude below
    /// [`AMOUNT_LIMIT`].
    pub fn bounded(value: Decimal) -> Result<Money, LedgerError> {
        if value.abs() >= Decimal::from(AMOUNT_LIMIT) {
            return Err(LedgerError::invalid_input(format!(
                "amount {} exceeds {}",
                value, AMOUNT_LIMIT
            )));
        }
        Ok(Money::from_decimal(value))
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(round2(-self.0))
    }
}

/// Parses user text. Accepts a comma as decimal separator; the result is
/// rounded to cents so stored amounts never carry more than two decimals.
impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().replace(',', ".");
        if text.is_empty() {
            return Err(LedgerError::invalid_input("empty amount"));
        }
        let value = Decimal::from_str(&text)
            .map_err(|_| LedgerError::invalid_input(format!("not a number: {}", s.trim())))?;
        Money::bounded(value)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_canonical()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Decimal::from_str(text.trim())
                    .map(Money::from_decimal)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            // older stores kept amounts as REAL
            ValueRef::Real(f) => Decimal::try_from(f)
                .map(Money::from_decimal)
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Integer(i) => Ok(Money(Decimal::from(i))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Money::from_str(&s)
                .map_err(|_| serde::de::Error::custom(format!("Invalid amount: {}", s))),
            Raw::Number(n) => Decimal::try_from(n)
                .map_err(|_| LedgerError::invalid_input("not a number"))
                .and_then(Money::bounded)
                .map_err(|_| serde::de::Error::custom(format!("Invalid amount: {}", n))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round2(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
        assert_eq!(round2(Decimal::new(1004, 3)), Decimal::new(100, 2));
        assert_eq!(round2(Decimal::new(2675, 3)), Decimal::new(268, 2));
    }

    #[test]
    fn test_round2_never_yields_negative_zero() {
        let m = Money::from_decimal(Decimal::new(-1, 3));
        assert!(m.is_zero());
        assert_eq!(m.to_string(), "0.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!("10".parse::<Money>().unwrap(), Money::from_cents(1000));
        assert_eq!(" -3.5 ".parse::<Money>().unwrap(), Money::from_cents(-350));
        assert_eq!("2,25".parse::<Money>().unwrap(), Money::from_cents(225));
        assert_eq!("1.005".parse::<Money>().unwrap(), Money::from_cents(101));
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!("".parse::<Money>().unwrap_err().is_invalid_input());
        assert!("   ".parse::<Money>().unwrap_err().is_invalid_input());
        assert!("ten".parse::<Money>().unwrap_err().is_invalid_input());
        assert!("1.2.3".parse::<Money>().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_stepwise_arithmetic_matches_single_sum_for_cent_amounts() {
        let amounts = [
            Money::from_cents(1000),
            Money::from_cents(-350),
            Money::from_cents(1),
            Money::from_cents(-1999),
        ];
        let stepwise = amounts
            .iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(*m))
            .unwrap();
        let summed = Money::checked_sum(&amounts).unwrap();
        assert_eq!(stepwise, summed);
        assert_eq!(summed, Money::from_cents(-1348));
    }

    #[test]
    fn test_parse_rejects_oversized_amounts() {
        assert!("79228162514264337593543950335".parse::<Money>().unwrap_err().is_invalid_input());
        assert!("-1000000000000".parse::<Money>().unwrap_err().is_invalid_input());
        assert!("999999999999.99".parse::<Money>().is_ok());
        assert!(serde_json::from_str::<Money>("1e15").is_err());
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.checked_add(Money::from_cents(100)), None);
        assert_eq!((-huge).checked_sub(Money::from_cents(100)), None);
        assert_eq!(Money::checked_sum(&[huge, huge]), None);
        assert_eq!(
            Money::from_cents(150).checked_sub(Money::from_cents(200)),
            Some(Money::from_cents(-50))
        );
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(650).to_string(), "6.50");
        assert_eq!(Money::from_cents(-350).to_string(), "-3.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_json_accepts_text_and_numbers() {
        let a: Money = serde_json::from_str("\"12.30\"").unwrap();
        let b: Money = serde_json::from_str("12.3").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"12.30\"");
    }
}
