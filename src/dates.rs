use crate::error::LedgerError;
use chrono::{Datelike, Local, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Format of the `date` column.
pub const STORE_FORMAT: &str = "%y/%m/%d";

/// Format shown to and typed by the user.
pub const DISPLAY_FORMAT: &str = "%d.%m.%y";

/// Years a two-digit `%y` reads back as (chrono maps 69..=99 to 19xx and
/// 00..=68 to 20xx).
pub const MIN_YEAR: i32 = 1969;
pub const MAX_YEAR: i32 = 2068;

fn storable(date: NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&date.year())
}

/// Calendar day of a debt, no time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DebtDate(NaiveDate);

impl DebtDate {
    /// `None` for days outside [`MIN_YEAR`]..=[`MAX_YEAR`].
    pub fn new(date: NaiveDate) -> Option<Self> {
        storable(date).then_some(DebtDate(date))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(DebtDate::new)
    }

    pub fn today() -> Self {
        DebtDate(Local::now().date_naive())
    }

    /// Parse user text. `dd.MM.yy` is the primary form; `dd.MM.yyyy` and ISO
    /// `yyyy-MM-dd` are accepted as well, within the storable year range.
    pub fn parse_display(text: &str) -> Result<Self, LedgerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LedgerError::invalid_input("empty date"));
        }
        let date = NaiveDate::parse_from_str(text, DISPLAY_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(text, "%d.%m.%Y"))
            .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
            .map_err(|_| LedgerError::invalid_input(format!("not a date: {}", text)))?;
        DebtDate::new(date).ok_or_else(|| {
            LedgerError::invalid_input(format!(
                "year {} outside {}..={}",
                date.year(),
                MIN_YEAR,
                MAX_YEAR
            ))
        })
    }

    pub fn parse_store(text: &str) -> Result<Self, LedgerError> {
        NaiveDate::parse_from_str(text.trim(), STORE_FORMAT)
            .map(DebtDate)
            .map_err(|_| LedgerError::InvalidStoredValue(format!("date {}", text)))
    }

    pub fn to_store(&self) -> String {
        self.0.format(STORE_FORMAT).to_string()
    }

    pub fn to_display(&self) -> String {
        self.0.format(DISPLAY_FORMAT).to_string()
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DebtDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_display())
    }
}

impl FromStr for DebtDate {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DebtDate::parse_display(s)
    }
}

impl ToSql for DebtDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_store()))
    }
}

impl FromSql for DebtDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        DebtDate::parse_store(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for DebtDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_display())
    }
}

impl<'de> Deserialize<'de> for DebtDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DebtDate::parse_display(&s)
            .map_err(|_| serde::de::Error::custom(format!("Invalid date: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_store_formats() {
        let d = DebtDate::from_ymd(2024, 1, 2).unwrap();
        assert_eq!(d.to_display(), "02.01.24");
        assert_eq!(d.to_store(), "24/01/02");
        assert_eq!(DebtDate::parse_store("24/01/02").unwrap(), d);
        assert_eq!(DebtDate::parse_display("02.01.24").unwrap(), d);
    }

    #[test]
    fn test_alternative_input_forms() {
        let d = DebtDate::from_ymd(2024, 3, 15).unwrap();
        assert_eq!(DebtDate::parse_display("15.03.2024").unwrap(), d);
        assert_eq!(DebtDate::parse_display("2024-03-15").unwrap(), d);
    }

    #[test]
    fn test_rejects_bad_dates() {
        assert!(DebtDate::parse_display("").unwrap_err().is_invalid_input());
        assert!(DebtDate::parse_display("31.02.24").unwrap_err().is_invalid_input());
        assert!(DebtDate::parse_display("yesterday").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_rejects_years_the_store_cannot_hold() {
        assert!(DebtDate::parse_display("01.01.2080").unwrap_err().is_invalid_input());
        assert!(DebtDate::parse_display("1950-06-01").unwrap_err().is_invalid_input());
        assert!(DebtDate::from_ymd(2069, 1, 1).is_none());
        assert!(DebtDate::from_ymd(1968, 12, 31).is_none());

        let first = DebtDate::parse_display("01.01.1969").unwrap();
        let last = DebtDate::parse_display("31.12.2068").unwrap();
        assert_eq!(DebtDate::parse_store(&first.to_store()).unwrap(), first);
        assert_eq!(DebtDate::parse_store(&last.to_store()).unwrap(), last);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a = DebtDate::parse_display("31.12.23").unwrap();
        let b = DebtDate::parse_display("01.01.24").unwrap();
        assert!(a < b);
    }
}
