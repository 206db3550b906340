//! Validation of raw user text.
//!
//! Presentation layers call these before any ledger operation so a rejected
//! value never reaches the store.

use crate::dates::DebtDate;
use crate::error::{LedgerError, Result};
use crate::money::Money;

/// Trimmed, non-empty profile name.
pub fn profile_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::invalid_input("empty profile name"));
    }
    Ok(name)
}

/// Blank notes are stored as NULL.
pub fn note(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Text fields of the add/edit debt form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebtForm {
    pub date: String,
    pub amount: String,
    pub note: String,
}

/// Debt values that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtInput {
    pub date: DebtDate,
    pub amount: Money,
    pub note: Option<String>,
}

impl DebtForm {
    /// Empty form with today's date filled in.
    pub fn today() -> Self {
        DebtForm {
            date: DebtDate::today().to_display(),
            ..DebtForm::default()
        }
    }

    pub fn parse(&self) -> Result<DebtInput> {
        let amount: Money = self.amount.parse()?;
        let date = DebtDate::parse_display(&self.date)?;
        Ok(DebtInput {
            date,
            amount,
            note: note(Some(&self.note)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_name() {
        assert_eq!(profile_name("  Bob ").unwrap(), "Bob");
        assert!(profile_name("").unwrap_err().is_invalid_input());
        assert!(profile_name(" \t ").unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_note_blank_is_none() {
        assert_eq!(note(None), None);
        assert_eq!(note(Some("   ")), None);
        assert_eq!(note(Some(" lunch ")), Some("lunch".to_string()));
    }

    #[test]
    fn test_form_parse() {
        let form = DebtForm {
            date: "01.01.24".to_string(),
            amount: "-3.5".to_string(),
            note: String::new(),
        };
        let parsed = form.parse().unwrap();
        assert_eq!(parsed.date, DebtDate::from_ymd(2024, 1, 1).unwrap());
        assert_eq!(parsed.amount, Money::from_cents(-350));
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn test_form_rejects_empty_amount() {
        let mut form = DebtForm::today();
        assert!(form.parse().unwrap_err().is_invalid_input());
        form.amount = "abc".to_string();
        assert!(form.parse().unwrap_err().is_invalid_input());
    }
}
