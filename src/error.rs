use thiserror::Error;

/// Errors raised by the store and the ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected user input (empty name, non-numeric amount, bad date).
    /// The detail is logged, the user only sees a generic notice.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Profile {0} not found")]
    ProfileNotFound(i64),

    #[error("Debt {0} not found")]
    DebtNotFound(i64),

    /// A total or summary would leave the representable amount range.
    #[error("Total of profile {0} out of range")]
    TotalOutOfRange(i64),

    /// A row in the store could not be decoded (bad date or amount text).
    #[error("Invalid stored value: {0}")]
    InvalidStoredValue(String),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        LedgerError::InvalidInput(detail.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, LedgerError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
