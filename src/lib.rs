// Friendly Debts - Core Library
// Exposes the store, the ledger operations and input validation
// for the terminal UI, the API server, and tests

pub mod config;
pub mod csv_io;
pub mod dates;
pub mod db;
pub mod error;
pub mod input;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod selection;

// Re-export commonly used types
pub use config::Settings;
pub use dates::DebtDate;
pub use db::{
    Debt, NewDebt, Profile,
    setup_database, get_profiles, insert_profile, update_profile, delete_profile,
    get_debts_by_profile, insert_debt, delete_debts_by_ids, delete_debts_by_profile,
    count_debts,
};
pub use error::{LedgerError, Result};
pub use input::{DebtForm, DebtInput};
pub use ledger::{DebtSelection, Ledger, LedgerOptions, LedgerState};
pub use money::{round2, Money};
pub use selection::SelectionMode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
