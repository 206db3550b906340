//! CSV export/import of the active profile's debts.
//!
//! Columns: `date,amount,note` with dates as `dd.MM.yy`.

use crate::error::{LedgerError, Result};
use crate::input::{DebtForm, DebtInput};
use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct DebtRow {
    date: String,
    amount: String,
    #[serde(default)]
    note: Option<String>,
}

/// Write the active profile's debts in display order. Returns the row count.
pub fn export_debts<W: Write>(ledger: &Ledger, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let debts = &ledger.state().debts;

    for debt in debts {
        wtr.serialize(DebtRow {
            date: debt.date.to_display(),
            amount: debt.amount.to_canonical(),
            note: debt.note.clone(),
        })?;
    }
    wtr.flush()?;

    Ok(debts.len())
}

pub fn export_to_path(ledger: &Ledger, path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    export_debts(ledger, file)
}

/// Add every row as a debt of the active profile.
///
/// All rows are validated first; a bad row aborts the import before anything
/// is written and reports its 1-based data row number. The rows are then
/// stored in one transaction.
pub fn import_debts<R: Read>(ledger: &mut Ledger, reader: R) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut parsed: Vec<DebtInput> = Vec::new();
    for (idx, result) in rdr.deserialize::<DebtRow>().enumerate() {
        let row = result?;
        let form = DebtForm {
            date: row.date,
            amount: row.amount,
            note: row.note.unwrap_or_default(),
        };
        let input = form.parse().map_err(|e| match e {
            LedgerError::InvalidInput(detail) => {
                LedgerError::InvalidInput(format!("row {}: {}", idx + 1, detail))
            }
            other => other,
        })?;
        parsed.push(input);
    }

    let profile_id = ledger.state().active_id;
    ledger.add_debts(profile_id, &parsed)?;

    tracing::info!(rows = parsed.len(), profile_id, "imported debts");
    Ok(parsed.len())
}

pub fn import_from_path(ledger: &mut Ledger, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path)?;
    import_debts(ledger, file)
}
