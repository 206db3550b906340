use crate::dates::DebtDate;
use crate::error::Result;
use crate::money::Money;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

/// Named counterparty with a running balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub total: Money,
    /// At most one profile is active at a time
    pub focus: bool,
}

/// Single dated entry against a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub profile_id: i64,
    pub date: DebtDate,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Debt values before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDebt {
    pub profile_id: i64,
    pub date: DebtDate,
    pub amount: Money,
    pub note: Option<String>,
}

impl NewDebt {
    pub fn into_debt(self, id: i64) -> Debt {
        Debt {
            id,
            profile_id: self.profile_id,
            date: self.date,
            amount: self.amount,
            note: self.note,
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profile (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            total TEXT NOT NULL DEFAULT '0.00',
            focus INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS debt (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            profile_id INTEGER NOT NULL REFERENCES profile(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            amount TEXT NOT NULL,
            note TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_debt_profile_date ON debt(profile_id, date)",
        [],
    )?;

    Ok(())
}

fn profile_from_row(row: &Row) -> rusqlite::Result<Profile> {
    let focus: i64 = row.get(3)?;
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        total: row.get(2)?,
        focus: focus != 0,
    })
}

fn debt_from_row(row: &Row) -> rusqlite::Result<Debt> {
    Ok(Debt {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        date: row.get(2)?,
        amount: row.get(3)?,
        note: row.get(4)?,
    })
}

/// All profiles in creation order
pub fn get_profiles(conn: &Connection) -> Result<Vec<Profile>> {
    let mut stmt = conn.prepare("SELECT id, name, total, focus FROM profile ORDER BY id")?;

    let profiles = stmt
        .query_map([], profile_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(profiles)
}

pub fn insert_profile(conn: &Connection, name: &str, total: Money, focus: bool) -> Result<Profile> {
    conn.execute(
        "INSERT INTO profile (name, total, focus) VALUES (?1, ?2, ?3)",
        params![name, total, focus as i64],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(profile_id = id, name, "inserted profile");

    Ok(Profile {
        id,
        name: name.to_string(),
        total,
        focus,
    })
}

pub fn update_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    conn.execute(
        "UPDATE profile SET name = ?1, total = ?2, focus = ?3 WHERE id = ?4",
        params![profile.name, profile.total, profile.focus as i64, profile.id],
    )?;
    tracing::debug!(profile_id = profile.id, total = %profile.total, focus = profile.focus, "updated profile");
    Ok(())
}

/// Delete a profile and its debts
pub fn delete_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    // Explicit cascade: stores opened without foreign_keys still stay clean
    delete_debts_by_profile(conn, profile.id)?;
    conn.execute("DELETE FROM profile WHERE id = ?1", [profile.id])?;
    tracing::debug!(profile_id = profile.id, "deleted profile");
    Ok(())
}

/// Debts of one profile, date ascending, insertion order within a date
pub fn get_debts_by_profile(conn: &Connection, profile_id: i64) -> Result<Vec<Debt>> {
    let mut stmt = conn.prepare(
        "SELECT id, profile_id, date, amount, note
         FROM debt
         WHERE profile_id = ?1",
    )?;

    let mut debts = stmt
        .query_map([profile_id], debt_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // `yy/MM/dd` text does not sort across the century boundary
    debts.sort_by_key(|d| (d.date, d.id));

    Ok(debts)
}

pub fn insert_debt(conn: &Connection, debt: NewDebt) -> Result<Debt> {
    conn.execute(
        "INSERT INTO debt (profile_id, date, amount, note) VALUES (?1, ?2, ?3, ?4)",
        params![debt.profile_id, debt.date, debt.amount, debt.note],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(debt_id = id, profile_id = debt.profile_id, amount = %debt.amount, "inserted debt");
    Ok(debt.into_debt(id))
}

/// Delete all debts whose id is listed. Returns the number of removed rows.
pub fn delete_debts_by_ids(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM debt WHERE id IN ({})", placeholders);
    let removed = conn.execute(&sql, params_from_iter(ids.iter()))?;
    tracing::debug!(removed, "deleted debts by id");
    Ok(removed)
}

pub fn delete_debts_by_profile(conn: &Connection, profile_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM debt WHERE profile_id = ?1", [profile_id])?;
    tracing::debug!(profile_id, removed, "deleted debts by profile");
    Ok(removed)
}

pub fn count_debts(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM debt", [], |row| row.get(0))?;

    Ok(count)
}
