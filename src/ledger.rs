//! Ledger operations.
//!
//! [`Ledger`] owns the store connection and the in-memory mirror
//! ([`LedgerState`]). Every operation runs in one store transaction against a
//! copy of the mirror; the copy replaces the mirror only after the commit, so
//! an operation either applies to both or to neither.
//!
//! Totals follow one rule: after every mutation the profile total is
//! recomputed with [`Money`] arithmetic, which rounds to cents each step.

use crate::dates::DebtDate;
use crate::db::{self, Debt, NewDebt, Profile};
use crate::error::{LedgerError, Result};
use crate::input::{self, DebtInput};
use crate::money::Money;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_PROFILE_NAME: &str = "Friend";
pub const DEFAULT_SUMMARY_NOTE: &str = "Summarized debts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Name of the profile created when none is left
    pub default_profile_name: String,
    /// Note of the debt produced by a summarize
    pub summary_note: String,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            default_profile_name: DEFAULT_PROFILE_NAME.to_string(),
            summary_note: DEFAULT_SUMMARY_NOTE.to_string(),
        }
    }
}

/// Which debts of the active profile a summarize consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebtSelection {
    All,
    Ids(Vec<i64>),
}

/// In-memory mirror of the store, as rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerState {
    pub profiles: Vec<Profile>,
    pub active_id: i64,
    /// Debts of the active profile in display order
    pub debts: Vec<Debt>,
}

impl LedgerState {
    pub fn profile(&self, id: i64) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.profile(self.active_id)
    }

    pub fn debt(&self, id: i64) -> Option<&Debt> {
        self.debts.iter().find(|d| d.id == id)
    }

    /// The active total equals the rounded sum of the listed debts.
    pub fn balance_matches_debts(&self) -> bool {
        let amounts: Vec<Money> = self.debts.iter().map(|d| d.amount).collect();
        match (self.active_profile(), Money::checked_sum(&amounts)) {
            (Some(p), Some(sum)) => p.total == sum,
            _ => false,
        }
    }

    fn active_mut(&mut self) -> Result<&mut Profile> {
        let id = self.active_id;
        self.profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(LedgerError::ProfileNotFound(id))
    }

    fn active_cloned(&self) -> Result<Profile> {
        self.active_profile()
            .cloned()
            .ok_or(LedgerError::ProfileNotFound(self.active_id))
    }
}

pub struct Ledger {
    conn: Connection,
    options: LedgerOptions,
    state: LedgerState,
}

impl Ledger {
    /// Prepare the schema and hydrate the mirror from the store.
    pub fn open(mut conn: Connection, options: LedgerOptions) -> Result<Self> {
        db::setup_database(&conn)?;
        let state = load_state(&mut conn, &options)?;
        tracing::info!(
            profiles = state.profiles.len(),
            active = state.active_id,
            debts = state.debts.len(),
            "ledger opened"
        );
        Ok(Self {
            conn,
            options,
            state,
        })
    }

    pub fn open_path(path: &Path, options: LedgerOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::open(conn, options)
    }

    pub fn open_in_memory(options: LedgerOptions) -> Result<Self> {
        Self::open(Connection::open_in_memory()?, options)
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Re-read everything from the store.
    pub fn reload(&mut self) -> Result<&LedgerState> {
        self.state = load_state(&mut self.conn, &self.options)?;
        Ok(&self.state)
    }

    // ========================================================================
    // PROFILES
    // ========================================================================

    /// Deactivate the current profile and switch to a new empty one.
    pub fn create_profile(&mut self, name: &str) -> Result<&LedgerState> {
        let name = input::profile_name(name)?;
        let mut current = self.state.active_cloned()?;

        let tx = self.conn.transaction()?;
        current.focus = false;
        db::update_profile(&tx, &current)?;
        let created = db::insert_profile(&tx, name, Money::ZERO, true)?;
        tx.commit()?;

        tracing::info!(profile_id = created.id, name, "created profile");
        self.reload()
    }

    pub fn switch_profile(&mut self, id: i64) -> Result<&LedgerState> {
        if id == self.state.active_id {
            return Ok(&self.state);
        }
        let mut target = self
            .state
            .profile(id)
            .cloned()
            .ok_or(LedgerError::ProfileNotFound(id))?;
        let mut current = self.state.active_cloned()?;

        let tx = self.conn.transaction()?;
        current.focus = false;
        db::update_profile(&tx, &current)?;
        target.focus = true;
        db::update_profile(&tx, &target)?;
        tx.commit()?;

        tracing::info!(from = current.id, to = id, "switched profile");
        self.reload()
    }

    /// Only the name changes; id, total and debts stay as they are.
    pub fn rename_profile(&mut self, name: &str) -> Result<&LedgerState> {
        let name = input::profile_name(name)?;
        let mut renamed = self.state.active_cloned()?;
        renamed.name = name.to_string();

        db::update_profile(&self.conn, &renamed)?;
        *self.state.active_mut()? = renamed;

        tracing::info!(profile_id = self.state.active_id, name, "renamed profile");
        Ok(&self.state)
    }

    /// Delete the active profile and its debts. The first remaining profile
    /// becomes active; with none left a default profile is created.
    pub fn delete_profile(&mut self) -> Result<&LedgerState> {
        let doomed = self.state.active_cloned()?;
        let alternative = self
            .state
            .profiles
            .iter()
            .find(|p| p.id != doomed.id)
            .cloned();

        let tx = self.conn.transaction()?;
        db::delete_profile(&tx, &doomed)?;
        match alternative {
            Some(mut next) => {
                next.focus = true;
                db::update_profile(&tx, &next)?;
                tracing::info!(deleted = doomed.id, active = next.id, "deleted profile");
            }
            None => {
                let fresh =
                    db::insert_profile(&tx, &self.options.default_profile_name, Money::ZERO, true)?;
                tracing::info!(
                    deleted = doomed.id,
                    active = fresh.id,
                    "deleted last profile, created default"
                );
            }
        }
        tx.commit()?;

        self.reload()
    }

    // ========================================================================
    // DEBTS
    // ========================================================================

    /// Add a debt to any profile and move that profile's total by `amount`.
    pub fn add_debt(
        &mut self,
        date: DebtDate,
        profile_id: i64,
        amount: Money,
        note: Option<&str>,
    ) -> Result<&LedgerState> {
        let new_debt = NewDebt {
            profile_id,
            date,
            amount,
            note: input::note(note),
        };

        let mut next = self.state.clone();
        let tx = self.conn.transaction()?;
        let debt = apply_add(&tx, &mut next, new_debt)?;
        tx.commit()?;

        tracing::info!(debt_id = debt.id, profile_id, amount = %amount, "added debt");
        self.state = next;
        Ok(&self.state)
    }

    /// Add several debts to one profile in a single transaction. Either all
    /// of them are stored or none.
    pub fn add_debts(&mut self, profile_id: i64, entries: &[DebtInput]) -> Result<&LedgerState> {
        let mut next = self.state.clone();
        let tx = self.conn.transaction()?;
        for entry in entries {
            let new_debt = NewDebt {
                profile_id,
                date: entry.date,
                amount: entry.amount,
                note: input::note(entry.note.as_deref()),
            };
            apply_add(&tx, &mut next, new_debt)?;
        }
        tx.commit()?;

        tracing::info!(count = entries.len(), profile_id, "added debts");
        self.state = next;
        Ok(&self.state)
    }

    /// Replace a debt of the active profile with new values.
    ///
    /// Delete-then-reinsert: the edited entry receives a new id and moves to
    /// its date position like a freshly added debt. With another `profile_id`
    /// the debt moves to that profile and leaves the active list; both totals
    /// follow.
    pub fn edit_debt(
        &mut self,
        id: i64,
        date: DebtDate,
        profile_id: i64,
        amount: Money,
        note: Option<&str>,
    ) -> Result<&LedgerState> {
        if self.state.debt(id).is_none() {
            return Err(LedgerError::DebtNotFound(id));
        }
        if self.state.profile(profile_id).is_none() {
            return Err(LedgerError::ProfileNotFound(profile_id));
        }
        let replacement = NewDebt {
            profile_id,
            date,
            amount,
            note: input::note(note),
        };

        let mut next = self.state.clone();
        let tx = self.conn.transaction()?;
        apply_delete(&tx, &mut next, &[id])?;
        let debt = apply_add(&tx, &mut next, replacement)?;
        tx.commit()?;

        tracing::info!(old_id = id, new_id = debt.id, profile_id, amount = %amount, "edited debt");
        self.state = next;
        Ok(&self.state)
    }

    /// Remove debts of the active profile. Ids of other profiles are ignored.
    pub fn delete_debts(&mut self, ids: &[i64]) -> Result<&LedgerState> {
        let mut next = self.state.clone();
        let tx = self.conn.transaction()?;
        let removed = apply_delete(&tx, &mut next, ids)?;
        tx.commit()?;

        tracing::info!(removed, "deleted debts");
        self.state = next;
        Ok(&self.state)
    }

    /// Collapse debts of the active profile into one debt dated today.
    pub fn summarize_debts(&mut self, selection: DebtSelection) -> Result<&LedgerState> {
        self.summarize_debts_dated(selection, DebtDate::today())
    }

    /// [`Ledger::summarize_debts`] with an explicit date for the new entry.
    ///
    /// The summary amount is the rounded sum of the consumed debts, so the
    /// total does not move. The summary is appended after every other entry
    /// regardless of its date. Selecting nothing is a no-op.
    pub fn summarize_debts_dated(
        &mut self,
        selection: DebtSelection,
        date: DebtDate,
    ) -> Result<&LedgerState> {
        let chosen: Vec<Debt> = match &selection {
            DebtSelection::All => self.state.debts.clone(),
            DebtSelection::Ids(ids) => self
                .state
                .debts
                .iter()
                .filter(|d| ids.contains(&d.id))
                .cloned()
                .collect(),
        };
        if chosen.is_empty() {
            return Ok(&self.state);
        }

        let profile_id = self.state.active_id;
        let amounts: Vec<Money> = chosen.iter().map(|d| d.amount).collect();
        let amount =
            Money::checked_sum(&amounts).ok_or(LedgerError::TotalOutOfRange(profile_id))?;
        let chosen_ids: Vec<i64> = chosen.iter().map(|d| d.id).collect();

        let mut next = self.state.clone();
        let tx = self.conn.transaction()?;
        match selection {
            DebtSelection::All => {
                db::delete_debts_by_profile(&tx, profile_id)?;
            }
            DebtSelection::Ids(_) => {
                db::delete_debts_by_ids(&tx, &chosen_ids)?;
            }
        }
        let summary = db::insert_debt(
            &tx,
            NewDebt {
                profile_id,
                date,
                amount,
                note: Some(self.options.summary_note.clone()),
            },
        )?;
        tx.commit()?;

        next.debts.retain(|d| !chosen_ids.contains(&d.id));
        next.debts.push(summary);

        tracing::info!(merged = chosen_ids.len(), amount = %amount, "summarized debts");
        self.state = next;
        Ok(&self.state)
    }

    /// Delete every debt of the active profile and reset its total.
    pub fn clear_debts(&mut self) -> Result<&LedgerState> {
        let mut cleared = self.state.active_cloned()?;
        cleared.total = Money::ZERO;

        let tx = self.conn.transaction()?;
        let removed = db::delete_debts_by_profile(&tx, cleared.id)?;
        db::update_profile(&tx, &cleared)?;
        tx.commit()?;

        tracing::info!(profile_id = cleared.id, removed, "cleared debts");
        *self.state.active_mut()? = cleared;
        self.state.debts.clear();
        Ok(&self.state)
    }
}

/// Insert a debt and update the owner's total, in the store and in `state`.
fn apply_add(conn: &Connection, state: &mut LedgerState, new_debt: NewDebt) -> Result<Debt> {
    let owner = state
        .profiles
        .iter_mut()
        .find(|p| p.id == new_debt.profile_id)
        .ok_or(LedgerError::ProfileNotFound(new_debt.profile_id))?;

    owner.total = owner
        .total
        .checked_add(new_debt.amount)
        .ok_or(LedgerError::TotalOutOfRange(owner.id))?;
    let debt = db::insert_debt(conn, new_debt)?;
    db::update_profile(conn, owner)?;

    if debt.profile_id == state.active_id {
        // after the last entry dated on or before the new one
        let pos = state
            .debts
            .iter()
            .rposition(|d| d.date <= debt.date)
            .map_or(0, |i| i + 1);
        state.debts.insert(pos, debt.clone());
    }
    Ok(debt)
}

/// Remove active-profile debts by id, subtracting each amount from the total.
fn apply_delete(conn: &Connection, state: &mut LedgerState, ids: &[i64]) -> Result<usize> {
    let doomed: Vec<Debt> = state
        .debts
        .iter()
        .filter(|d| ids.contains(&d.id))
        .cloned()
        .collect();
    if doomed.is_empty() {
        return Ok(0);
    }

    let active = state.active_mut()?;
    for debt in &doomed {
        active.total = active
            .total
            .checked_sub(debt.amount)
            .ok_or(LedgerError::TotalOutOfRange(active.id))?;
    }
    let doomed_ids: Vec<i64> = doomed.iter().map(|d| d.id).collect();
    db::delete_debts_by_ids(conn, &doomed_ids)?;
    db::update_profile(conn, active)?;

    state.debts.retain(|d| !doomed_ids.contains(&d.id));
    Ok(doomed_ids.len())
}

/// Read profiles and the active profile's debts, repairing the single-focus
/// invariant on the way.
fn load_state(conn: &mut Connection, options: &LedgerOptions) -> Result<LedgerState> {
    let tx = conn.transaction()?;
    let mut profiles = db::get_profiles(&tx)?;

    if profiles.is_empty() {
        tracing::info!(name = %options.default_profile_name, "no profiles, creating default");
        let fresh = db::insert_profile(&tx, &options.default_profile_name, Money::ZERO, true)?;
        profiles.push(fresh);
    }

    let active_idx = match profiles.iter().position(|p| p.focus) {
        Some(idx) => idx,
        None => {
            tracing::warn!(profile_id = profiles[0].id, "no active profile, promoting first");
            profiles[0].focus = true;
            db::update_profile(&tx, &profiles[0])?;
            0
        }
    };

    for (idx, profile) in profiles.iter_mut().enumerate() {
        if idx != active_idx && profile.focus {
            tracing::warn!(profile_id = profile.id, "extra active profile, demoting");
            profile.focus = false;
            db::update_profile(&tx, profile)?;
        }
    }

    let active_id = profiles[active_idx].id;
    let debts = db::get_debts_by_profile(&tx, active_id)?;
    tx.commit()?;

    Ok(LedgerState {
        profiles,
        active_id,
        debts,
    })
}
