//! Loan ledger: the append-biased record of borrowing transactions.
//!
//! One row per loan lifetime, never deleted. The ledger is the source
//! of truth for "is this item currently out"; the item's cached state
//! is reconciled against it when the two disagree.
//!
//! The at-most-one-active-loan-per-item invariant is NOT enforced here:
//! it spans the inventory and the ledger, so it belongs to the engine.

use crate::error::BeoError;
use crate::id::{LOAN_PREFIX, generate_id};
use crate::storage::{parse_date, parse_timestamp};
use crate::types::{Loan, LoanStatus, ValidationError};
use chrono::{Days, NaiveDate, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

/// Fields for opening a new loan.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub item_id: String,
    pub beneficiary_id: String,
    pub requested_by: String,
    pub authorized_by: Option<String>,
    pub delivered_by: Option<String>,
    pub loan_date: NaiveDate,
    pub duration_days: u32,
    pub loan_notes: Option<String>,
}

impl NewLoan {
    pub fn new(
        item_id: impl Into<String>,
        beneficiary_id: impl Into<String>,
        requested_by: impl Into<String>,
        loan_date: NaiveDate,
        duration_days: u32,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            beneficiary_id: beneficiary_id.into(),
            requested_by: requested_by.into(),
            authorized_by: None,
            delivered_by: None,
            loan_date,
            duration_days,
            loan_notes: None,
        }
    }

    pub fn authorized_by(mut self, name: impl Into<String>) -> Self {
        self.authorized_by = Some(name.into());
        self
    }

    pub fn delivered_by(mut self, name: impl Into<String>) -> Self {
        self.delivered_by = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.loan_notes = Some(notes.into());
        self
    }
}

/// How a loan closes.
#[derive(Debug, Clone)]
pub struct LoanReturn {
    pub return_date: NaiveDate,
    pub return_notes: Option<String>,
    pub received_by: Option<String>,
    pub return_deposit_id: Option<String>,
}

impl LoanReturn {
    pub fn new(return_date: NaiveDate) -> Self {
        Self {
            return_date,
            return_notes: None,
            received_by: None,
            return_deposit_id: None,
        }
    }

    pub fn received_by(mut self, name: impl Into<String>) -> Self {
        self.received_by = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.return_notes = Some(notes.into());
        self
    }

    pub fn to_deposit(mut self, deposit_id: impl Into<String>) -> Self {
        self.return_deposit_id = Some(deposit_id.into());
        self
    }
}

/// Ledger access over a borrowed connection.
pub struct LoanLedger<'c> {
    conn: &'c Connection,
}

impl<'c> LoanLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a new active loan row.
    ///
    /// The due date is loan date + duration, plain calendar addition.
    pub fn create(&self, spec: NewLoan) -> Result<Loan> {
        if spec.duration_days == 0 {
            return Err(eyre::eyre!(BeoError::Validation(
                ValidationError::NonPositiveDuration
            )));
        }
        self.ensure_item_exists(&spec.item_id)?;
        self.ensure_beneficiary_exists(&spec.beneficiary_id)?;

        let now = Utc::now();
        let due_date = spec
            .loan_date
            .checked_add_days(Days::new(u64::from(spec.duration_days)))
            .ok_or_else(|| eyre::eyre!("due date out of range"))?;

        let loan = Loan {
            id: generate_id(LOAN_PREFIX, &spec.item_id, now),
            item_id: spec.item_id,
            beneficiary_id: spec.beneficiary_id,
            requested_by: spec.requested_by,
            authorized_by: spec.authorized_by,
            delivered_by: spec.delivered_by,
            loan_date: spec.loan_date,
            duration_days: spec.duration_days,
            due_date,
            returned_on: None,
            status: LoanStatus::Active,
            loan_notes: spec.loan_notes,
            return_notes: None,
            received_by: None,
            return_deposit_id: None,
            created_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO loans
                     (id, item_id, beneficiary_id, requested_by, authorized_by, delivered_by,
                      loan_date, duration_days, due_date, returned_on, status, loan_notes,
                      return_notes, received_by, return_deposit_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, NULL, NULL, NULL, ?)",
                params![
                    loan.id,
                    loan.item_id,
                    loan.beneficiary_id,
                    loan.requested_by,
                    loan.authorized_by,
                    loan.delivered_by,
                    loan.loan_date.to_string(),
                    loan.duration_days,
                    loan.due_date.to_string(),
                    loan.status.as_str(),
                    loan.loan_notes,
                    loan.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to persist loan")?;

        Ok(loan)
    }

    /// Close an active loan as returned.
    pub fn close(&self, loan_id: &str, ret: &LoanReturn) -> Result<Loan> {
        let existing = self
            .get(loan_id)?
            .ok_or_else(|| eyre::eyre!(BeoError::LoanNotFound(loan_id.to_string())))?;
        if existing.status.is_terminal() {
            return Err(eyre::eyre!(BeoError::AlreadyClosed {
                id: existing.id,
                status: existing.status,
            }));
        }

        self.conn
            .execute(
                "UPDATE loans
                 SET status = ?, returned_on = ?, return_notes = ?, received_by = ?,
                     return_deposit_id = ?
                 WHERE id = ?",
                params![
                    LoanStatus::Returned.as_str(),
                    ret.return_date.to_string(),
                    ret.return_notes,
                    ret.received_by,
                    ret.return_deposit_id,
                    loan_id,
                ],
            )
            .context("Failed to persist loan closure")?;

        Ok(Loan {
            status: LoanStatus::Returned,
            returned_on: Some(ret.return_date),
            return_notes: ret.return_notes.clone(),
            received_by: ret.received_by.clone(),
            return_deposit_id: ret.return_deposit_id.clone(),
            ..existing
        })
    }

    /// Close an active loan as lost.
    pub fn mark_lost(&self, loan_id: &str, notes: Option<&str>) -> Result<Loan> {
        let existing = self
            .get(loan_id)?
            .ok_or_else(|| eyre::eyre!(BeoError::LoanNotFound(loan_id.to_string())))?;
        if existing.status.is_terminal() {
            return Err(eyre::eyre!(BeoError::AlreadyClosed {
                id: existing.id,
                status: existing.status,
            }));
        }

        self.conn
            .execute(
                "UPDATE loans SET status = ?, return_notes = ? WHERE id = ?",
                params![LoanStatus::Lost.as_str(), notes, loan_id],
            )
            .context("Failed to persist lost loan")?;

        Ok(Loan {
            status: LoanStatus::Lost,
            return_notes: notes.map(String::from),
            ..existing
        })
    }

    /// Get a loan by ID.
    pub fn get(&self, id: &str) -> Result<Option<Loan>> {
        let mut stmt = self.conn.prepare(&format!("{} WHERE id = ?", SELECT_LOAN))?;
        let loan = stmt.query_row(params![id], row_to_loan).optional()?;
        Ok(loan)
    }

    /// All active loans, oldest due first.
    pub fn list_active(&self) -> Result<Vec<Loan>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE status = 'active' ORDER BY due_date", SELECT_LOAN))?;
        let loans: Vec<Loan> = stmt
            .query_map([], row_to_loan)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(loans)
    }

    /// Full loan history for one item, most recent first.
    pub fn list_by_item(&self, item_id: &str) -> Result<Vec<Loan>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE item_id = ? ORDER BY loan_date DESC, created_at DESC",
            SELECT_LOAN
        ))?;
        let loans: Vec<Loan> = stmt
            .query_map(params![item_id], row_to_loan)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(loans)
    }

    /// The active loan for an item, if any.
    pub fn active_for_item(&self, item_id: &str) -> Result<Option<Loan>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE item_id = ? AND status = 'active' LIMIT 1",
            SELECT_LOAN
        ))?;
        let loan = stmt.query_row(params![item_id], row_to_loan).optional()?;
        Ok(loan)
    }

    /// Count of active loans.
    pub fn count_active(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM loans WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn ensure_item_exists(&self, item_id: &str) -> Result<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE id = ?",
            params![item_id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(eyre::eyre!(BeoError::ItemNotFound(item_id.to_string())));
        }
        Ok(())
    }

    fn ensure_beneficiary_exists(&self, beneficiary_id: &str) -> Result<()> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM beneficiaries WHERE id = ?",
            params![beneficiary_id],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(eyre::eyre!(BeoError::BeneficiaryInvalid(
                beneficiary_id.to_string()
            )));
        }
        Ok(())
    }
}

const SELECT_LOAN: &str = "SELECT id, item_id, beneficiary_id, requested_by, authorized_by,
        delivered_by, loan_date, duration_days, due_date, returned_on, status, loan_notes,
        return_notes, received_by, return_deposit_id, created_at FROM loans";

fn row_to_loan(row: &rusqlite::Row) -> rusqlite::Result<Loan> {
    let loan_date_str: String = row.get(6)?;
    let due_date_str: String = row.get(8)?;
    let returned_on_str: Option<String> = row.get(9)?;
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(15)?;
    let duration: i64 = row.get(7)?;

    Ok(Loan {
        id: row.get(0)?,
        item_id: row.get(1)?,
        beneficiary_id: row.get(2)?,
        requested_by: row.get(3)?,
        authorized_by: row.get(4)?,
        delivered_by: row.get(5)?,
        loan_date: parse_date(&loan_date_str),
        duration_days: duration.max(0) as u32,
        due_date: parse_date(&due_date_str),
        returned_on: returned_on_str.map(|s| parse_date(&s)),
        status: LoanStatus::parse(&status_str).unwrap_or(LoanStatus::Active),
        loan_notes: row.get(11)?,
        return_notes: row.get(12)?,
        received_by: row.get(13)?,
        return_deposit_id: row.get(14)?,
        created_at: parse_timestamp(&created_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InventoryStore, NewItem};
    use crate::registry::{NewBeneficiary, Registry};
    use crate::storage::Storage;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, String, String) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::init(temp_dir.path()).unwrap();
        let registry = Registry::new(storage.conn());
        registry.seed_defaults().unwrap();

        let category = registry.find_category_by_name("Walkers").unwrap().unwrap();
        let deposit = registry.find_deposit_by_name("Main deposit").unwrap().unwrap();
        let item = InventoryStore::new(storage.conn())
            .create(NewItem::new("AN-001", "Walker", &category.id, &deposit.id))
            .unwrap();
        let beneficiary = registry
            .add_beneficiary(NewBeneficiary::member("Juan Pérez"))
            .unwrap();

        (temp_dir, storage, item.id, beneficiary.id)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_computes_due_date() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let loan = ledger
            .create(NewLoan::new(&item_id, &beneficiary_id, "Juan Pérez", date(2025, 1, 1), 90))
            .unwrap();

        assert!(loan.id.starts_with("ln-"));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.due_date, date(2025, 4, 1));
        assert!(loan.returned_on.is_none());
    }

    #[test]
    fn test_create_zero_duration_rejected() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let result = ledger.create(NewLoan::new(&item_id, &beneficiary_id, "Juan", date(2025, 1, 1), 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_unknown_item_rejected() {
        let (_temp_dir, storage, _item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let result = ledger.create(NewLoan::new(
            "el-missing000",
            &beneficiary_id,
            "Juan",
            date(2025, 1, 1),
            30,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_unknown_beneficiary_rejected() {
        let (_temp_dir, storage, item_id, _beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let result = ledger.create(NewLoan::new(
            &item_id,
            "bf-missing000",
            "Juan",
            date(2025, 1, 1),
            30,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_close_sets_return_fields() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let loan = ledger
            .create(NewLoan::new(&item_id, &beneficiary_id, "Juan", date(2025, 1, 1), 90))
            .unwrap();
        let closed = ledger
            .close(
                &loan.id,
                &LoanReturn::new(date(2025, 3, 1))
                    .received_by("Pedro Gómez")
                    .with_notes("Good condition"),
            )
            .unwrap();

        assert_eq!(closed.status, LoanStatus::Returned);
        assert_eq!(closed.returned_on, Some(date(2025, 3, 1)));

        let fetched = ledger.get(&loan.id).unwrap().unwrap();
        assert_eq!(fetched.status, LoanStatus::Returned);
        assert_eq!(fetched.received_by.as_deref(), Some("Pedro Gómez"));
    }

    #[test]
    fn test_close_twice_rejected() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let loan = ledger
            .create(NewLoan::new(&item_id, &beneficiary_id, "Juan", date(2025, 1, 1), 90))
            .unwrap();
        ledger.close(&loan.id, &LoanReturn::new(date(2025, 3, 1))).unwrap();

        let result = ledger.close(&loan.id, &LoanReturn::new(date(2025, 3, 2)));
        assert!(result.is_err());
    }

    #[test]
    fn test_mark_lost() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        let loan = ledger
            .create(NewLoan::new(&item_id, &beneficiary_id, "Juan", date(2025, 1, 1), 90))
            .unwrap();
        let lost = ledger.mark_lost(&loan.id, Some("never returned")).unwrap();

        assert_eq!(lost.status, LoanStatus::Lost);
        assert!(ledger.mark_lost(&loan.id, None).is_err());
    }

    #[test]
    fn test_active_queries() {
        let (_temp_dir, storage, item_id, beneficiary_id) = setup();
        let ledger = LoanLedger::new(storage.conn());

        assert_eq!(ledger.count_active().unwrap(), 0);
        assert!(ledger.active_for_item(&item_id).unwrap().is_none());

        let loan = ledger
            .create(NewLoan::new(&item_id, &beneficiary_id, "Juan", date(2025, 1, 1), 90))
            .unwrap();

        assert_eq!(ledger.count_active().unwrap(), 1);
        assert_eq!(ledger.list_active().unwrap().len(), 1);
        assert_eq!(
            ledger.active_for_item(&item_id).unwrap().unwrap().id,
            loan.id
        );

        ledger.close(&loan.id, &LoanReturn::new(date(2025, 2, 1))).unwrap();
        assert_eq!(ledger.count_active().unwrap(), 0);
        assert_eq!(ledger.list_by_item(&item_id).unwrap().len(), 1);
    }
}
