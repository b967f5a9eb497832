//! Shared test infrastructure for BEO integration tests.
//!
//! Provides TestEnv for consistent setup plus helpers to corrupt the
//! store out-of-band, the way the drift-repair tests need.

#![allow(dead_code)]

use beo::{Beneficiary, Beo, BeoConfig, Item, ItemState, Loan, LoanRequest, NewBeneficiary, NewItem, ReturnRequest};
use chrono::NaiveDate;
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub beo: Beo,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        Self::with_config(BeoConfig::default())
    }

    /// Create a test environment with a specific config.
    pub fn with_config(config: BeoConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let beo = Beo::init(temp_dir.path(), config).expect("Failed to init store");
        Self { temp_dir, beo }
    }

    /// Register an item under the seeded wheelchair category.
    pub fn register_item(&mut self, code: &str) -> Item {
        let category = self
            .beo
            .find_category_by_name("Wheelchairs")
            .expect("Failed to look up category")
            .expect("Seeded category missing");
        let deposit = self
            .beo
            .find_deposit_by_name("Main deposit")
            .expect("Failed to look up deposit")
            .expect("Seeded deposit missing");
        self.beo
            .register_item(NewItem::new(code, "Wheelchair", category.id, deposit.id), "clerk")
            .expect("Failed to register item")
    }

    /// Register a member beneficiary.
    pub fn member(&mut self, name: &str) -> Beneficiary {
        self.beo
            .register_beneficiary(NewBeneficiary::member(name))
            .expect("Failed to register beneficiary")
    }

    /// Open a loan with an explicit duration.
    pub fn open_loan(&mut self, item: &Item, who: &Beneficiary, date: NaiveDate, days: u32) -> Loan {
        self.beo
            .open_loan(LoanRequest::new(&item.id, &who.id, &who.name, date).duration_days(days))
            .expect("Failed to open loan")
    }

    /// Close a loan in good condition.
    pub fn close_loan(&mut self, loan: &Loan, date: NaiveDate) -> ItemState {
        self.beo
            .close_loan(ReturnRequest::new(&loan.id, date, "Good", "clerk"))
            .expect("Failed to close loan")
    }

    /// Overwrite an item's cached state behind the engine's back,
    /// through a second connection to the same database file.
    pub fn corrupt_item_state(&self, item: &Item, state: &str) {
        let db_path = self.temp_dir.path().join(".beo").join("beo.db");
        let conn = rusqlite::Connection::open(&db_path).expect("Failed to open db directly");
        conn.execute(
            "UPDATE items SET state = ? WHERE id = ?",
            rusqlite::params![state, item.id],
        )
        .expect("Failed to corrupt item state");
    }

    /// Current item state as the engine sees it.
    pub fn item_state(&self, item: &Item) -> ItemState {
        self.beo
            .get_item(&item.id)
            .expect("Failed to get item")
            .expect("Item missing")
            .state
    }

    /// Assert the core invariant: loaned items == active loans.
    pub fn assert_counts_agree(&self) {
        let stats = self.beo.stats().expect("Failed to get stats");
        assert_eq!(
            stats.loaned, stats.active_loans,
            "loaned-item count {} != active-loan count {}",
            stats.loaned, stats.active_loans
        );
    }

    /// Number of active loans.
    pub fn active_loan_count(&self) -> usize {
        self.beo.list_active_loans().expect("Failed to list loans").len()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for building test dates.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("invalid test date")
}
