//! The consistency engine: the only writer of item lifecycle state.
//!
//! `Beo` keeps one invariant: an item is `Loaned` exactly when the
//! ledger holds one active loan for it. Opening and closing loans each
//! touch the inventory, the ledger, and the history in a single SQLite
//! transaction, so a failure anywhere leaves no partial write. UI code
//! never mutates item state directly.

use crate::config::BeoConfig;
use crate::error::BeoError;
use crate::history::StateHistory;
use crate::inventory::{InventoryStore, ItemFilter, NewItem};
use crate::ledger::{LoanLedger, LoanReturn, NewLoan};
use crate::registry::{NewBeneficiary, Registry};
use crate::storage::Storage;
use crate::types::{Beneficiary, Category, Deposit, Item, ItemState, Loan, StateChange};
use chrono::NaiveDate;
use eyre::{Context, Result};
use log::info;
use std::path::Path;

/// A request to open a loan.
#[derive(Debug, Clone)]
pub struct LoanRequest {
    pub item_id: String,
    pub beneficiary_id: String,
    pub requested_by: String,
    pub authorized_by: Option<String>,
    pub delivered_by: Option<String>,
    pub loan_date: NaiveDate,
    /// Falls back to the configured default when unset.
    pub duration_days: Option<u32>,
    pub notes: Option<String>,
}

impl LoanRequest {
    pub fn new(
        item_id: impl Into<String>,
        beneficiary_id: impl Into<String>,
        requested_by: impl Into<String>,
        loan_date: NaiveDate,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            beneficiary_id: beneficiary_id.into(),
            requested_by: requested_by.into(),
            authorized_by: None,
            delivered_by: None,
            loan_date,
            duration_days: None,
            notes: None,
        }
    }

    pub fn duration_days(mut self, days: u32) -> Self {
        self.duration_days = Some(days);
        self
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
        self.notes = Some(notes.into());
        self
    }
}

/// A request to close a loan.
#[derive(Debug, Clone)]
pub struct ReturnRequest {
    pub loan_id: String,
    pub return_date: NaiveDate,
    /// Reported condition, mapped through the return policy.
    pub condition: String,
    pub closed_by: String,
    pub received_by: Option<String>,
    pub notes: Option<String>,
    /// Reassign the item to this deposit on return.
    pub return_deposit_id: Option<String>,
}

impl ReturnRequest {
    pub fn new(
        loan_id: impl Into<String>,
        return_date: NaiveDate,
        condition: impl Into<String>,
        closed_by: impl Into<String>,
    ) -> Self {
        Self {
            loan_id: loan_id.into(),
            return_date,
            condition: condition.into(),
            closed_by: closed_by.into(),
            received_by: None,
            notes: None,
            return_deposit_id: None,
        }
    }

    pub fn received_by(mut self, name: impl Into<String>) -> Self {
        self.received_by = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn to_deposit(mut self, deposit_id: impl Into<String>) -> Self {
        self.return_deposit_id = Some(deposit_id.into());
        self
    }
}

/// Inventory counters for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BeoStats {
    pub total_items: i64,
    pub available: i64,
    pub loaned: i64,
    pub maintenance: i64,
    pub decommissioned: i64,
    pub active_loans: i64,
}

/// The loan-bank engine.
///
/// Constructed explicitly and passed to callers; there is no global
/// instance anywhere.
pub struct Beo {
    storage: Storage,
    config: BeoConfig,
}

impl Beo {
    /// Initialize a new store in the given directory, seeding default
    /// categories and the default deposit.
    pub fn init(root: &Path, config: BeoConfig) -> Result<Self> {
        let storage = Storage::init(root)?;
        Registry::new(storage.conn()).seed_defaults()?;
        Ok(Self { storage, config })
    }

    /// Open an existing store.
    pub fn open(root: &Path, config: BeoConfig) -> Result<Self> {
        let storage = Storage::open(root)?;
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &BeoConfig {
        &self.config
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    // ------------------------------------------------------------------
    // Loan flow
    // ------------------------------------------------------------------

    /// Open a loan: the item leaves the shelf.
    ///
    /// Availability check, loan insert, item state write, and history
    /// append all commit together or not at all. Two racing opens of
    /// the same item serialize on the connection; the loser sees the
    /// item already `Loaned` and fails with `ItemNotAvailable`.
    pub fn open_loan(&mut self, req: LoanRequest) -> Result<Loan> {
        let duration = req.duration_days.unwrap_or(self.config.default_loan_days);

        let tx = self.storage.transaction()?;
        let loan = {
            let inventory = InventoryStore::new(&tx);
            let ledger = LoanLedger::new(&tx);
            let history = StateHistory::new(&tx);

            let item = inventory
                .get(&req.item_id)?
                .ok_or_else(|| eyre::eyre!(BeoError::ItemNotFound(req.item_id.clone())))?;
            if item.state != ItemState::Available {
                return Err(eyre::eyre!(BeoError::ItemNotAvailable {
                    code: item.code,
                    state: item.state,
                }));
            }

            let mut spec = NewLoan::new(
                &req.item_id,
                &req.beneficiary_id,
                &req.requested_by,
                req.loan_date,
                duration,
            );
            spec.authorized_by = req.authorized_by.clone();
            spec.delivered_by = req.delivered_by.clone();
            spec.loan_notes = req.notes.clone();

            let loan = ledger.create(spec)?;
            inventory.set_state(&item.id, ItemState::Loaned)?;
            history.append(
                &item.id,
                Some(item.state),
                ItemState::Loaned,
                "loan opened",
                req.notes.as_deref(),
                &req.requested_by,
            )?;
            loan
        };
        tx.commit().context("Failed to commit loan opening")?;

        info!("opened loan {} for item {}", loan.id, loan.item_id);
        Ok(loan)
    }

    /// Close a loan: the item comes back.
    ///
    /// The reported condition decides the item's next state through the
    /// configured return policy; the mapping is a lookup, never a per
    /// call-site choice. Returns the item's final state.
    pub fn close_loan(&mut self, req: ReturnRequest) -> Result<ItemState> {
        let target = self
            .config
            .return_policy
            .terminal(&req.condition)
            .ok_or_else(|| eyre::eyre!(BeoError::UnknownCondition(req.condition.clone())))?;

        let tx = self.storage.transaction()?;
        {
            let inventory = InventoryStore::new(&tx);
            let ledger = LoanLedger::new(&tx);
            let history = StateHistory::new(&tx);

            let mut ret = LoanReturn::new(req.return_date);
            ret.return_notes = req.notes.clone();
            ret.received_by = req.received_by.clone();
            ret.return_deposit_id = req.return_deposit_id.clone();

            let loan = ledger.close(&req.loan_id, &ret)?;

            let item = inventory
                .get(&loan.item_id)?
                .ok_or_else(|| eyre::eyre!(BeoError::ItemNotFound(loan.item_id.clone())))?;
            if let Some(ref deposit_id) = req.return_deposit_id {
                inventory.set_deposit(&item.id, deposit_id)?;
            }
            inventory.set_state(&item.id, target)?;
            history.append(
                &item.id,
                Some(item.state),
                target,
                "loan closed",
                Some(req.condition.as_str()),
                &req.closed_by,
            )?;
        }
        tx.commit().context("Failed to commit loan closure")?;

        info!("closed loan {} -> item state {}", req.loan_id, target);
        Ok(target)
    }

    /// Record a loan as lost. The loan closes terminally and the item
    /// is decommissioned, since it will not come back to the shelf.
    pub fn report_lost(&mut self, loan_id: &str, noted_by: &str, notes: Option<&str>) -> Result<()> {
        let tx = self.storage.transaction()?;
        {
            let inventory = InventoryStore::new(&tx);
            let ledger = LoanLedger::new(&tx);
            let history = StateHistory::new(&tx);

            let loan = ledger.mark_lost(loan_id, notes)?;
            let item = inventory
                .get(&loan.item_id)?
                .ok_or_else(|| eyre::eyre!(BeoError::ItemNotFound(loan.item_id.clone())))?;
            inventory.set_state(&item.id, ItemState::Decommissioned)?;
            history.append(
                &item.id,
                Some(item.state),
                ItemState::Decommissioned,
                "equipment lost",
                notes,
                noted_by,
            )?;
        }
        tx.commit().context("Failed to commit lost report")?;

        info!("loan {} reported lost", loan_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    /// Register a new item, recording the registration in the history.
    pub fn register_item(&mut self, spec: NewItem, registered_by: &str) -> Result<Item> {
        let tx = self.storage.transaction()?;
        let item = {
            let inventory = InventoryStore::new(&tx);
            let history = StateHistory::new(&tx);

            let item = inventory.create(spec)?;
            history.append(&item.id, None, item.state, "registered", None, registered_by)?;
            item
        };
        tx.commit().context("Failed to commit item registration")?;

        info!("registered item {} ({})", item.code, item.id);
        Ok(item)
    }

    /// Administrative state override, outside the loan flow.
    ///
    /// Guarded by the transition table: `Loaned` can be neither entered
    /// nor left by hand.
    pub fn set_item_state(
        &mut self,
        item_id: &str,
        new_state: ItemState,
        reason: &str,
        changed_by: &str,
    ) -> Result<Item> {
        let tx = self.storage.transaction()?;
        let updated = {
            let inventory = InventoryStore::new(&tx);
            let history = StateHistory::new(&tx);

            let item = inventory
                .get(item_id)?
                .ok_or_else(|| eyre::eyre!(BeoError::ItemNotFound(item_id.to_string())))?;
            if !item.state.can_transition_to(&new_state) {
                return Err(eyre::eyre!(BeoError::InvalidStateChange {
                    from: item.state,
                    to: new_state,
                }));
            }

            inventory.set_state(&item.id, new_state)?;
            history.append(&item.id, Some(item.state), new_state, reason, None, changed_by)?;
            Item { state: new_state, ..item }
        };
        tx.commit().context("Failed to commit state change")?;

        Ok(updated)
    }

    /// Get an item by internal ID.
    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        InventoryStore::new(self.storage.conn()).get(id)
    }

    /// Find an item by inventory code.
    pub fn find_item_by_code(&self, code: &str) -> Result<Option<Item>> {
        InventoryStore::new(self.storage.conn()).find_by_code(code)
    }

    /// List items matching a filter.
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        InventoryStore::new(self.storage.conn()).list(filter)
    }

    // ------------------------------------------------------------------
    // Ledger reads
    // ------------------------------------------------------------------

    /// Get a loan by ID.
    pub fn get_loan(&self, id: &str) -> Result<Option<Loan>> {
        LoanLedger::new(self.storage.conn()).get(id)
    }

    /// All active loans.
    pub fn list_active_loans(&self) -> Result<Vec<Loan>> {
        LoanLedger::new(self.storage.conn()).list_active()
    }

    /// Full loan history for one item.
    pub fn loans_for_item(&self, item_id: &str) -> Result<Vec<Loan>> {
        LoanLedger::new(self.storage.conn()).list_by_item(item_id)
    }

    // ------------------------------------------------------------------
    // History and reference data
    // ------------------------------------------------------------------

    /// State-change history for one item.
    pub fn history_for_item(&self, item_id: &str) -> Result<Vec<StateChange>> {
        StateHistory::new(self.storage.conn()).list_for_item(item_id)
    }

    /// Most recent state changes across the store.
    pub fn recent_history(&self, limit: usize) -> Result<Vec<StateChange>> {
        StateHistory::new(self.storage.conn()).recent(limit)
    }

    /// Register a beneficiary.
    pub fn register_beneficiary(&mut self, spec: NewBeneficiary) -> Result<Beneficiary> {
        Registry::new(self.storage.conn()).add_beneficiary(spec)
    }

    /// Get a beneficiary by ID.
    pub fn get_beneficiary(&self, id: &str) -> Result<Option<Beneficiary>> {
        Registry::new(self.storage.conn()).get_beneficiary(id)
    }

    /// List beneficiaries.
    pub fn list_beneficiaries(&self) -> Result<Vec<Beneficiary>> {
        Registry::new(self.storage.conn()).list_beneficiaries()
    }

    /// Register a deposit.
    pub fn add_deposit(
        &mut self,
        name: &str,
        address: Option<&str>,
        manager: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Deposit> {
        Registry::new(self.storage.conn()).add_deposit(name, address, manager, phone)
    }

    /// List deposits.
    pub fn list_deposits(&self) -> Result<Vec<Deposit>> {
        Registry::new(self.storage.conn()).list_deposits()
    }

    /// Register a category.
    pub fn add_category(&mut self, name: &str, description: Option<&str>) -> Result<Category> {
        Registry::new(self.storage.conn()).add_category(name, description)
    }

    /// List categories.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        Registry::new(self.storage.conn()).list_categories()
    }

    /// Find a category by name.
    pub fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        Registry::new(self.storage.conn()).find_category_by_name(name)
    }

    /// Find a deposit by name.
    pub fn find_deposit_by_name(&self, name: &str) -> Result<Option<Deposit>> {
        Registry::new(self.storage.conn()).find_deposit_by_name(name)
    }

    // ------------------------------------------------------------------
    // Dashboard
    // ------------------------------------------------------------------

    /// Inventory counters for the dashboard.
    pub fn stats(&self) -> Result<BeoStats> {
        let inventory = InventoryStore::new(self.storage.conn());
        let ledger = LoanLedger::new(self.storage.conn());

        Ok(BeoStats {
            total_items: inventory.count_all()?,
            available: inventory.count_in_state(ItemState::Available)?,
            loaned: inventory.count_in_state(ItemState::Loaned)?,
            maintenance: inventory.count_in_state(ItemState::Maintenance)?,
            decommissioned: inventory.count_in_state(ItemState::Decommissioned)?,
            active_loans: ledger.count_active()?,
        })
    }
}
