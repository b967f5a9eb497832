//! Integrity auditor: read-only drift detection.
//!
//! The item table caches what the ledger already knows. When an
//! out-of-band edit (or an old bug) lets the two disagree, the auditor
//! finds the disagreement and reports it as data — no exceptions, no
//! mutation. Cheap enough to run on every dashboard load.

use crate::engine::Beo;
use crate::inventory::{InventoryStore, ItemFilter};
use crate::ledger::LoanLedger;
use crate::types::{Item, ItemState, Loan};
use eyre::Result;
use serde::Serialize;

/// What the audit found.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Items marked `Loaned` with no active loan backing them.
    pub orphaned_items: Vec<Item>,
    /// Active loans whose item is not marked `Loaned`.
    pub dangling_loans: Vec<Loan>,
    /// Loaned-item count != active-loan count. Necessary but not
    /// sufficient; reported alongside the detailed lists.
    pub count_mismatch: bool,
}

impl AuditReport {
    /// True when no drift was found.
    pub fn is_clean(&self) -> bool {
        self.orphaned_items.is_empty() && self.dangling_loans.is_empty() && !self.count_mismatch
    }

    /// Total number of findings.
    pub fn finding_count(&self) -> usize {
        self.orphaned_items.len() + self.dangling_loans.len()
    }
}

/// Extension trait adding integrity auditing to the engine.
pub trait BeoAuditExt {
    /// Scan for disagreement between item states and the ledger.
    fn audit(&self) -> Result<AuditReport>;
}

impl BeoAuditExt for Beo {
    fn audit(&self) -> Result<AuditReport> {
        let conn = self.storage().conn();
        let inventory = InventoryStore::new(conn);
        let ledger = LoanLedger::new(conn);

        let mut orphaned_items = Vec::new();
        for item in inventory.list(&ItemFilter::new().state(ItemState::Loaned))? {
            if ledger.active_for_item(&item.id)?.is_none() {
                orphaned_items.push(item);
            }
        }

        let mut dangling_loans = Vec::new();
        for loan in ledger.list_active()? {
            match inventory.get(&loan.item_id)? {
                Some(item) if item.state == ItemState::Loaned => {}
                _ => dangling_loans.push(loan),
            }
        }

        let loaned_count = inventory.count_in_state(ItemState::Loaned)?;
        let active_count = ledger.count_active()?;

        Ok(AuditReport {
            orphaned_items,
            dangling_loans,
            count_mismatch: loaned_count != active_count,
        })
    }
}
