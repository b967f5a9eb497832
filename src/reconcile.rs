//! Reconciler: repairs drift using the ledger as source of truth.
//!
//! Corrections only ever flow one way: the item's cached state is
//! rewritten to match the ledger. The ledger itself is never edited, so
//! a reconcile run cannot make anything worse, and running it twice in
//! a row changes nothing the second time.

use crate::engine::Beo;
use crate::history::StateHistory;
use crate::inventory::{InventoryStore, ItemFilter};
use crate::ledger::LoanLedger;
use crate::types::ItemState;
use eyre::{Context, Result};
use log::info;
use serde::Serialize;

/// Actor recorded on automatic corrections.
const RECONCILER_ACTOR: &str = "reconciler";

/// What a reconcile run fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Items that claimed to be loaned with no active loan; now available.
    pub orphans_fixed: usize,
    /// Items whose active loan was not reflected; now loaned.
    pub dangling_fixed: usize,
}

impl ReconcileSummary {
    pub fn total(&self) -> usize {
        self.orphans_fixed + self.dangling_fixed
    }
}

/// Extension trait adding reconciliation to the engine.
pub trait BeoReconcileExt {
    /// Rewrite cached item states to match the ledger.
    ///
    /// Runs as one transaction under the same write discipline as the
    /// loan flow, so it cannot observe an item mid-transition.
    fn reconcile(&mut self) -> Result<ReconcileSummary>;
}

impl BeoReconcileExt for Beo {
    fn reconcile(&mut self) -> Result<ReconcileSummary> {
        let tx = self.storage_mut().transaction()?;
        let summary = {
            let inventory = InventoryStore::new(&tx);
            let ledger = LoanLedger::new(&tx);
            let history = StateHistory::new(&tx);

            let mut orphans_fixed = 0;
            for item in inventory.list(&ItemFilter::new().state(ItemState::Loaned))? {
                if ledger.active_for_item(&item.id)?.is_none() {
                    // No active loan: the item cannot actually be out
                    inventory.set_state(&item.id, ItemState::Available)?;
                    history.append(
                        &item.id,
                        Some(ItemState::Loaned),
                        ItemState::Available,
                        "automatic correction: no active loan",
                        None,
                        RECONCILER_ACTOR,
                    )?;
                    orphans_fixed += 1;
                }
            }

            let mut dangling_fixed = 0;
            for loan in ledger.list_active()? {
                if let Some(item) = inventory.get(&loan.item_id)?
                    && item.state != ItemState::Loaned
                {
                    // Active loan means the item is out, whatever the cache said
                    inventory.set_state(&item.id, ItemState::Loaned)?;
                    history.append(
                        &item.id,
                        Some(item.state),
                        ItemState::Loaned,
                        "automatic correction: active loan on record",
                        None,
                        RECONCILER_ACTOR,
                    )?;
                    dangling_fixed += 1;
                }
            }

            ReconcileSummary {
                orphans_fixed,
                dangling_fixed,
            }
        };
        tx.commit().context("Failed to commit reconciliation")?;

        if summary.total() > 0 {
            info!(
                "reconciled {} orphaned item(s), {} dangling loan(s)",
                summary.orphans_fixed, summary.dangling_fixed
            );
        }
        Ok(summary)
    }
}
