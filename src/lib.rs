//! BEO: a lending bank for medical equipment.
//!
//! The library keeps a small fleet of orthopedic equipment (wheelchairs,
//! canes, walkers) synchronized with its loan ledger in SQLite. The loan
//! ledger is the source of truth for "is this item out"; the item's
//! state column is a cached projection of it, written only by the
//! engine, audited for drift, and repaired from the ledger when the two
//! disagree.
//!
//! # Example
//!
//! ```no_run
//! use beo::{Beo, BeoConfig, LoanRequest, NewBeneficiary, NewItem, ReturnRequest};
//! use chrono::NaiveDate;
//! use std::path::Path;
//!
//! let mut beo = Beo::init(Path::new("."), BeoConfig::default()).unwrap();
//!
//! // Register equipment and a beneficiary
//! let category = beo.find_category_by_name("Wheelchairs").unwrap().unwrap();
//! let deposit = beo.find_deposit_by_name("Main deposit").unwrap().unwrap();
//! let item = beo
//!     .register_item(NewItem::new("SR-001", "Standard wheelchair", category.id, deposit.id), "clerk")
//!     .unwrap();
//! let who = beo.register_beneficiary(NewBeneficiary::member("Juan Pérez")).unwrap();
//!
//! // Lend it out and take it back
//! let loan_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let loan = beo
//!     .open_loan(LoanRequest::new(&item.id, &who.id, "Juan Pérez", loan_date).duration_days(90))
//!     .unwrap();
//! beo.close_loan(ReturnRequest::new(
//!     &loan.id,
//!     NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     "Good",
//!     "clerk",
//! ))
//! .unwrap();
//! ```

mod id;
mod storage;

pub mod alerts;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod inventory;
pub mod ledger;
pub mod reconcile;
pub mod registry;
pub mod types;

// Re-export public API
pub use alerts::{AlertTier, BeoAlertExt, DueEntry, classify};
pub use audit::{AuditReport, BeoAuditExt};
pub use config::{BeoConfig, ReturnDisposition, ReturnPolicy};
pub use engine::{Beo, BeoStats, LoanRequest, ReturnRequest};
pub use error::BeoError;
pub use inventory::{ItemFilter, NewItem};
pub use reconcile::{BeoReconcileExt, ReconcileSummary};
pub use registry::NewBeneficiary;
pub use types::{
    Beneficiary, BeneficiaryKind, Category, Deposit, Item, ItemState, Loan, LoanStatus,
    StateChange, ValidationError,
};
