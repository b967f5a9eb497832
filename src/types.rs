//! Core data types for the BEO loan bank.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A physical piece of loanable equipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Internal identifier: "el-" + 10 hex chars
    pub id: String,

    /// Human-assigned inventory code, unique and immutable
    pub code: String,

    /// Short name ("Standard wheelchair")
    pub name: String,

    /// Category the item belongs to
    pub category_id: String,

    /// Deposit where the item is stored (or was stored, while loaned)
    pub deposit_id: String,

    /// Current lifecycle state
    pub state: ItemState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    /// Optional longer description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Date the item entered the bank's inventory
    pub entered_on: NaiveDate,

    pub created_at: DateTime<Utc>,
}

/// Item lifecycle states.
///
/// `Loaned` is a cached projection of the loan ledger: an item is
/// `Loaned` exactly when one active loan references it. The ledger is
/// authoritative; see the auditor and reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Available,
    Loaned,
    Maintenance,
    Decommissioned,
}

impl ItemState {
    /// Check whether an administrative state change is allowed.
    ///
    /// `Loaned` is never entered or left by hand: only the loan flow
    /// (and the reconciler) writes it.
    pub fn can_transition_to(&self, target: &ItemState) -> bool {
        use ItemState::*;
        match (self, target) {
            (Available, Maintenance) => true,
            (Available, Decommissioned) => true,

            (Maintenance, Available) => true,
            (Maintenance, Decommissioned) => true,

            // Reactivating retired equipment
            (Decommissioned, Available) => true,

            // Same state = no-op, allowed
            (a, b) if a == b => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Available => "available",
            ItemState::Loaned => "loaned",
            ItemState::Maintenance => "maintenance",
            ItemState::Decommissioned => "decommissioned",
        }
    }

    pub fn parse(s: &str) -> Option<ItemState> {
        match s {
            "available" => Some(ItemState::Available),
            "loaned" => Some(ItemState::Loaned),
            "maintenance" => Some(ItemState::Maintenance),
            "decommissioned" => Some(ItemState::Decommissioned),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One borrowing transaction. One row per loan lifetime; rows are never
/// deleted — the ledger is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Loan {
    /// Internal identifier: "ln-" + 10 hex chars
    pub id: String,

    pub item_id: String,

    pub beneficiary_id: String,

    /// Member who requested the loan
    pub requested_by: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<String>,

    /// Person who handed the equipment over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_by: Option<String>,

    pub loan_date: NaiveDate,

    /// Requested duration in days
    pub duration_days: u32,

    /// loan_date + duration_days, calendar addition
    pub due_date: NaiveDate,

    /// Set exactly once, when the loan closes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_on: Option<NaiveDate>,

    pub status: LoanStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_notes: Option<String>,

    /// Person who took the equipment back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,

    /// Deposit the item was returned to, when different from its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_deposit_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Stored loan statuses.
///
/// "Overdue" is deliberately not one of them: it is a display tier
/// computed against the due date (see [`crate::alerts`]), so the ledger
/// never holds a second copy of time-dependent truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Returned,
    Lost,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<LoanStatus> {
        match s {
            "active" => Some(LoanStatus::Active),
            "returned" => Some(LoanStatus::Returned),
            "lost" => Some(LoanStatus::Lost),
            _ => None,
        }
    }

    /// Terminal statuses are immutable.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Active)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of one item state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateChange {
    pub id: i64,

    pub item_id: String,

    /// None for the implicit transition at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<ItemState>,

    pub new_state: ItemState,

    pub reason: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub changed_by: String,

    pub changed_at: DateTime<Utc>,
}

/// The person receiving the equipment: a member, or a member's relative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Beneficiary {
    /// Internal identifier: "bf-" + 10 hex chars
    pub id: String,

    pub kind: BeneficiaryKind,

    pub name: String,

    /// Relationship to the responsible member (Relative only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinship: Option<String>,

    /// Member answering for a relative beneficiary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_member: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeneficiaryKind {
    Member,
    Relative,
}

impl BeneficiaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeneficiaryKind::Member => "member",
            BeneficiaryKind::Relative => "relative",
        }
    }

    pub fn parse(s: &str) -> Option<BeneficiaryKind> {
        match s {
            "member" => Some(BeneficiaryKind::Member),
            "relative" => Some(BeneficiaryKind::Relative),
            _ => None,
        }
    }
}

/// A physical storage location for equipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deposit {
    /// Internal identifier: "dp-" + 10 hex chars
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// An equipment category ("Wheelchairs", "Walkers", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Internal identifier: "ct-" + 10 hex chars
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Validation errors for records entering the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyCode,
    EmptyName,
    CodeTooLong,
    InvalidCharacters,
    NonPositiveDuration,
    KinshipRequired,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyCode => write!(f, "code cannot be empty"),
            ValidationError::EmptyName => write!(f, "name cannot be empty"),
            ValidationError::CodeTooLong => write!(f, "code exceeds 100 characters"),
            ValidationError::InvalidCharacters => {
                write!(f, "field contains control characters")
            }
            ValidationError::NonPositiveDuration => {
                write!(f, "loan duration must be at least one day")
            }
            ValidationError::KinshipRequired => {
                write!(f, "relative beneficiaries need a kinship and a responsible member")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl Item {
    /// Validate the item's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        if self.code.len() > 100 {
            return Err(ValidationError::CodeTooLong);
        }
        if self.code.chars().any(|c| c.is_control()) || self.name.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidCharacters);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

impl Beneficiary {
    /// Validate the beneficiary's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.kind == BeneficiaryKind::Relative
            && (self.kinship.is_none() || self.responsible_member.is_none())
        {
            return Err(ValidationError::KinshipRequired);
        }
        Ok(())
    }
}
