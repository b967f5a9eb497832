//! Typed errors for engine operations.
//!
//! These are the expected, user-facing failures: the caller's input did
//! not match current state and should be re-prompted, never retried.
//! Infrastructure failures (connection loss, constraint violations mid
//! transaction) surface separately as contextual reports and abort the
//! whole operation.

use crate::types::{ItemState, LoanStatus, ValidationError};

/// Errors that can occur during engine operations.
#[derive(Debug)]
pub enum BeoError {
    /// Item not found.
    ItemNotFound(String),
    /// Item exists but is not available for loan.
    ItemNotAvailable { code: String, state: ItemState },
    /// Loan not found.
    LoanNotFound(String),
    /// Loan is already in a terminal status.
    AlreadyClosed { id: String, status: LoanStatus },
    /// Beneficiary does not exist or failed validation.
    BeneficiaryInvalid(String),
    /// An item with this code already exists.
    DuplicateCode(String),
    /// A record with this name already exists.
    DuplicateName(String),
    /// Return condition not covered by the return policy.
    UnknownCondition(String),
    /// Administrative state change not allowed.
    InvalidStateChange { from: ItemState, to: ItemState },
    /// Referenced deposit or category does not exist.
    ReferenceNotFound(String),
    /// Validation error.
    Validation(ValidationError),
}

impl std::fmt::Display for BeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BeoError::ItemNotFound(id) => write!(f, "item not found: {}", id),
            BeoError::ItemNotAvailable { code, state } => {
                write!(f, "item {} is not available (state: {})", code, state)
            }
            BeoError::LoanNotFound(id) => write!(f, "loan not found: {}", id),
            BeoError::AlreadyClosed { id, status } => {
                write!(f, "loan {} is already closed (status: {})", id, status)
            }
            BeoError::BeneficiaryInvalid(id) => write!(f, "invalid beneficiary: {}", id),
            BeoError::DuplicateCode(code) => write!(f, "an item with code {} already exists", code),
            BeoError::DuplicateName(name) => write!(f, "a record named '{}' already exists", name),
            BeoError::UnknownCondition(c) => {
                write!(f, "return condition '{}' is not in the return policy", c)
            }
            BeoError::InvalidStateChange { from, to } => {
                write!(f, "state change from {} to {} is not allowed", from, to)
            }
            BeoError::ReferenceNotFound(id) => write!(f, "referenced record not found: {}", id),
            BeoError::Validation(e) => write!(f, "validation error: {}", e),
        }
    }
}

impl std::error::Error for BeoError {}

impl From<ValidationError> for BeoError {
    fn from(e: ValidationError) -> Self {
        BeoError::Validation(e)
    }
}
