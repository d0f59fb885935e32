use super::authority::{Operation, RoleSet};
use super::store::StoreError;
use super::types::InvoiceId;

/// Coarse classification of a [`LedgerError`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedPayload,
    NotFound,
    AlreadyExists,
    Conflict,
    Storage,
    UnknownOperation,
    Unauthorized,
}

/// Why a lifecycle transition was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("is locked")]
    Locked,
    #[error("is already locked")]
    AlreadyLocked,
    #[error("is not locked")]
    NotLocked,
    #[error("has already been printed")]
    AlreadyPrinted,
    #[error("already holds an outstanding booking for this entry")]
    AlreadyRecorded,
    #[error("does not hold exactly one outstanding booking for this entry")]
    NotRecorded,
    #[error("has an outstanding booking")]
    OutstandingBooking,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("{operation}: malformed payload: {reason}")]
    MalformedPayload { operation: Operation, reason: String },
    #[error("{operation}: invoice {id} does not exist")]
    NotFound { operation: Operation, id: InvoiceId },
    #[error("{operation}: invoice {id} already exists")]
    AlreadyExists { operation: Operation, id: InvoiceId },
    #[error("{operation}: invoice {id} {reason}")]
    Conflict {
        operation: Operation,
        id: InvoiceId,
        reason: ConflictReason,
    },
    #[error("{operation}: storage failure on {key}")]
    Storage {
        operation: Operation,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("{operation}: stored value at {key} is unreadable: {reason}")]
    Corrupt {
        operation: Operation,
        key: String,
        reason: String,
    },
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("{operation} is not granted to roles {roles}")]
    Unauthorized { operation: Operation, roles: RoleSet },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            LedgerError::Conflict { .. } => ErrorKind::Conflict,
            LedgerError::Storage { .. } | LedgerError::Corrupt { .. } => ErrorKind::Storage,
            LedgerError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
        }
    }
    /// The conflict reason, when this is a refused transition
    pub fn conflict(&self) -> Option<ConflictReason> {
        match self {
            LedgerError::Conflict { reason, .. } => Some(*reason),
            _ => None,
        }
    }
    pub(crate) fn malformed(operation: Operation, reason: impl Into<String>) -> Self {
        LedgerError::MalformedPayload {
            operation,
            reason: reason.into(),
        }
    }
}
