use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{ContractId, ContractStatus, PaymentId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// one or more input rules were violated; all of them are reported
    #[error("{}", .messages.join(", "))]
    Validation {
        messages: Vec<String>,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("{message}")]
    Conflict {
        message: String,
    },

    #[error("transient infrastructure failure: {message}")]
    TransientInfrastructure {
        message: String,
    },

    #[error("contract {contract_id} vanished before payment {payment_id} could be reconciled")]
    DataIntegrity {
        contract_id: ContractId,
        payment_id: PaymentId,
    },

    #[error("invalid state: current {current:?}, expected {expected:?}")]
    InvalidState {
        current: ContractStatus,
        expected: ContractStatus,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            messages: vec![message.into()],
        }
    }

    pub fn contract_not_found(id: ContractId) -> Self {
        LedgerError::NotFound {
            entity: "contract",
            id: id.to_string(),
        }
    }

    /// numeric status the service boundary reports for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::Validation { .. } => 400,
            LedgerError::NotFound { .. } => 404,
            LedgerError::Conflict { .. } | LedgerError::InvalidState { .. } => 409,
            LedgerError::TransientInfrastructure { .. } => 503,
            LedgerError::Cancelled => 499,
            LedgerError::DataIntegrity { .. }
            | LedgerError::Calculation { .. }
            | LedgerError::Storage(_) => 500,
        }
    }

    /// whether the reconciliation channel may try again
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::TransientInfrastructure { .. } => true,
            LedgerError::Storage(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// errors raised by the contract and payment stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
    },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        constraint: &'static str,
    },

    #[error("version conflict on contract {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("row not found: {id}")]
    RowNotFound {
        id: Uuid,
    },
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }
}

/// the reconciliation channel refused a fact
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("reconciliation channel is closed")]
    Closed,
}

/// structured result handed across the service boundary instead of an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub is_success: bool,
    pub data: Option<T>,
    pub error_message: String,
    pub status_code: u16,
}

impl<T> Outcome<T> {
    pub fn success(data: T, status_code: u16) -> Self {
        Self {
            is_success: true,
            data: Some(data),
            error_message: String::new(),
            status_code,
        }
    }

    pub fn failure(error: &LedgerError) -> Self {
        Self {
            is_success: false,
            data: None,
            error_message: error.to_string(),
            status_code: error.status_code(),
        }
    }

    /// fold an operation result, using `success_code` when it succeeded
    pub fn from_result(result: Result<T>, success_code: u16) -> Self {
        match result {
            Ok(data) => Self::success(data, success_code),
            Err(e) => Self::failure(&e),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
