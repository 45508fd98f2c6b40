use alloy_json_rpc::RpcError;
use alloy_primitives::U256;
use alloy_transport::TransportErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid transfer request: {0}")]
    Validation(String),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: U256, required: U256 },

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Timed out waiting for confirmation of {tx_hash}")]
    ConfirmationTimeout { tx_hash: String },

    #[error("Timeout waiting for attestation")]
    AttestationTimeout,

    #[error("Attestation not found (will retry)")]
    AttestationNotFound,

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Attestation request rejected: {reason}")]
    AttestationRejected { reason: String },

    #[error("Unexpected protocol response: {0}")]
    ProtocolMismatch(String),

    #[error("Transaction reverted: {reason}")]
    UnrecoverableSubmission { reason: String },

    #[error("Approval confirmed but allowance is {observed}, expected at least {expected}")]
    ApprovalNotEffective { expected: U256, observed: U256 },

    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Deadline exceeded in state {state}")]
    DeadlineExceeded { state: String },

    #[error("Transfer not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),
}

/// Persistable classification of a [`TransferError`].
///
/// The orchestrator stores this on a failed record so the failure survives a
/// restart without keeping the full error value around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientFunds,
    TransientNetwork,
    ConfirmationTimeout,
    AttestationTimeout,
    AttestationRejected,
    ProtocolMismatch,
    UnrecoverableSubmission,
    ApprovalNotEffective,
    Cancelled,
    DeadlineExceeded,
    Internal,
}

impl TransferError {
    /// Whether a caller may retry the failed operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork(_)
                | Self::ConfirmationTimeout { .. }
                | Self::AttestationTimeout
                | Self::AttestationNotFound
                | Self::RateLimited { .. }
                | Self::ApprovalNotEffective { .. }
                | Self::DeadlineExceeded { .. }
                | Self::Http(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::InvalidConfig(_) => {
                ErrorKind::Validation
            }
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::TransientNetwork(_)
            | Self::RateLimited { .. }
            | Self::AttestationNotFound
            | Self::Http(_) => ErrorKind::TransientNetwork,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            Self::AttestationTimeout => ErrorKind::AttestationTimeout,
            Self::AttestationRejected { .. } => ErrorKind::AttestationRejected,
            Self::ProtocolMismatch(_) | Self::Abi(_) | Self::Json(_) | Self::Hex(_) => {
                ErrorKind::ProtocolMismatch
            }
            Self::UnrecoverableSubmission { .. } => ErrorKind::UnrecoverableSubmission,
            Self::ApprovalNotEffective { .. } => ErrorKind::ApprovalNotEffective,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::InvalidTransition(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<RpcError<TransportErrorKind>> for TransferError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        match &err {
            RpcError::ErrorResp(payload) if payload.message.contains("revert") => {
                Self::UnrecoverableSubmission {
                    reason: payload.message.to_string(),
                }
            }
            _ => Self::TransientNetwork(err.to_string()),
        }
    }
}

impl From<alloy_contract::Error> for TransferError {
    fn from(err: alloy_contract::Error) -> Self {
        Self::TransientNetwork(err.to_string())
    }
}

impl From<sled::Error> for TransferError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
