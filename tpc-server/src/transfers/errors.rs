//! Setup errors for remote transfers
//!
//! Anything that goes wrong before a transfer is registered is returned to
//! the request layer as a `TransferError`. Failures after registration are
//! only ever reported on the client stream as the terminal `failure:` line.

use crate::transfer_manager::ManagerError;

use super::protocol_info::ProtocolInfoError;

/// Reasons a remote transfer could not be set up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("permission denied")]
    PermissionDenied,

    /// The request names a transport or credential that cannot be used
    #[error(transparent)]
    ProtocolInfo(#[from] ProtocolInfoError),

    #[error("transfer service unavailable")]
    ServiceUnavailable,

    #[error("transfer not accepted: {0}")]
    Rejected(String),
}

impl TransferError {
    /// HTTP-style status code for the request layer
    pub fn status(&self) -> u16 {
        match self {
            Self::PermissionDenied => 403,
            Self::ProtocolInfo(_) => 400,
            Self::ServiceUnavailable | Self::Rejected(_) => 500,
        }
    }

    /// Whether the client caused the error
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl From<ManagerError> for TransferError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::NoRoute(_) | ManagerError::Timeout => Self::ServiceUnavailable,
            ManagerError::PermissionDenied(_) => Self::PermissionDenied,
            ManagerError::Rejected(reason)
            | ManagerError::UnknownTransfer(reason)
            | ManagerError::UnexpectedReply(reason) => Self::Rejected(reason),
        }
    }
}

/// Status and message handed to the request layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}

impl From<&TransferError> for ErrorResponse {
    fn from(err: &TransferError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}
