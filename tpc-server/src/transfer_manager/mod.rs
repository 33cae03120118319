//! Interface to the transfer manager
//!
//! The transfer manager is the external service that moves the data. The
//! orchestrator starts, cancels and queries transfers through the
//! `TransferManager` trait; completion arrives separately as
//! `ManagerNotification`s.

mod client;

use async_trait::async_trait;

use tpc_common::TransferId;
use tpc_common::protocol::{ManagerErrorCode, StartTransfer, TransferStatus};

pub use client::TcpTransferManager;

/// Errors talking to the transfer manager
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    /// The transfer manager cannot be reached
    #[error("no route to transfer manager: {0}")]
    NoRoute(String),

    #[error("transfer manager did not reply in time")]
    Timeout,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The transfer manager declined the request
    #[error("{0}")]
    Rejected(String),

    #[error("unknown transfer: {0}")]
    UnknownTransfer(String),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ManagerError {
    /// Map an error reply onto the matching variant
    pub fn from_reply(code: ManagerErrorCode, message: String) -> Self {
        match code {
            ManagerErrorCode::Rejected => Self::Rejected(message),
            ManagerErrorCode::PermissionDenied => Self::PermissionDenied(message),
            ManagerErrorCode::UnknownTransfer => Self::UnknownTransfer(message),
        }
    }
}

/// Outbound operations on the transfer manager
///
/// Implementations must be callable concurrently from many request tasks.
#[async_trait]
pub trait TransferManager: Send + Sync {
    /// Ask the transfer manager to begin a transfer; returns its id
    async fn start_transfer(&self, request: StartTransfer) -> Result<TransferId, ManagerError>;

    /// Ask the transfer manager to abandon a transfer
    async fn cancel_transfer(&self, id: TransferId, explanation: &str) -> Result<(), ManagerError>;

    /// Fetch the current status of a transfer
    async fn query_status(&self, id: TransferId) -> Result<TransferStatus, ManagerError>;
}
