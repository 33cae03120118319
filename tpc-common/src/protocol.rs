//! Protocol between the orchestrator and the transfer manager
//!
//! All frames are sent as newline-delimited JSON over a TCP connection.
//! The orchestrator sends `Request` frames and receives `Reply` frames
//! (correlated by `request_id`) and unsolicited `Notification` frames
//! announcing the end of a transfer.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Restriction, Subject};
use crate::path::FsPath;
use crate::protocol_info::ProtocolInfo;

/// Identifier assigned by the transfer manager when a transfer starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(u64);

impl TransferId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to start moving one file between storage and a remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTransfer {
    /// Remote URL
    pub destination: String,
    /// Path of the file in storage
    pub path: FsPath,
    /// `true` when data flows into storage (a pull)
    pub is_store: bool,
    pub protocol_info: ProtocolInfo,
    pub subject: Subject,
    #[serde(default)]
    pub restriction: Restriction,
}

/// Progress of the data mover handling a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoverInfo {
    /// Unix time in milliseconds at which the mover started
    pub start_time_ms: i64,
    /// Unix time in milliseconds of the last data movement
    pub last_transferred_ms: i64,
    /// Milliseconds the mover has been running
    pub transfer_time_ms: i64,
    pub bytes_transferred: u64,
    pub status: String,
}

/// Status of a transfer as reported by the transfer manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub state: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mover: Option<MoverInfo>,
}

/// Requests sent to the transfer manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagerRequest {
    StartTransfer(StartTransfer),
    CancelTransfer { id: TransferId, explanation: String },
    QueryStatus { id: TransferId },
}

/// Machine-readable reason for a refused request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerErrorCode {
    /// The transfer manager declined the request
    Rejected,
    /// The subject may not perform the transfer
    PermissionDenied,
    /// The id does not name a transfer the manager knows about
    UnknownTransfer,
}

/// Replies from the transfer manager, one per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagerReply {
    TransferStarted { id: TransferId },
    Cancelled,
    Status(TransferStatus),
    Error {
        code: ManagerErrorCode,
        message: String,
    },
}

/// Unsolicited messages from the transfer manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagerNotification {
    TransferComplete { id: TransferId },
    TransferFailed { id: TransferId, error: String },
}

impl ManagerNotification {
    pub fn id(&self) -> TransferId {
        match self {
            Self::TransferComplete { id } | Self::TransferFailed { id, .. } => *id,
        }
    }
}

/// A single line on the transfer manager connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ManagerFrame {
    Request {
        request_id: Uuid,
        body: ManagerRequest,
    },
    Reply {
        request_id: Uuid,
        body: ManagerReply,
    },
    Notification {
        body: ManagerNotification,
    },
}
