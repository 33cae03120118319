//! Type definitions for remote transfer handling
//!
//! Contains shared structs, enums and traits used across the transfer module.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use url::Url;

use tpc_common::auth::{Activity, Restriction, Subject};
use tpc_common::{Credential, FsPath};

use crate::constants::{DEFAULT_MARKER_PERIOD, DEFAULT_NOTIFICATION_GRACE};

/// Direction in which data travels relative to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fetch data from the remote site into storage
    Pull,
    /// Send data from storage to the remote site
    Push,
}

impl Direction {
    /// Whether the transfer writes into storage
    pub fn is_store(&self) -> bool {
        *self == Self::Pull
    }

    /// Namespace activity this direction performs
    pub fn activity(&self) -> Activity {
        match self {
            Self::Pull => Activity::Upload,
            Self::Push => Activity::Download,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Optional behaviour requested for a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferFlag {
    /// The remote endpoint must supply a checksum that is verified
    RequireVerification = 1,
}

/// Set of `TransferFlag`s
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferFlags(u8);

impl TransferFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    /// Flags for a request that does or does not ask for verification
    pub fn with_verification(require_verification: bool) -> Self {
        let mut flags = Self::empty();
        if require_verification {
            flags.insert(TransferFlag::RequireVerification);
        }
        flags
    }

    pub fn insert(&mut self, flag: TransferFlag) {
        self.0 |= flag as u8;
    }

    pub fn contains(&self, flag: TransferFlag) -> bool {
        self.0 & flag as u8 != 0
    }
}

/// A client's request for a third-party copy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRequest {
    /// Raw request headers; only transfer headers are forwarded
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub subject: Subject,
    #[serde(default)]
    pub restriction: Restriction,
    /// File in storage
    pub path: FsPath,
    /// Remote endpoint
    pub remote: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    pub direction: Direction,
    #[serde(default = "default_require_verification")]
    pub require_verification: bool,
}

fn default_require_verification() -> bool {
    true
}

/// How a transfer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failure(String),
}

/// Non-blocking liveness probe for the client's connection
///
/// Supplied by the request layer. Implementations must not block and must
/// not write to the connection.
pub trait ConnectionProbe: Send + Sync {
    fn is_open(&self) -> bool;
}

/// Tunables for the remote transfer handler
#[derive(Debug, Clone, Copy)]
pub struct HandlerConfig {
    /// Interval between performance markers; status queries are bounded
    /// to half of it
    pub marker_period: Duration,
    /// How long an early notification waits for its transfer to register
    pub notification_grace: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            marker_period: DEFAULT_MARKER_PERIOD,
            notification_grace: DEFAULT_NOTIFICATION_GRACE,
        }
    }
}
