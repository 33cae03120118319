//! Identity and restrictions attached to a transfer request
//!
//! The request layer authenticates the client and hands the orchestrator a
//! `Subject` plus the `Restriction` that applies to the session. Both travel
//! to the transfer manager unchanged.

use serde::{Deserialize, Serialize};

use crate::path::FsPath;

/// Authenticated identity of the requesting client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub username: String,
    pub uid: u32,
    #[serde(default)]
    pub gids: Vec<u32>,
}

impl Subject {
    pub fn new(username: impl Into<String>, uid: u32, gids: Vec<u32>) -> Self {
        Self {
            username: username.into(),
            uid,
            gids,
        }
    }
}

/// What a transfer does to the storage namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// Data is read out of storage
    Download,
    /// Data is written into storage
    Upload,
}

/// Limits on what the session may do, beyond plain namespace permissions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Restriction {
    #[default]
    Unrestricted,
    /// Reads only, any upload is refused
    ReadOnly,
    /// Only paths under one of these prefixes may be touched
    Prefixes { paths: Vec<FsPath> },
}

impl Restriction {
    /// Whether `activity` on `path` is forbidden
    #[must_use]
    pub fn is_restricted(&self, activity: Activity, path: &FsPath) -> bool {
        match self {
            Self::Unrestricted => false,
            Self::ReadOnly => activity == Activity::Upload,
            Self::Prefixes { paths } => !paths.iter().any(|prefix| path.starts_with(prefix)),
        }
    }
}
