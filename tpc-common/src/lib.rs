//! Third-party copy common library
//!
//! Shared types and the wire protocol spoken between the transfer
//! orchestrator, its clients and the transfer manager.

pub mod auth;
mod credential;
pub mod io;
pub mod path;
pub mod protocol;
pub mod protocol_info;
pub mod state;

pub use credential::{BearerCredential, Credential, CredentialSource, X509Credential};
pub use path::{FsPath, FsPathError};
pub use protocol::TransferId;

/// Default port for copy requests to the daemon
pub const DEFAULT_PORT: u16 = 7600;

/// Default port of the transfer manager
pub const DEFAULT_TRANSFER_MANAGER_PORT: u16 = 7601;
