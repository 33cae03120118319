//! Third-party transfers
//!
//! A client asks for a file to be copied between storage and a remote
//! endpoint. The data itself is moved by the transfer manager; this module
//! sets the transfer up and keeps the client informed:
//!
//! 1. Check the caller's restriction for the requested direction
//! 2. Resolve the transport from the remote URL and build its descriptor
//! 3. Start the transfer on the transfer manager and register its id
//! 4. Send a performance marker every marker period until a notification
//!    ends the transfer (or cancel it if the client goes away)
//! 5. Send `success: Created` or `failure: <explanation>` and unregister

mod errors;
mod handler;
mod headers;
mod marker;
mod protocol_info;
mod registry;
mod transfer;
mod types;

pub use errors::{ErrorResponse, TransferError};
pub use handler::RemoteTransferHandler;
pub use headers::build_transfer_headers;
pub use marker::{format_marker, format_terminal_line};
pub use protocol_info::{
    ProtocolInfoError, ProtocolInfoParams, TransferType, build_protocol_info,
    resolve_transfer_type,
};
pub use registry::{ActiveTransfer, Delivery, TransferRegistry, TransferRegistryGuard};
pub use transfer::RemoteTransfer;
pub use types::{
    ConnectionProbe, CopyRequest, Direction, HandlerConfig, TransferFlag, TransferFlags,
    TransferOutcome,
};
