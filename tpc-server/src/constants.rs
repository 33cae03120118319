//! Server constants

use std::time::Duration;

/// Startup banner prefix (followed by the crate version)
pub const MSG_BANNER: &str = "Third-party copy daemon v";

/// Listening message prefix
pub const MSG_LISTENING: &str = "Listening for copy requests on ";

/// Shutdown message
pub const MSG_SHUTDOWN_RECEIVED: &str = "Shutdown signal received";

/// Error prefix for a failed bind
pub const ERR_BIND_FAILED: &str = "Failed to bind to ";

/// Error prefix for a failed transfer manager connection
pub const ERR_TRANSFER_MANAGER: &str = "Failed to connect to transfer manager at ";

/// Logged when the transfer manager connection ends
pub const ERR_TRANSFER_MANAGER_LOST: &str = "Lost connection to transfer manager, shutting down";

/// Error prefix for a failed accept
pub const ERR_ACCEPT: &str = "Failed to accept connection: ";

/// Error prefix for a failed client connection
pub const ERR_CONNECTION: &str = "Connection error from ";

/// Signal handler installation failures
pub const ERR_SIGNAL_SIGTERM: &str = "Failed to setup SIGTERM handler";
pub const ERR_SIGNAL_SIGINT: &str = "Failed to setup SIGINT handler";
pub const ERR_SIGNAL_CTRLC: &str = "Failed to listen for Ctrl+C";

/// Default interval between performance markers
pub const DEFAULT_MARKER_PERIOD: Duration = Duration::from_secs(5);

/// Default timeout for a request to the transfer manager
pub const DEFAULT_MANAGER_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How long a notification for a not-yet-registered transfer is kept
pub const DEFAULT_NOTIFICATION_GRACE: Duration = Duration::from_secs(30);

/// Request headers starting with this prefix (any case) are forwarded to the
/// remote endpoint with the prefix removed
pub const TRANSFER_HEADER_PREFIX: &str = "transferheader";

/// Buffer size hint given to the data mover (1 MiB)
pub const TRANSFER_BUFFER_SIZE: u32 = 1024 * 1024;

/// TCP buffer size for GridFTP transfers (1 MiB)
pub const GSIFTP_TCP_BUFFER_SIZE: u32 = 1024 * 1024;

/// Explanation sent with the cancel request when the client disconnects
pub const CANCEL_EXPLANATION: &str = "client went away";

/// Final line written after a successful transfer
pub const SUCCESS_LINE: &str = "success: Created";
