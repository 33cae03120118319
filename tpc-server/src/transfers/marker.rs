//! Performance markers
//!
//! While a transfer runs the client receives a marker block every marker
//! period, in the style of GridFTP performance markers:
//!
//! ```text
//! Perf Marker
//!     Timestamp: 1360578938
//!     State: 10
//!     State description: transfer running
//!     Stripe Index: 0
//!     Stripe Bytes Transferred: 49397760
//!     Total Stripe Count: 1
//! End
//! ```
//!
//! When the transfer ends a single `success: Created` or
//! `failure: <explanation>` line follows.

use std::fmt::Write as _;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use tpc_common::protocol::{MoverInfo, TransferStatus};
use tpc_common::state::describe_state;

use crate::constants::SUCCESS_LINE;

use super::types::TransferOutcome;

const MILLIS_PER_SECOND: i64 = 1000;

/// Render one marker block for `status` at `timestamp` (unix seconds)
pub fn format_marker(timestamp: i64, status: &TransferStatus) -> String {
    let mut marker = String::with_capacity(256);
    // Writing to a String cannot fail
    let _ = writeln!(marker, "Perf Marker");
    let _ = writeln!(marker, "    Timestamp: {timestamp}");
    let _ = writeln!(marker, "    State: {}", status.state);
    let _ = writeln!(marker, "    State description: {}", describe_state(status.state));
    let _ = writeln!(marker, "    Stripe Index: 0");
    if let Some(mover) = &status.mover {
        write_mover_info(&mut marker, mover);
    }
    let _ = writeln!(marker, "    Total Stripe Count: 1");
    let _ = writeln!(marker, "End");
    marker
}

fn write_mover_info(marker: &mut String, mover: &MoverInfo) {
    let _ = writeln!(
        marker,
        "    Stripe Start Time: {}",
        mover.start_time_ms / MILLIS_PER_SECOND
    );
    let _ = writeln!(
        marker,
        "    Stripe Last Transferred: {}",
        mover.last_transferred_ms / MILLIS_PER_SECOND
    );
    let _ = writeln!(
        marker,
        "    Stripe Transfer Time: {}",
        mover.transfer_time_ms / MILLIS_PER_SECOND
    );
    let _ = writeln!(
        marker,
        "    Stripe Bytes Transferred: {}",
        mover.bytes_transferred
    );
    let _ = writeln!(marker, "    Stripe Status: {}", mover.status);
}

/// Render the final line for `outcome`
pub fn format_terminal_line(outcome: &TransferOutcome) -> String {
    match outcome {
        TransferOutcome::Success => format!("{SUCCESS_LINE}\n"),
        TransferOutcome::Failure(problem) => format!("failure: {problem}\n"),
    }
}

/// Write a marker block stamped with the current time and flush
pub async fn send_marker<W>(out: &mut W, status: &TransferStatus) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let marker = format_marker(chrono::Utc::now().timestamp(), status);
    out.write_all(marker.as_bytes()).await?;
    out.flush().await
}

/// Write the final line and flush
pub async fn send_terminal_line<W>(out: &mut W, outcome: &TransferOutcome) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format_terminal_line(outcome).as_bytes()).await?;
    out.flush().await
}
