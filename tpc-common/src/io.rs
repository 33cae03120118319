//! I/O utilities for newline-delimited JSON
//!
//! Both the transfer manager connection and the daemon's request port carry
//! one JSON document per line. This module is the interface between those
//! documents and the byte stream.

use std::io;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::ManagerFrame;

/// Maximum length of a single JSON line, including the newline
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Time allowed for a client to send its request line
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Writing
// =============================================================================

/// Serialize `value` as one line and flush it
pub async fn write_json_line<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut line =
        serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

/// Send a frame on the transfer manager connection
pub async fn write_frame<W>(writer: &mut W, frame: &ManagerFrame) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_json_line(writer, frame).await
}

// =============================================================================
// Reading
// =============================================================================

/// Read one line and parse it as JSON
///
/// Returns `Ok(None)` if the connection was cleanly closed before any byte
/// of a new line arrived. Blank lines are skipped.
pub async fn read_json_line<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = (&mut *reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            if line.len() >= MAX_LINE_LENGTH {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {MAX_LINE_LENGTH} bytes"),
                ));
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-line",
            ));
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        return serde_json::from_slice(&line)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid JSON: {e}")));
    }
}

/// Read one line with a deadline for the whole line
pub async fn read_json_line_with_timeout<R, T>(
    reader: &mut R,
    timeout: Duration,
) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    tokio::time::timeout(timeout, read_json_line(reader))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out reading line"))?
}

/// Read a frame from the transfer manager connection
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<ManagerFrame>>
where
    R: AsyncBufRead + Unpin,
{
    read_json_line(reader).await
}
