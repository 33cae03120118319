//! Client connection handling
//!
//! A client opens a connection, sends one `CopyRequest` as a JSON line and
//! then reads performance markers until the terminal line. Setup failures
//! are answered with a single `error: <status> <message>` line.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tracing::{debug, info, warn};

use tpc_common::io::{DEFAULT_REQUEST_TIMEOUT, read_json_line_with_timeout};

use crate::transfers::{
    ConnectionProbe, CopyRequest, ErrorResponse, RemoteTransferHandler, TransferOutcome,
};

/// Liveness probe over the read half of a client's TCP connection
///
/// The client sends nothing after its request, so a readable EOF (or an
/// error) means it has gone away. Stray bytes are discarded. A client that
/// half-closes its write side but keeps reading is treated as gone, and its
/// transfer is cancelled.
pub struct TcpProbe {
    reader: OwnedReadHalf,
}

impl TcpProbe {
    pub fn new(reader: OwnedReadHalf) -> Self {
        Self { reader }
    }
}

impl ConnectionProbe for TcpProbe {
    fn is_open(&self) -> bool {
        let mut buf = [0u8; 64];
        match self.reader.try_read(&mut buf) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(_) => false,
        }
    }
}

/// Serve one copy request on `socket`
pub async fn handle_connection(
    socket: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<RemoteTransferHandler>,
) -> io::Result<()> {
    socket.set_nodelay(true)?;
    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);

    let request: CopyRequest =
        match read_json_line_with_timeout(&mut reader, DEFAULT_REQUEST_TIMEOUT).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(%peer_addr, "Client closed connection before sending a request");
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                let response = ErrorResponse {
                    status: 400,
                    message: format!("invalid request: {e}"),
                };
                return send_error(&mut write_half, &response).await;
            }
            Err(e) => return Err(e),
        };

    info!(
        %peer_addr,
        user = %request.subject.username,
        direction = %request.direction,
        remote = %request.remote,
        path = %request.path,
        "Copy request received"
    );

    let probe = TcpProbe::new(reader.into_inner());
    match handler
        .accept_request(&mut write_half, &probe, request)
        .await
    {
        Ok(TransferOutcome::Success) => {}
        Ok(TransferOutcome::Failure(problem)) => {
            debug!(%peer_addr, %problem, "Copy request finished with failure");
        }
        Err(e) => {
            if e.is_client_error() {
                info!(%peer_addr, status = e.status(), error = %e, "Copy request refused");
            } else {
                warn!(%peer_addr, status = e.status(), error = %e, "Copy request refused");
            }
            send_error(&mut write_half, &ErrorResponse::from(&e)).await?;
        }
    }

    write_half.shutdown().await
}

/// Write a setup error line and flush
pub async fn send_error<W>(out: &mut W, response: &ErrorResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(format!("error: {response}\n").as_bytes())
        .await?;
    out.flush().await
}
