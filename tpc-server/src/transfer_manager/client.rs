//! TCP client for the transfer manager
//!
//! One connection carries all traffic. Requests are queued to a writer task
//! and correlated with replies by `request_id`; a reader task completes the
//! pending request or forwards notifications to the caller's channel.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tpc_common::TransferId;
use tpc_common::io::{read_frame, write_frame};
use tpc_common::protocol::{
    ManagerFrame, ManagerNotification, ManagerReply, ManagerRequest, StartTransfer,
    TransferStatus,
};

use super::{ManagerError, TransferManager};

const CONNECTION_CLOSED: &str = "connection closed";

/// State shared between the client handle and its I/O tasks
#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<Uuid, oneshot::Sender<ManagerReply>>>,
    closed: AtomicBool,
}

impl Shared {
    fn register(&self, request_id: Uuid, tx: oneshot::Sender<ManagerReply>) -> Result<(), ManagerError> {
        let mut pending = self.pending.lock().expect("pending lock poisoned");
        if self.closed.load(Ordering::Acquire) {
            return Err(ManagerError::NoRoute(CONNECTION_CLOSED.to_string()));
        }
        pending.insert(request_id, tx);
        Ok(())
    }

    fn forget(&self, request_id: Uuid) {
        self.pending
            .lock()
            .expect("pending lock poisoned")
            .remove(&request_id);
    }

    fn complete(&self, request_id: Uuid, reply: ManagerReply) {
        let tx = self
            .pending
            .lock()
            .expect("pending lock poisoned")
            .remove(&request_id);
        match tx {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => debug!(%request_id, "Reply for unknown or expired request"),
        }
    }

    /// Mark the connection dead and fail every pending request
    fn close(&self) {
        let mut pending = self.pending.lock().expect("pending lock poisoned");
        self.closed.store(true, Ordering::Release);
        // Dropping the senders wakes the callers with a closed-channel error
        pending.clear();
    }
}

/// Transfer manager reached over a single TCP connection
pub struct TcpTransferManager {
    outbound: mpsc::UnboundedSender<ManagerFrame>,
    shared: Arc<Shared>,
    request_timeout: Duration,
}

impl TcpTransferManager {
    /// Connect to the transfer manager at `addr`
    ///
    /// Notifications received on the connection are sent to `notifications`.
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        request_timeout: Duration,
        notifications: mpsc::UnboundedSender<ManagerNotification>,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream, request_timeout, notifications))
    }

    /// Run the client over an already established stream
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_stream<S>(
        stream: S,
        request_timeout: Duration,
        notifications: mpsc::UnboundedSender<ManagerNotification>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        tokio::spawn(run_writer(writer, outbound_rx, Arc::clone(&shared)));
        tokio::spawn(run_reader(
            BufReader::new(reader),
            Arc::clone(&shared),
            notifications,
        ));

        Self {
            outbound,
            shared,
            request_timeout,
        }
    }

    async fn call(&self, body: ManagerRequest) -> Result<ManagerReply, ManagerError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.shared.register(request_id, tx)?;

        if self
            .outbound
            .send(ManagerFrame::Request { request_id, body })
            .is_err()
        {
            self.shared.forget(request_id);
            return Err(ManagerError::NoRoute(CONNECTION_CLOSED.to_string()));
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ManagerError::NoRoute(CONNECTION_CLOSED.to_string())),
            Err(_) => {
                self.shared.forget(request_id);
                Err(ManagerError::Timeout)
            }
        }
    }
}

#[async_trait]
impl TransferManager for TcpTransferManager {
    async fn start_transfer(&self, request: StartTransfer) -> Result<TransferId, ManagerError> {
        match self.call(ManagerRequest::StartTransfer(request)).await? {
            ManagerReply::TransferStarted { id } => Ok(id),
            ManagerReply::Error { code, message } => Err(ManagerError::from_reply(code, message)),
            other => Err(ManagerError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    async fn cancel_transfer(&self, id: TransferId, explanation: &str) -> Result<(), ManagerError> {
        let request = ManagerRequest::CancelTransfer {
            id,
            explanation: explanation.to_string(),
        };
        match self.call(request).await? {
            ManagerReply::Cancelled => Ok(()),
            ManagerReply::Error { code, message } => Err(ManagerError::from_reply(code, message)),
            other => Err(ManagerError::UnexpectedReply(format!("{other:?}"))),
        }
    }

    async fn query_status(&self, id: TransferId) -> Result<TransferStatus, ManagerError> {
        match self.call(ManagerRequest::QueryStatus { id }).await? {
            ManagerReply::Status(status) => Ok(status),
            ManagerReply::Error { code, message } => Err(ManagerError::from_reply(code, message)),
            other => Err(ManagerError::UnexpectedReply(format!("{other:?}"))),
        }
    }
}

async fn run_writer<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<ManagerFrame>,
    shared: Arc<Shared>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            error!("Failed to write to transfer manager: {e}");
            break;
        }
    }
    shared.close();
}

async fn run_reader<R>(
    mut reader: R,
    shared: Arc<Shared>,
    notifications: mpsc::UnboundedSender<ManagerNotification>,
) where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(ManagerFrame::Reply { request_id, body })) => shared.complete(request_id, body),
            Ok(Some(ManagerFrame::Notification { body })) => {
                if notifications.send(body).is_err() {
                    warn!("Dropping transfer manager notification: no receiver");
                }
            }
            Ok(Some(ManagerFrame::Request { request_id, .. })) => {
                warn!(%request_id, "Ignoring request frame from transfer manager");
            }
            Ok(None) => {
                info!("Transfer manager closed the connection");
                break;
            }
            Err(e) => {
                error!("Failed to read from transfer manager: {e}");
                break;
            }
        }
    }
    shared.close();
}
