//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use url::Url;

use tpc_common::auth::{Restriction, Subject};
use tpc_common::protocol::{MoverInfo, StartTransfer, TransferStatus};
use tpc_common::{Credential, FsPath, TransferId};
use tpc_server::transfer_manager::{ManagerError, TransferManager};
use tpc_server::transfers::{ConnectionProbe, CopyRequest, Direction, HandlerConfig};

/// Transfer manager that answers from a script and records every call
pub struct ScriptedManager {
    start_result: Result<TransferId, ManagerError>,
    /// When set, each start takes the next id from here instead
    next_id: Option<AtomicU64>,
    status_result: Result<TransferStatus, ManagerError>,
    status_delay: Option<Duration>,
    pub starts: Mutex<Vec<StartTransfer>>,
    pub cancels: Mutex<Vec<(TransferId, String)>>,
    pub queries: AtomicUsize,
}

impl ScriptedManager {
    /// Starts every transfer under `id` and reports it running
    pub fn starting(id: u64) -> Self {
        Self {
            start_result: Ok(TransferId::new(id)),
            next_id: None,
            status_result: Ok(running_status()),
            status_delay: None,
            starts: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Starts transfers under `first`, `first + 1`, ... in call order
    pub fn sequential(first: u64) -> Self {
        Self {
            next_id: Some(AtomicU64::new(first)),
            ..Self::starting(0)
        }
    }

    /// Refuses every start with `err`
    pub fn failing_start(err: ManagerError) -> Self {
        Self {
            start_result: Err(err),
            ..Self::starting(0)
        }
    }

    pub fn with_status_result(mut self, result: Result<TransferStatus, ManagerError>) -> Self {
        self.status_result = result;
        self
    }

    /// Delay every status reply by `delay`
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.lock().unwrap().len()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferManager for ScriptedManager {
    async fn start_transfer(&self, request: StartTransfer) -> Result<TransferId, ManagerError> {
        self.starts.lock().unwrap().push(request);
        match &self.next_id {
            Some(next) => Ok(TransferId::new(next.fetch_add(1, Ordering::SeqCst))),
            None => self.start_result.clone(),
        }
    }

    async fn cancel_transfer(&self, id: TransferId, explanation: &str) -> Result<(), ManagerError> {
        self.cancels
            .lock()
            .unwrap()
            .push((id, explanation.to_string()));
        Ok(())
    }

    async fn query_status(&self, _id: TransferId) -> Result<TransferStatus, ManagerError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        self.status_result.clone()
    }
}

/// Connection probe whose answer the test controls
pub struct FlagProbe {
    open: AtomicBool,
}

impl FlagProbe {
    pub fn open() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }

    pub fn closed() -> Self {
        Self {
            open: AtomicBool::new(false),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl ConnectionProbe for FlagProbe {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub fn running_status() -> TransferStatus {
    TransferStatus {
        state: 10,
        mover: Some(MoverInfo {
            start_time_ms: 1_360_578_000_000,
            last_transferred_ms: 1_360_578_930_000,
            transfer_time_ms: 930_000,
            bytes_transferred: 49_397_760,
            status: "Running".to_string(),
        }),
    }
}

pub fn config(marker_period: Duration) -> HandlerConfig {
    HandlerConfig {
        marker_period,
        notification_grace: Duration::from_secs(30),
    }
}

pub fn copy_request(
    direction: Direction,
    remote: &str,
    credential: Option<Credential>,
) -> CopyRequest {
    CopyRequest {
        headers: HashMap::from([(
            "TransferHeaderX-Trace".to_string(),
            "abc123".to_string(),
        )]),
        subject: Subject::new("alice", 1000, vec![1000]),
        restriction: Restriction::Unrestricted,
        path: FsPath::new("/data/alice/file.dat").unwrap(),
        remote: Url::parse(remote).unwrap(),
        credential,
        direction,
        require_verification: true,
    }
}

/// Read one line, without its newline
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> String {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.unwrap();
    assert!(n > 0, "unexpected end of stream");
    line.trim_end_matches('\n').to_string()
}

/// Read one marker block, `Perf Marker` through `End`
pub async fn read_marker<R: AsyncBufRead + Unpin>(reader: &mut R) -> Vec<String> {
    let first = read_line(reader).await;
    assert_eq!(first, "Perf Marker");
    let mut lines = vec![first];
    loop {
        let line = read_line(reader).await;
        let done = line == "End";
        lines.push(line);
        if done {
            return lines;
        }
    }
}

/// Count marker blocks in `text`
pub fn count_markers(text: &str) -> usize {
    text.lines().filter(|line| *line == "Perf Marker").count()
}
