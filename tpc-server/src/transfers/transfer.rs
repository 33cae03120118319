//! A single third-party transfer
//!
//! `RemoteTransfer` is built from a client's `CopyRequest`. Construction
//! resolves the transport and builds the protocol descriptor, so an
//! unusable request is refused before anything reaches the transfer manager.
//! Once started, the request task stays in `await_completion` sending
//! performance markers until the registry delivers a terminal outcome.

use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

use tpc_common::auth::{Restriction, Subject};
use tpc_common::protocol::{StartTransfer, TransferStatus};
use tpc_common::protocol_info::ProtocolInfo;
use tpc_common::state::TransferState;
use tpc_common::{CredentialSource, FsPath, TransferId};

use crate::constants::CANCEL_EXPLANATION;
use crate::transfer_manager::TransferManager;

use super::errors::TransferError;
use super::headers::build_transfer_headers;
use super::marker::{send_marker, send_terminal_line};
use super::protocol_info::{
    ProtocolInfoParams, TransferType, build_protocol_info, resolve_transfer_type,
};
use super::types::{ConnectionProbe, CopyRequest, Direction, TransferFlags, TransferOutcome};

/// Explanation used when the completion slot closes without an outcome
const ABANDONED: &str = "transfer abandoned";

/// A validated transfer request, ready to be started
#[derive(Debug)]
pub struct RemoteTransfer {
    direction: Direction,
    path: FsPath,
    remote: Url,
    subject: Subject,
    restriction: Restriction,
    transfer_type: TransferType,
    credential_source: CredentialSource,
    /// Identifies the credential in logs without exposing it
    credential_fingerprint: Option<String>,
    protocol_info: ProtocolInfo,
}

impl RemoteTransfer {
    /// Validate `request` and build its protocol descriptor
    ///
    /// Fails with a client error if the scheme is unknown, the URL has no
    /// host, or the transport cannot carry the offered credential.
    pub fn new(request: &CopyRequest) -> Result<Self, TransferError> {
        let headers = build_transfer_headers(&request.headers);
        let credential = request.credential.as_ref();
        let transfer_type = resolve_transfer_type(&request.remote, credential)?;
        let protocol_info = build_protocol_info(&ProtocolInfoParams {
            remote: &request.remote,
            credential,
            headers: &headers,
            flags: TransferFlags::with_verification(request.require_verification),
        })?;

        Ok(Self {
            direction: request.direction,
            path: request.path.clone(),
            remote: request.remote.clone(),
            subject: request.subject.clone(),
            restriction: request.restriction.clone(),
            transfer_type,
            credential_source: CredentialSource::of(credential),
            credential_fingerprint: credential.map(|c| c.fingerprint()),
            protocol_info,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn credential_source(&self) -> CredentialSource {
        self.credential_source
    }

    pub fn remote(&self) -> &Url {
        &self.remote
    }

    pub fn protocol_info(&self) -> &ProtocolInfo {
        &self.protocol_info
    }

    /// Ask the transfer manager to begin the transfer
    ///
    /// Nothing is registered here; on failure there is nothing to undo.
    pub async fn start(&self, manager: &dyn TransferManager) -> Result<TransferId, TransferError> {
        let request = StartTransfer {
            destination: self.remote.to_string(),
            path: self.path.clone(),
            is_store: self.direction.is_store(),
            protocol_info: self.protocol_info.clone(),
            subject: self.subject.clone(),
            restriction: self.restriction.clone(),
        };

        match manager.start_transfer(request).await {
            Ok(id) => {
                info!(
                    %id,
                    direction = %self.direction,
                    destination = %self.remote,
                    path = %self.path,
                    protocol = self.protocol_info.name(),
                    credential = %self.credential_source,
                    fingerprint = self.credential_fingerprint.as_deref().unwrap_or("-"),
                    "Transfer started"
                );
                Ok(id)
            }
            Err(e) => {
                warn!(
                    direction = %self.direction,
                    destination = %self.remote,
                    error = %e,
                    "Failed to start transfer"
                );
                Err(e.into())
            }
        }
    }

    /// Send performance markers until the transfer finishes
    ///
    /// Each tick queries the transfer manager, writes one marker, and
    /// cancels the transfer if the client has gone away. The wait between
    /// ticks ends early when `outcome_rx` fires, so at least one marker
    /// precedes the terminal line even for a transfer that already
    /// finished. Exactly one terminal line is written before returning.
    pub async fn await_completion<W, P>(
        &self,
        id: TransferId,
        manager: &dyn TransferManager,
        out: &mut W,
        probe: &P,
        mut outcome_rx: oneshot::Receiver<TransferOutcome>,
        period: Duration,
    ) -> TransferOutcome
    where
        W: AsyncWrite + Unpin + Send,
        P: ConnectionProbe + ?Sized,
    {
        let query_timeout = period / 2;

        let outcome = loop {
            let status = query_status(manager, id, query_timeout).await;
            if let Err(e) = send_marker(out, &status).await {
                debug!(%id, error = %e, "Failed to send performance marker");
            }

            if !probe.is_open() {
                cancel(manager, id, query_timeout).await;
            }

            match tokio::time::timeout(period, &mut outcome_rx).await {
                Ok(Ok(outcome)) => break outcome,
                Ok(Err(_)) => break TransferOutcome::Failure(ABANDONED.to_string()),
                Err(_) => {}
            }
        };

        match &outcome {
            TransferOutcome::Success => info!(%id, destination = %self.remote, "Transfer succeeded"),
            TransferOutcome::Failure(problem) => {
                info!(%id, destination = %self.remote, %problem, "Transfer failed")
            }
        }

        if let Err(e) = send_terminal_line(out, &outcome).await {
            debug!(%id, error = %e, "Failed to send final transfer status");
        }

        outcome
    }
}

/// Fetch the transfer's status, falling back to `UnknownId` on any failure
async fn query_status(manager: &dyn TransferManager, id: TransferId, limit: Duration) -> TransferStatus {
    let unknown = TransferStatus {
        state: TransferState::UnknownId.code(),
        mover: None,
    };

    match tokio::time::timeout(limit, manager.query_status(id)).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            warn!(%id, error = %e, "Failed to query transfer status");
            unknown
        }
        Err(_) => {
            warn!(%id, "Timed out querying transfer status");
            unknown
        }
    }
}

/// Best-effort cancel; the next tick tries again if the client is still gone
async fn cancel(manager: &dyn TransferManager, id: TransferId, limit: Duration) {
    debug!(%id, "Client went away, cancelling transfer");
    match tokio::time::timeout(limit, manager.cancel_transfer(id, CANCEL_EXPLANATION)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(%id, error = %e, "Failed to cancel transfer"),
        Err(_) => error!(%id, "Timed out cancelling transfer"),
    }
}
