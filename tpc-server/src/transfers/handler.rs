//! Remote transfer orchestrator
//!
//! Accepts copy requests, starts them on the transfer manager, tracks them
//! in the registry while the request task streams markers, and routes the
//! transfer manager's completion notifications to the waiting task.

use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, error, warn};

use tpc_common::TransferId;
use tpc_common::protocol::ManagerNotification;

use crate::transfer_manager::TransferManager;

use super::errors::TransferError;
use super::registry::{ActiveTransfer, Delivery, TransferRegistry, TransferRegistryGuard};
use super::transfer::RemoteTransfer;
use super::types::{ConnectionProbe, CopyRequest, HandlerConfig, TransferOutcome};

const DUPLICATE_ID: &str = "duplicate transfer id";

/// Entry point for remote transfers
pub struct RemoteTransferHandler {
    manager: Arc<dyn TransferManager>,
    registry: TransferRegistry,
    config: HandlerConfig,
}

impl RemoteTransferHandler {
    pub fn new(manager: Arc<dyn TransferManager>, config: HandlerConfig) -> Self {
        Self {
            manager,
            registry: TransferRegistry::new(config.notification_grace),
            config,
        }
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Run a copy request to completion
    ///
    /// Markers and the terminal line are written to `out`. Returns once the
    /// transfer has finished, or immediately with a `TransferError` if it
    /// could not be set up; in that case nothing was written to `out`.
    pub async fn accept_request<W, P>(
        &self,
        out: &mut W,
        probe: &P,
        request: CopyRequest,
    ) -> Result<TransferOutcome, TransferError>
    where
        W: AsyncWrite + Unpin + Send,
        P: ConnectionProbe + ?Sized,
    {
        if request
            .restriction
            .is_restricted(request.direction.activity(), &request.path)
        {
            warn!(
                user = %request.subject.username,
                direction = %request.direction,
                path = %request.path,
                "Transfer refused by restriction"
            );
            return Err(TransferError::PermissionDenied);
        }

        let transfer = RemoteTransfer::new(&request)?;
        let id = transfer.start(self.manager.as_ref()).await?;

        let (active, outcome_rx) =
            ActiveTransfer::new(id, transfer.direction(), transfer.remote().to_string());
        if !self.registry.put(active) {
            error!(%id, "Transfer manager reused an active transfer id");
            if let Err(e) = self.manager.cancel_transfer(id, DUPLICATE_ID).await {
                error!(%id, error = %e, "Failed to cancel duplicate transfer");
            }
            return Err(TransferError::Rejected(DUPLICATE_ID.to_string()));
        }
        let _guard = TransferRegistryGuard::new(&self.registry, id);

        let outcome = transfer
            .await_completion(
                id,
                self.manager.as_ref(),
                out,
                probe,
                outcome_rx,
                self.config.marker_period,
            )
            .await;

        Ok(outcome)
    }

    /// The transfer manager reports that transfer `id` succeeded
    pub fn transfer_complete(&self, id: TransferId) {
        self.deliver(id, TransferOutcome::Success);
    }

    /// The transfer manager reports that transfer `id` failed
    pub fn transfer_failed(&self, id: TransferId, error: impl Into<String>) {
        self.deliver(id, TransferOutcome::Failure(error.into()));
    }

    /// Route a notification from the transfer manager
    pub fn handle_notification(&self, notification: ManagerNotification) {
        match notification {
            ManagerNotification::TransferComplete { id } => self.transfer_complete(id),
            ManagerNotification::TransferFailed { id, error } => self.transfer_failed(id, error),
        }
    }

    fn deliver(&self, id: TransferId, outcome: TransferOutcome) {
        match self.registry.deliver(id, outcome) {
            Delivery::Delivered => debug!(%id, "Transfer outcome delivered"),
            Delivery::AlreadyFinished => debug!(%id, "Ignoring repeated outcome for finished transfer"),
            Delivery::Parked => debug!(%id, "Outcome for unregistered transfer parked"),
            Delivery::Stale => debug!(%id, "Ignoring outcome for recently finished transfer"),
        }
    }
}
