//! Transfer registry for tracking in-flight remote transfers
//!
//! Maps the id assigned by the transfer manager to the completion slot of
//! the request task waiting on that transfer. Completion is signalled through
//! a oneshot channel so the registry lock is never held during I/O.
//!
//! A notification can overtake the start reply: the transfer manager may
//! report the end of a transfer before the request task has registered it.
//! Such notifications are parked for a grace period and replayed when the
//! transfer registers. A finished transfer leaves a tombstone for the same
//! period so that late duplicates are dropped instead of parked against a
//! future transfer that reuses the id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use tpc_common::TransferId;

use super::types::{Direction, TransferOutcome};

/// Registry-side view of a running transfer
///
/// Shared between the registry and the request task via Arc. The request
/// task owns the receiving end of the completion channel.
pub struct ActiveTransfer {
    pub id: TransferId,
    pub direction: Direction,
    /// Remote URL
    pub destination: String,
    /// Taken by the first terminal notification
    outcome_tx: Mutex<Option<oneshot::Sender<TransferOutcome>>>,
}

impl ActiveTransfer {
    /// Create the completion slot for a started transfer
    pub fn new(
        id: TransferId,
        direction: Direction,
        destination: String,
    ) -> (Arc<Self>, oneshot::Receiver<TransferOutcome>) {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let transfer = Arc::new(Self {
            id,
            direction,
            destination,
            outcome_tx: Mutex::new(Some(outcome_tx)),
        });
        (transfer, outcome_rx)
    }

    /// Record success and wake the waiting task
    ///
    /// Returns true if this call decided the outcome.
    pub fn success(&self) -> bool {
        self.finish(TransferOutcome::Success)
    }

    /// Record failure and wake the waiting task
    ///
    /// Returns true if this call decided the outcome.
    pub fn failure(&self, explanation: impl Into<String>) -> bool {
        self.finish(TransferOutcome::Failure(explanation.into()))
    }

    /// Whether a terminal outcome has been recorded
    pub fn is_finished(&self) -> bool {
        self.outcome_tx
            .lock()
            .expect("outcome_tx lock poisoned")
            .is_none()
    }

    fn finish(&self, outcome: TransferOutcome) -> bool {
        let mut guard = self.outcome_tx.lock().expect("outcome_tx lock poisoned");
        match guard.take() {
            // A dropped receiver means the waiter is gone; the outcome is
            // still decided.
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ActiveTransfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransfer")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("destination", &self.destination)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Result of delivering a notification to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The registered transfer took the outcome
    Delivered,
    /// The registered transfer had already finished
    AlreadyFinished,
    /// No transfer with that id; the outcome was parked
    Parked,
    /// The transfer with that id was recently unregistered; the outcome
    /// was dropped
    Stale,
}

struct ParkedOutcome {
    outcome: TransferOutcome,
    parked_at: Instant,
}

#[derive(Default)]
struct RegistryInner {
    transfers: HashMap<TransferId, Arc<ActiveTransfer>>,
    parked: HashMap<TransferId, ParkedOutcome>,
    /// Recently unregistered ids and when they were removed
    tombstones: HashMap<TransferId, Instant>,
}

impl RegistryInner {
    fn prune_parked(&mut self, grace: Duration) {
        self.parked
            .retain(|_, parked| parked.parked_at.elapsed() < grace);
        self.tombstones
            .retain(|_, removed_at| removed_at.elapsed() < grace);
    }
}

/// Registry for tracking in-flight remote transfers
///
/// Thread-safe registry that allows:
/// - Registering a transfer once the transfer manager assigned its id
/// - Looking up a transfer when a notification arrives
/// - Unregistering a transfer once its waiter observed completion
///
/// All operations take a single mutex which is held only for map access.
pub struct TransferRegistry {
    inner: Mutex<RegistryInner>,
    grace: Duration,
}

impl TransferRegistry {
    /// Create an empty registry that parks early notifications for `grace`
    pub fn new(grace: Duration) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            grace,
        }
    }

    /// Register a started transfer
    ///
    /// If a notification for this id arrived early it is applied now. A
    /// tombstone left by an earlier transfer with the same id is cleared.
    /// Returns false, leaving the registry unchanged, if a transfer with
    /// the same id is already registered.
    pub fn put(&self, transfer: Arc<ActiveTransfer>) -> bool {
        let mut inner = self.inner.lock().expect("transfer registry lock poisoned");
        inner.prune_parked(self.grace);

        if inner.transfers.contains_key(&transfer.id) {
            return false;
        }
        inner.tombstones.remove(&transfer.id);
        if let Some(parked) = inner.parked.remove(&transfer.id) {
            transfer.finish(parked.outcome);
        }
        inner.transfers.insert(transfer.id, transfer);
        true
    }

    /// Look up a registered transfer
    pub fn get(&self, id: TransferId) -> Option<Arc<ActiveTransfer>> {
        self.inner
            .lock()
            .expect("transfer registry lock poisoned")
            .transfers
            .get(&id)
            .cloned()
    }

    /// Unregister a transfer (called once its waiter has seen completion)
    ///
    /// Outcomes for `id` delivered within the grace period afterwards are
    /// dropped.
    pub fn remove(&self, id: TransferId) -> Option<Arc<ActiveTransfer>> {
        let mut inner = self.inner.lock().expect("transfer registry lock poisoned");
        inner.prune_parked(self.grace);
        let removed = inner.transfers.remove(&id);
        if removed.is_some() {
            inner.tombstones.insert(id, Instant::now());
        }
        removed
    }

    /// Hand a terminal outcome to the transfer with `id`
    ///
    /// Lookup and parking happen under one lock so that a concurrent `put`
    /// either sees the parked outcome or is seen by this call.
    pub fn deliver(&self, id: TransferId, outcome: TransferOutcome) -> Delivery {
        let mut inner = self.inner.lock().expect("transfer registry lock poisoned");
        inner.prune_parked(self.grace);

        match inner.transfers.get(&id) {
            Some(transfer) => {
                if transfer.finish(outcome) {
                    Delivery::Delivered
                } else {
                    Delivery::AlreadyFinished
                }
            }
            None if inner.tombstones.contains_key(&id) => Delivery::Stale,
            None => {
                inner
                    .parked
                    .entry(id)
                    .or_insert_with(|| ParkedOutcome {
                        outcome,
                        parked_at: Instant::now(),
                    });
                Delivery::Parked
            }
        }
    }

    /// Number of registered transfers
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("transfer registry lock poisoned")
            .transfers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parked notifications still within the grace period
    pub fn parked_count(&self) -> usize {
        let mut inner = self.inner.lock().expect("transfer registry lock poisoned");
        inner.prune_parked(self.grace);
        inner.parked.len()
    }
}

/// RAII guard that unregisters a transfer when dropped
///
/// This ensures transfers are always unregistered even if the waiting task
/// returns early or is cancelled.
pub struct TransferRegistryGuard<'a> {
    registry: &'a TransferRegistry,
    id: TransferId,
}

impl<'a> TransferRegistryGuard<'a> {
    pub fn new(registry: &'a TransferRegistry, id: TransferId) -> Self {
        Self { registry, id }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }
}

impl Drop for TransferRegistryGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_secs(30);

    fn make_transfer(id: u64) -> (Arc<ActiveTransfer>, oneshot::Receiver<TransferOutcome>) {
        ActiveTransfer::new(
            TransferId::new(id),
            Direction::Push,
            "https://remote.example.org/file".to_string(),
        )
    }

    #[test]
    fn test_put_get_remove() {
        let registry = TransferRegistry::new(GRACE);
        let (transfer, _rx) = make_transfer(1);

        assert!(registry.put(transfer));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(TransferId::new(1)).is_some());
        assert!(registry.get(TransferId::new(2)).is_none());

        assert!(registry.remove(TransferId::new(1)).is_some());
        assert!(registry.is_empty());
        assert!(registry.remove(TransferId::new(1)).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = TransferRegistry::new(GRACE);
        let (first, _rx1) = make_transfer(5);
        let (second, _rx2) = make_transfer(5);

        assert!(registry.put(Arc::clone(&first)));
        assert!(!registry.put(second));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get(TransferId::new(5)).unwrap(), &first));
    }

    #[test]
    fn test_first_outcome_wins() {
        let registry = TransferRegistry::new(GRACE);
        let (transfer, mut rx) = make_transfer(7);
        registry.put(transfer);

        assert_eq!(
            registry.deliver(
                TransferId::new(7),
                TransferOutcome::Failure("disk full".to_string())
            ),
            Delivery::Delivered
        );
        assert_eq!(
            registry.deliver(TransferId::new(7), TransferOutcome::Success),
            Delivery::AlreadyFinished
        );

        assert_eq!(
            rx.try_recv().unwrap(),
            TransferOutcome::Failure("disk full".to_string())
        );
    }

    #[test]
    fn test_unknown_id_does_not_touch_others() {
        let registry = TransferRegistry::new(GRACE);
        let (transfer, mut rx) = make_transfer(1);
        registry.put(Arc::clone(&transfer));

        assert_eq!(
            registry.deliver(TransferId::new(99), TransferOutcome::Success),
            Delivery::Parked
        );

        assert!(!transfer.is_finished());
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_early_notification_replayed_on_put() {
        let registry = TransferRegistry::new(GRACE);
        registry.deliver(
            TransferId::new(3),
            TransferOutcome::Failure("refused".to_string()),
        );
        assert_eq!(registry.parked_count(), 1);

        let (transfer, mut rx) = make_transfer(3);
        registry.put(Arc::clone(&transfer));

        assert!(transfer.is_finished());
        assert_eq!(
            rx.try_recv().unwrap(),
            TransferOutcome::Failure("refused".to_string())
        );
        assert_eq!(registry.parked_count(), 0);
    }

    #[test]
    fn test_first_parked_outcome_wins() {
        let registry = TransferRegistry::new(GRACE);
        registry.deliver(TransferId::new(3), TransferOutcome::Success);
        registry.deliver(
            TransferId::new(3),
            TransferOutcome::Failure("late".to_string()),
        );

        let (transfer, mut rx) = make_transfer(3);
        registry.put(transfer);
        assert_eq!(rx.try_recv().unwrap(), TransferOutcome::Success);
    }

    #[test]
    fn test_parked_outcome_expires() {
        let registry = TransferRegistry::new(Duration::ZERO);
        registry.deliver(TransferId::new(3), TransferOutcome::Success);
        assert_eq!(registry.parked_count(), 0);

        let (transfer, mut rx) = make_transfer(3);
        registry.put(Arc::clone(&transfer));
        assert!(!transfer.is_finished());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_late_duplicate_after_remove_is_dropped() {
        let registry = TransferRegistry::new(GRACE);
        let (first, _rx) = make_transfer(7);
        registry.put(first);
        assert_eq!(
            registry.deliver(TransferId::new(7), TransferOutcome::Success),
            Delivery::Delivered
        );
        registry.remove(TransferId::new(7));

        assert_eq!(
            registry.deliver(
                TransferId::new(7),
                TransferOutcome::Failure("stale duplicate".to_string())
            ),
            Delivery::Stale
        );
        assert_eq!(registry.parked_count(), 0);

        // A new transfer reusing the id starts clean
        let (second, mut rx) = make_transfer(7);
        assert!(registry.put(Arc::clone(&second)));
        assert!(!second.is_finished());
        assert!(rx.try_recv().is_err());

        // and still receives its own outcome
        assert_eq!(
            registry.deliver(TransferId::new(7), TransferOutcome::Success),
            Delivery::Delivered
        );
    }

    #[test]
    fn test_tombstone_expires() {
        let registry = TransferRegistry::new(Duration::ZERO);
        let (transfer, _rx) = make_transfer(7);
        registry.put(transfer);
        registry.remove(TransferId::new(7));

        // With no grace period the outcome is parked, then pruned
        assert_eq!(
            registry.deliver(TransferId::new(7), TransferOutcome::Success),
            Delivery::Parked
        );
        assert_eq!(registry.parked_count(), 0);
    }

    #[test]
    fn test_finish_with_dropped_receiver() {
        let (transfer, rx) = make_transfer(1);
        drop(rx);

        assert!(transfer.success());
        assert!(transfer.is_finished());
        assert!(!transfer.failure("again"));
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let registry = TransferRegistry::new(GRACE);
        let (transfer, _rx) = make_transfer(1);
        registry.put(transfer);

        {
            let guard = TransferRegistryGuard::new(&registry, TransferId::new(1));
            assert_eq!(guard.id(), TransferId::new(1));
            assert_eq!(registry.len(), 1);
        }

        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_notifications_single_winner() {
        let registry = Arc::new(TransferRegistry::new(GRACE));
        let (transfer, mut rx) = make_transfer(11);
        registry.put(transfer);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let outcome = if i % 2 == 0 {
                        TransferOutcome::Success
                    } else {
                        TransferOutcome::Failure(format!("failure {i}"))
                    };
                    registry.deliver(TransferId::new(11), outcome)
                })
            })
            .collect();

        let delivered = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| *d == Delivery::Delivered)
            .count();

        assert_eq!(delivered, 1);
        assert!(rx.try_recv().is_ok());
    }
}
