//! Correlation registry: the request/reply rendezvous point.
//!
//! The registry maps correlation IDs to pending waiters so a reply consumed
//! from the bus can resume the HTTP call that published the matching request.
//! All three mutation paths -- gateway insert, dispatcher remove-on-complete,
//! and expiry remove-on-timeout -- go through `DashMap`'s atomic entry and
//! remove operations, so completion and expiry can never both win.

use std::time::Duration;

use calcbus_core::{CorrelationId, OperationReply};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

// ---------------------------------------------------------------------------
// Waiter
// ---------------------------------------------------------------------------

/// The in-flight handle representing a caller blocked on one correlation ID.
///
/// Exists only between registration and first resolution; the registry
/// removes the matching entry exactly once, by whichever of reply-arrival
/// or deadline-expiry happens first.
#[derive(Debug)]
pub struct Waiter {
    id: CorrelationId,
    rx: oneshot::Receiver<OperationReply>,
}

impl Waiter {
    /// The correlation ID this waiter is registered under.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Returned by [`CorrelationRegistry::register`] when the ID is already live.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("correlation id already registered: {0}")]
pub struct DuplicateCorrelationId(pub CorrelationId);

/// Terminal non-reply outcomes of [`CorrelationRegistry::await_reply`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline elapsed before any reply arrived.
    #[error("no reply received within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The pending entry was dropped without a reply (registry cleared).
    #[error("request abandoned before a reply arrived")]
    Abandoned,
}

// ---------------------------------------------------------------------------
// CorrelationRegistry
// ---------------------------------------------------------------------------

/// Concurrent map from correlation ID to the oneshot sender that resumes
/// the registered waiter.
///
/// Owned by the composition root and injected into the gateway and the
/// dispatcher; its lifecycle is scoped to service start/stop, never ambient
/// global state.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    pending: DashMap<CorrelationId, oneshot::Sender<OperationReply>>,
}

impl CorrelationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Registers a waiter for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateCorrelationId`] when a waiter for `id` is already
    /// live; at most one outstanding request may use a given ID.
    pub fn register(&self, id: CorrelationId) -> Result<Waiter, DuplicateCorrelationId> {
        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => Err(DuplicateCorrelationId(id)),
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                Ok(Waiter { id, rx })
            }
        }
    }

    /// Resolves the waiter for `id` with `reply`, if one is still pending.
    ///
    /// Removal and resolution are a single atomic check-and-remove, so a
    /// concurrently expiring waiter observes either the reply or the
    /// timeout, never both. An absent entry (already timed out, or never
    /// seen) is expected and merely logged.
    ///
    /// Returns `true` when a waiter was resolved.
    pub fn complete(&self, id: &CorrelationId, reply: OperationReply) -> bool {
        match self.pending.remove(id) {
            Some((_, tx)) => {
                // Send can only fail if the waiter was dropped mid-flight;
                // the reply is discarded either way.
                let _ = tx.send(reply);
                true
            }
            None => {
                debug!(correlation_id = %id, "discarding reply with no pending waiter");
                false
            }
        }
    }

    /// Blocks until the waiter resolves or `timeout` elapses.
    ///
    /// The wait is a true cancellable suspension (timer raced against the
    /// oneshot), not polling. On expiry the pending entry is removed before
    /// returning, guaranteeing the reply/timeout race has exactly one
    /// winner; if completion won the removal first, the in-flight reply is
    /// still delivered.
    ///
    /// # Errors
    ///
    /// [`WaitError::Timeout`] when the deadline fires first, or
    /// [`WaitError::Abandoned`] when the entry was dropped without a reply.
    pub async fn await_reply(
        &self,
        mut waiter: Waiter,
        timeout: Duration,
    ) -> Result<OperationReply, WaitError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(timeout, &mut waiter.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_closed)) => {
                self.pending.remove(&waiter.id);
                Err(WaitError::Abandoned)
            }
            Err(_elapsed) => {
                if self.pending.remove(&waiter.id).is_some() {
                    Err(WaitError::Timeout { timeout_ms })
                } else {
                    // Completion removed the entry before we could: its send
                    // is imminent or already done, so the reply wins.
                    match waiter.rx.await {
                        Ok(reply) => Ok(reply),
                        Err(_closed) => Err(WaitError::Timeout { timeout_ms }),
                    }
                }
            }
        }
    }

    /// Removes the entry for `id` if present. Idempotent; safe to call on
    /// every gateway exit path, including after resolution.
    pub fn deregister(&self, id: &CorrelationId) {
        self.pending.remove(id);
    }

    /// Number of requests currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops every pending entry, waking all blocked waiters with
    /// [`WaitError::Abandoned`]. Used during shutdown drain.
    pub fn clear(&self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use calcbus_core::OperationKind;

    use super::*;

    fn reply_for(id: &str) -> OperationReply {
        OperationReply::success(
            CorrelationId::from(id),
            OperationKind::Add,
            BigDecimal::from_str("5").unwrap(),
        )
    }

    #[test]
    fn register_then_duplicate_fails() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.register(CorrelationId::from("x")).unwrap();
        assert_eq!(waiter.correlation_id().as_str(), "x");

        let err = registry.register(CorrelationId::from("x")).unwrap_err();
        assert_eq!(err, DuplicateCorrelationId(CorrelationId::from("x")));
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn distinct_ids_coexist() {
        let registry = CorrelationRegistry::new();
        let _a = registry.register(CorrelationId::from("a")).unwrap();
        let _b = registry.register(CorrelationId::from("b")).unwrap();
        assert_eq!(registry.pending_count(), 2);
    }

    #[tokio::test]
    async fn complete_resolves_waiter_with_exact_reply() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.register(CorrelationId::from("x")).unwrap();

        assert!(registry.complete(&CorrelationId::from("x"), reply_for("x")));
        assert_eq!(registry.pending_count(), 0);

        let reply = registry
            .await_reply(waiter, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, reply_for("x"));
    }

    #[test]
    fn complete_unknown_id_is_a_noop() {
        let registry = CorrelationRegistry::new();
        assert!(!registry.complete(&CorrelationId::from("ghost"), reply_for("ghost")));
    }

    #[tokio::test]
    async fn timeout_removes_entry_and_late_reply_is_discarded() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.register(CorrelationId::from("slow")).unwrap();

        let err = registry
            .await_reply(waiter, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));
        assert_eq!(registry.pending_count(), 0);

        // Reply arriving after expiry finds no waiter and has no effect.
        assert!(!registry.complete(&CorrelationId::from("slow"), reply_for("slow")));
    }

    #[tokio::test]
    async fn reply_before_deadline_wins() {
        let registry = Arc::new(CorrelationRegistry::new());
        let waiter = registry.register(CorrelationId::from("fast")).unwrap();

        let completer = Arc::clone(&registry);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            completer.complete(&CorrelationId::from("fast"), reply_for("fast"));
        });

        let reply = registry
            .await_reply(waiter, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(reply, reply_for("fast"));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_completions_resolve_each_waiter_once() {
        let registry = Arc::new(CorrelationRegistry::new());
        let mut waiters = Vec::new();
        for i in 0..32 {
            waiters.push(
                registry
                    .register(CorrelationId::from(format!("id-{i}")))
                    .unwrap(),
            );
        }

        let mut handles = Vec::new();
        for i in 0..32 {
            let completer = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let id = CorrelationId::from(format!("id-{i}"));
                completer.complete(&id, reply_for(id.as_str()));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for waiter in waiters {
            let id = waiter.correlation_id().clone();
            let reply = registry
                .await_reply(waiter, Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(reply.correlation_id(), &id);
        }
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn clear_wakes_waiter_with_abandoned() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.register(CorrelationId::from("x")).unwrap();

        registry.clear();

        let err = registry
            .await_reply(waiter, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, WaitError::Abandoned);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = CorrelationRegistry::new();
        let _waiter = registry.register(CorrelationId::from("x")).unwrap();

        registry.deregister(&CorrelationId::from("x"));
        registry.deregister(&CorrelationId::from("x"));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn id_is_reusable_after_deregistration() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.register(CorrelationId::from("x")).unwrap();
        drop(waiter);
        registry.deregister(&CorrelationId::from("x"));

        assert!(registry.register(CorrelationId::from("x")).is_ok());
    }
}
