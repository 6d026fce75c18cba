//! Stale-response guard.
//!
//! When a view re-requests data (filter changed, tab switched) before the
//! previous request finished, responses can resolve out of order. A
//! [`LatestOnly`] slot hands out a ticket per request and only stores the
//! result of the most recently issued one; anything older is discarded when
//! it arrives.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::warn;

/// Proof that a request was issued; pass it back with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// A value slot that only accepts the newest request's response.
pub struct LatestOnly<T> {
    issued: AtomicU64,
    value: Mutex<Option<T>>,
}

impl<T: Clone> LatestOnly<T> {
    /// An empty slot.
    pub fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            value: Mutex::new(None),
        }
    }

    /// Start a request. Every earlier ticket becomes stale.
    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the newest request.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }

    /// Store `value` if `ticket` is still current. Returns whether it was kept.
    pub async fn complete(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.value.lock().await;
        if !self.is_current(ticket) {
            warn!("Discarding stale response (ticket {:?})", ticket);
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Issue a ticket, await `request`, and keep its result if nothing newer
    /// was issued meanwhile.
    ///
    /// Returns `Ok(None)` for a superseded request, whether it succeeded or
    /// failed: a stale error must not overwrite fresher state either.
    pub async fn run<E, Fut>(&self, request: Fut) -> Result<Option<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = self.issue();
        let outcome = request.await;
        if !self.is_current(ticket) {
            warn!("Discarding stale response (ticket {:?})", ticket);
            return Ok(None);
        }
        let value = outcome?;
        Ok(self.complete(ticket, value.clone()).await.then_some(value))
    }

    /// The last accepted value.
    pub async fn current(&self) -> Option<T> {
        self.value.lock().await.clone()
    }
}

impl<T: Clone> Default for LatestOnly<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    #[tokio::test]
    async fn test_out_of_order_responses_keep_newest() {
        let slot = LatestOnly::new();
        let older = slot.issue();
        let newer = slot.issue();

        assert!(slot.complete(newer, "fresh").await);
        assert!(!slot.complete(older, "stale").await);
        assert_eq!(slot.current().await, Some("fresh"));
    }

    #[tokio::test]
    async fn test_in_order_responses() {
        let slot = LatestOnly::new();
        let first = slot.issue();
        assert!(slot.complete(first, 1).await);
        let second = slot.issue();
        assert!(slot.complete(second, 2).await);
        assert_eq!(slot.current().await, Some(2));
    }

    /// Spawn a `run` whose request waits for `release`; returns once the
    /// request has started (and so holds the older ticket).
    async fn spawn_slow(
        slot: &Arc<LatestOnly<u32>>,
        outcome: Result<u32, String>,
    ) -> (oneshot::Sender<()>, JoinHandle<Result<Option<u32>, String>>) {
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let slot = slot.clone();
        let handle = tokio::spawn(async move {
            slot.run(async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                outcome
            })
            .await
        });
        started_rx.await.unwrap();
        (release_tx, handle)
    }

    #[tokio::test]
    async fn test_run_discards_superseded_request() {
        let slot = Arc::new(LatestOnly::<u32>::new());
        let (release, slow) = spawn_slow(&slot, Ok(1)).await;

        let fast = slot.run(async { Ok::<_, String>(2) }).await.unwrap();
        assert_eq!(fast, Some(2));

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), Ok(None));
        assert_eq!(slot.current().await, Some(2));
    }

    #[tokio::test]
    async fn test_run_stale_error_is_dropped() {
        let slot = Arc::new(LatestOnly::<u32>::new());
        let (release, slow) = spawn_slow(&slot, Err("timeout".to_string())).await;

        slot.run(async { Ok::<_, String>(5) }).await.unwrap();

        release.send(()).unwrap();
        assert_eq!(slow.await.unwrap(), Ok(None));
        assert_eq!(slot.current().await, Some(5));
    }

    #[tokio::test]
    async fn test_run_current_error_is_returned() {
        let slot = LatestOnly::<u32>::new();
        let result = slot.run(async { Err::<u32, _>("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert_eq!(slot.current().await, None);
    }
}
