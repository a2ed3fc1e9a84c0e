//! Cancellation and deadline handling for in-flight requests.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Notify;

/// Cancellation token shared between a hook and the requests it issues.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Why a pending request did not produce its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut,
    Cancelled,
}

/// Counts requests currently holding a deadline.
#[derive(Clone, Default, Debug)]
pub struct RequestTracker {
    in_flight: Arc<AtomicUsize>,
}

impl RequestTracker {
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Open a handle for one request. The count drops when the handle is consumed or dropped.
    pub fn begin(&self, timeout: Duration, cancel: Option<CancelToken>) -> PendingRequest {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        PendingRequest {
            timeout,
            cancel,
            guard: InFlightGuard {
                counter: Arc::clone(&self.in_flight),
            },
        }
    }
}

struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Deadline and cancel token for exactly one request.
pub struct PendingRequest {
    timeout: Duration,
    cancel: Option<CancelToken>,
    guard: InFlightGuard,
}

impl PendingRequest {
    /// Drive `fut` until it completes, the deadline fires or the token is cancelled.
    ///
    /// Whichever loses the race is dropped here, so the timer never outlives the
    /// request and a timed-out request is aborted at the transport.
    pub async fn run<F, T>(self, fut: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        let PendingRequest {
            timeout,
            cancel,
            guard,
        } = self;

        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancelled => Err(Interrupted::Cancelled),
            out = fut => Ok(out),
            _ = tokio::time::sleep(timeout) => Err(Interrupted::TimedOut),
        };

        drop(guard);
        outcome
    }
}
