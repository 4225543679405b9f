//! In-flight request coalescing.
//!
//! Operations that must not run twice concurrently (worker registration,
//! token refresh) go through a [`SingleFlight`]: the first caller runs the
//! operation, every concurrent caller awaits the same result.

use std::future::Future;

use tokio::sync::{Mutex, watch};

enum Role<T> {
    Leader(watch::Sender<Option<T>>),
    Follower(watch::Receiver<Option<T>>),
}

/// Coalesces concurrent invocations of one logical operation.
///
/// The result type must be `Clone` because it is fanned out to every waiting
/// caller.
#[derive(Debug)]
pub struct SingleFlight<T> {
    in_flight: Mutex<Option<watch::Receiver<Option<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleFlight<T> {
    /// Create an idle coalescer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            in_flight: Mutex::const_new(None),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    /// Run `op`, or await the result of an already-running invocation.
    pub async fn run<F, Fut>(&self, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let role = {
            let mut slot = self.in_flight.lock().await;
            if let Some(rx) = slot.as_ref() {
                Role::Follower(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                *slot = Some(rx);
                Role::Leader(tx)
            }
        };

        match role {
            Role::Leader(tx) => {
                let value = op().await;
                let _ = tx.send(Some(value.clone()));
                self.in_flight.lock().await.take();
                value
            }
            Role::Follower(mut rx) => {
                if let Ok(published) = rx.wait_for(Option::is_some).await
                    && let Some(value) = published.as_ref()
                {
                    return value.clone();
                }
                // The leader was cancelled before publishing. Clear the stale
                // slot and run the operation ourselves.
                {
                    let mut slot = self.in_flight.lock().await;
                    if slot.as_ref().is_some_and(|rx| rx.has_changed().is_err()) {
                        slot.take();
                    }
                }
                op().await
            }
        }
    }
}
