//! Await-with-deadline combinator.
//!
//! Some platform signals (service worker readiness in particular) are not
//! guaranteed to resolve on every browser. Racing them against a deadline
//! yields a tagged outcome the caller must handle, rather than a silently
//! empty value.

use std::future::Future;
use std::time::Duration;

/// Outcome of racing a future against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline<T> {
    /// The future resolved in time.
    Completed(T),
    /// The deadline elapsed first.
    TimedOut,
}

impl<T> Deadline<T> {
    /// Whether the deadline elapsed.
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// The completed value, if any.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }
}

/// Race `future` against `deadline`.
pub async fn with_deadline<F>(deadline: Duration, future: F) -> Deadline<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(value) => Deadline::Completed(value),
        Err(_) => Deadline::TimedOut,
    }
}
