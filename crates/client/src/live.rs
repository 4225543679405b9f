//! Reference-counted registry for shared live feeds.
//!
//! Many independent consumers can want the same externally-keyed live feed
//! (a per-farm event stream, a status channel). The registry opens the
//! underlying resource on first interest and tears it down when the last
//! handle is dropped. Teardown is driven by reference counting, never by
//! timers, so consumer mount/unmount order is irrelevant.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

const FEED_CHANNEL_CAPACITY: usize = 64;

type Teardown = Box<dyn FnOnce() + Send>;

struct FeedEntry<M> {
    sender: broadcast::Sender<M>,
    refcount: usize,
    teardown: Option<Teardown>,
}

type FeedMap<M> = Arc<Mutex<HashMap<String, FeedEntry<M>>>>;

/// Process-wide map from feed key to one shared channel.
pub struct LiveFeedRegistry<M> {
    feeds: FeedMap<M>,
}

impl<M: Clone> Default for LiveFeedRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone> LiveFeedRegistry<M> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            feeds: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to the feed for `key`.
    ///
    /// On first interest, `open` is called with the feed's sender and returns
    /// the teardown to run once the last subscriber leaves. Later subscribers
    /// share the existing channel and `open` is not called again.
    pub fn subscribe<F>(&self, key: &str, open: F) -> LiveFeedHandle<M>
    where
        F: FnOnce(broadcast::Sender<M>) -> Teardown,
    {
        let mut feeds = lock(&self.feeds);
        let entry = feeds.entry(key.to_string()).or_insert_with(|| {
            let (sender, _) = broadcast::channel(FEED_CHANNEL_CAPACITY);
            let teardown = open(sender.clone());
            FeedEntry {
                sender,
                refcount: 0,
                teardown: Some(teardown),
            }
        });
        entry.refcount += 1;
        let receiver = entry.sender.subscribe();
        drop(feeds);

        LiveFeedHandle {
            key: key.to_string(),
            receiver,
            feeds: Arc::clone(&self.feeds),
        }
    }

    /// Broadcast a message to every subscriber of `key`. No-op when the feed
    /// is not open.
    pub fn publish(&self, key: &str, message: M) {
        let feeds = lock(&self.feeds);
        if let Some(entry) = feeds.get(key) {
            // Send only fails when no receiver is alive, which is fine.
            let _ = entry.sender.send(message);
        }
    }

    /// Number of currently open feeds.
    #[must_use]
    pub fn open_feeds(&self) -> usize {
        lock(&self.feeds).len()
    }
}

/// One consumer's membership in a feed. Dropping it releases the interest;
/// the last drop closes the feed and runs its teardown.
pub struct LiveFeedHandle<M> {
    key: String,
    receiver: broadcast::Receiver<M>,
    feeds: FeedMap<M>,
}

impl<M: Clone> LiveFeedHandle<M> {
    /// Receive the next message on this feed.
    ///
    /// # Errors
    ///
    /// Returns the broadcast error when the feed lags or closes.
    pub async fn recv(&mut self) -> Result<M, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

impl<M> Drop for LiveFeedHandle<M> {
    fn drop(&mut self) {
        let teardown = {
            let mut feeds = lock(&self.feeds);
            match feeds.get_mut(&self.key) {
                Some(entry) => {
                    entry.refcount -= 1;
                    if entry.refcount == 0 {
                        feeds.remove(&self.key).and_then(|entry| entry.teardown)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        // Run outside the lock; teardown may re-enter the registry.
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

fn lock<M>(feeds: &FeedMap<M>) -> std::sync::MutexGuard<'_, HashMap<String, FeedEntry<M>>> {
    feeds.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_registry_starts_empty() {
        let registry = LiveFeedRegistry::<String>::default();
        assert_eq!(registry.open_feeds(), 0);
    }

    #[tokio::test]
    async fn feed_opens_once_and_fans_out() {
        let registry: LiveFeedRegistry<String> = LiveFeedRegistry::new();
        let opens = Arc::new(AtomicUsize::new(0));

        let mut first = {
            let opens = Arc::clone(&opens);
            registry.subscribe("farm:1", move |_| {
                opens.fetch_add(1, Ordering::SeqCst);
                Box::new(|| {})
            })
        };
        let mut second = {
            let opens = Arc::clone(&opens);
            registry.subscribe("farm:1", move |_| {
                opens.fetch_add(1, Ordering::SeqCst);
                Box::new(|| {})
            })
        };

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        registry.publish("farm:1", "visit scheduled".to_string());
        assert_eq!(first.recv().await.unwrap(), "visit scheduled");
        assert_eq!(second.recv().await.unwrap(), "visit scheduled");
    }

    #[test]
    fn teardown_runs_on_last_drop_only() {
        let registry: LiveFeedRegistry<()> = LiveFeedRegistry::new();
        let teardowns = Arc::new(AtomicUsize::new(0));

        let open = |teardowns: &Arc<AtomicUsize>| {
            let teardowns = Arc::clone(teardowns);
            move |_sender: broadcast::Sender<()>| -> Teardown {
                Box::new(move || {
                    teardowns.fetch_add(1, Ordering::SeqCst);
                })
            }
        };

        let first = registry.subscribe("status", open(&teardowns));
        let second = registry.subscribe("status", open(&teardowns));
        assert_eq!(registry.open_feeds(), 1);

        drop(first);
        assert_eq!(teardowns.load(Ordering::SeqCst), 0);
        drop(second);
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(registry.open_feeds(), 0);
    }

    #[test]
    fn unordered_unmount_reopens_cleanly() {
        let registry: LiveFeedRegistry<()> = LiveFeedRegistry::new();
        let opens = Arc::new(AtomicUsize::new(0));

        let open = |opens: &Arc<AtomicUsize>| {
            let opens = Arc::clone(opens);
            move |_sender: broadcast::Sender<()>| -> Teardown {
                opens.fetch_add(1, Ordering::SeqCst);
                Box::new(|| {})
            }
        };

        let first = registry.subscribe("status", open(&opens));
        drop(first);
        let second = registry.subscribe("status", open(&opens));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        drop(second);
        assert_eq!(registry.open_feeds(), 0);
    }
}
