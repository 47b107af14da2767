//! Debounced value: a live value that commits after a quiet period.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default idle time before a search term is committed
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds the value as typed (`live`) and the value downstream consumers see
/// (`committed`). Each `set` cancels the pending commit and restarts the timer,
/// so only the last keystroke's timer can fire. Dropping the value cancels any
/// pending commit.
pub struct Debounced<T> {
    delay: Duration,
    live: T,
    committed: Arc<watch::Sender<T>>,
    pending: Option<JoinHandle<()>>,
}

impl<T> Debounced<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Must be called inside a tokio runtime once `set` is used
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            delay,
            live: initial,
            committed: Arc::new(tx),
            pending: None,
        }
    }

    pub fn live(&self) -> &T {
        &self.live
    }

    pub fn committed(&self) -> T {
        self.committed.borrow().clone()
    }

    /// Receiver that wakes on every committed change
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.committed.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn set(&mut self, value: T) {
        self.cancel();
        self.live = value.clone();

        let committed = Arc::clone(&self.committed);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!("Debounce timer fired");
            commit(&committed, value);
        }));
    }

    /// Commit the live value now (e.g. the user pressed enter)
    pub fn flush(&mut self) {
        self.cancel();
        commit(&self.committed, self.live.clone());
    }

    /// Set live and committed together, skipping the timer
    pub fn reset(&mut self, value: T) {
        self.cancel();
        self.live = value.clone();
        commit(&self.committed, value);
    }

    /// Drop the pending commit, if any. The live value is kept.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Only notify subscribers when the value actually changes
fn commit<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
