//! In-process change feed.
//!
//! Store backends publish every committed change here after the commit
//! succeeds; subscribers receive a clone of each change in publish order.
//! One feed exists per aggregate (the tickets collection, the raffle
//! singleton).
//!
//! A subscriber that falls more than `capacity` changes behind loses the
//! oldest ones. It is then told to [`Delivery::Resync`] and must re-read a full
//! snapshot from the store, which keeps every observer convergent without
//! making publishers wait on slow readers.

use tokio::sync::broadcast;

/// Default number of changes buffered per feed.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out broadcaster for one aggregate.
#[derive(Debug, Clone)]
pub struct ChangeFeed<T> {
  tx: broadcast::Sender<T>,
}

impl<T: Clone> ChangeFeed<T> {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Publish a committed change. A no-op when nobody is listening.
  pub fn publish(&self, change: T) {
    // `send` only fails when there are no receivers.
    let _ = self.tx.send(change);
  }

  /// Subscribe to every change published from now on.
  pub fn subscribe(&self) -> Subscription<T> {
    Subscription { rx: self.tx.subscribe() }
  }

  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

impl<T: Clone> Default for ChangeFeed<T> {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

/// One item delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T> {
  Change(T),
  /// `missed` changes were dropped; re-read a snapshot before continuing.
  Resync { missed: u64 },
}

/// A receiving handle on a [`ChangeFeed`].
#[derive(Debug)]
pub struct Subscription<T> {
  rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
  /// Wait for the next delivery. Returns `None` once the feed is closed.
  pub async fn recv(&mut self) -> Option<Delivery<T>> {
    match self.rx.recv().await {
      Ok(change) => Some(Delivery::Change(change)),
      Err(broadcast::error::RecvError::Lagged(missed)) => {
        tracing::warn!(missed, "change feed subscriber lagged");
        Some(Delivery::Resync { missed })
      }
      Err(broadcast::error::RecvError::Closed) => None,
    }
  }

  /// Non-blocking variant of [`Subscription::recv`]; `None` when nothing is
  /// pending or the feed is closed.
  pub fn try_recv(&mut self) -> Option<Delivery<T>> {
    match self.rx.try_recv() {
      Ok(change) => Some(Delivery::Change(change)),
      Err(broadcast::error::TryRecvError::Lagged(missed)) => {
        Some(Delivery::Resync { missed })
      }
      Err(_) => None,
    }
  }
}
