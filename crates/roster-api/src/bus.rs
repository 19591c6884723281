//! Broadcast-based fan-out of [`DirectoryEvent`]s to live subscriptions.
//!
//! One bounded ring is shared by every subscriber. Publishing never waits:
//! a subscriber that falls more than `capacity` events behind loses the
//! oldest ones and resumes from the oldest event still retained. Nothing is
//! replayed to subscribers that attach after an event was published.

use std::{
  pin::Pin,
  task::{Context, Poll, ready},
};

use futures::{Stream, stream::FusedStream};
use roster_core::event::{DirectoryEvent, Topic};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

/// Default ring capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process publish/subscribe bus. Cloning yields another handle to the
/// same bus.
#[derive(Clone)]
pub struct EventBus {
  tx: broadcast::Sender<DirectoryEvent>,
}

impl EventBus {
  pub fn new() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }

  pub fn with_capacity(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  /// Hand `event` to every current subscriber. Non-blocking.
  ///
  /// Returns the number of subscriptions that will see it; 0 when nobody is
  /// listening, in which case the event is simply dropped.
  pub fn publish(&self, event: DirectoryEvent) -> usize {
    let topic = event.topic();
    let delivered = self.tx.send(event).unwrap_or(0);
    tracing::debug!(?topic, delivered, "published event");
    delivered
  }

  /// Attach a new subscription that yields every `topic` event published
  /// from now on.
  pub fn subscribe(&self, topic: Topic) -> Subscription {
    Subscription {
      topic,
      inner: Some(BroadcastStream::new(self.tx.subscribe())),
    }
  }

  /// Number of live subscriptions across all topics.
  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

impl Default for EventBus {
  fn default() -> Self { Self::new() }
}

/// One subscriber's view of the bus: an ordered, non-restartable stream.
///
/// Once it yields `None` (closed, or every bus handle dropped) it stays
/// finished. Dropping it detaches from the bus immediately.
pub struct Subscription {
  topic: Topic,
  inner: Option<BroadcastStream<DirectoryEvent>>,
}

impl Subscription {
  pub fn topic(&self) -> Topic { self.topic }

  /// Detach from the bus; no further events are delivered.
  pub fn close(&mut self) { self.inner = None; }
}

impl Stream for Subscription {
  type Item = DirectoryEvent;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this  = self.get_mut();
    let topic = this.topic;

    loop {
      let Some(inner) = this.inner.as_mut() else {
        return Poll::Ready(None);
      };

      match ready!(Pin::new(inner).poll_next(cx)) {
        Some(Ok(event)) if event.topic() == topic => return Poll::Ready(Some(event)),
        Some(Ok(_)) => continue,
        Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
          tracing::warn!(?topic, skipped, "subscriber lagged; oldest events dropped");
        }
        None => {
          this.inner = None;
          return Poll::Ready(None);
        }
      }
    }
  }
}

impl FusedStream for Subscription {
  fn is_terminated(&self) -> bool { self.inner.is_none() }
}
