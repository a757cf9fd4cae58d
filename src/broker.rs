//! Re-broadcast event fan-out.
//!
//! A [`Broker`] carries one inbound sequence to many concurrent,
//! cancelable subscribers. The contract every wait primitive builds on:
//!
//! - A subscriber obtained *before* a publish observes that value; one
//!   obtained *after* observes only later values. Subscribing is
//!   synchronous, so "subscribe, then trigger the action" leaves no gap
//!   in which an event can be missed (the two-step wait).
//! - Every subscriber observes the same sequence in the same order.
//! - Each subscriber has its own unbounded buffer; a slow consumer never
//!   blocks the producer or its peers.
//! - A subscription ends when its scope cancels (recv returns
//!   [`Error::Cancelled`]) or when the broker closes (recv returns
//!   `Ok(None)`).

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::scope::Scope;

// ============================================================================
// Broker
// ============================================================================

/// Single-producer, many-consumer re-broadcast observable.
pub struct Broker<T> {
    inner: Arc<Mutex<BrokerInner<T>>>,
}

struct BrokerInner<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    closed: bool,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broker<T> {
    /// Creates an open broker with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BrokerInner {
                subscribers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Registers a subscriber tied to `scope`.
    ///
    /// Registration is synchronous: once this returns, every subsequent
    /// [`publish`](Self::publish) is observed. On a closed broker the
    /// subscription yields `Ok(None)` immediately.
    #[must_use]
    pub fn subscribe(&self, scope: &Scope) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut inner = self.inner.lock();
            if !inner.closed {
                inner.subscribers.push(tx);
            }
            // closed: drop tx, the receiver ends right away
        }

        Subscription {
            rx,
            scope: scope.clone(),
        }
    }

    /// Closes the broker; every subscription observes end-of-stream after
    /// draining its buffer.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.subscribers.clear();
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T: Clone> Broker<T> {
    /// Publishes a value to every live subscriber.
    ///
    /// Subscribers whose receiving side is gone are pruned here.
    pub fn publish(&self, value: T) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// A subscriber's view of the broker sequence.
///
/// Dropping the subscription releases its buffer and detaches it from the
/// broker on the next publish.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    scope: Scope,
}

impl<T> Subscription<T> {
    /// Receives the next value.
    ///
    /// Returns `Ok(None)` when the broker closed (after the buffer is
    /// drained).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the subscription's scope ends.
    pub async fn recv(&mut self) -> Result<Option<T>> {
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => Err(Error::Cancelled),
            value = self.rx.recv() => Ok(value),
        }
    }

    /// Returns the scope this subscription is tied to.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_before_publish_observes() {
        let broker = Broker::new();
        let scope = Scope::root();

        let mut sub = broker.subscribe(&scope);
        broker.publish(1u32);

        assert_eq!(sub.recv().await.expect("recv"), Some(1));
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_values() {
        let broker = Broker::new();
        let scope = Scope::root();

        broker.publish(1u32);
        let mut sub = broker.subscribe(&scope);
        broker.publish(2u32);
        broker.close();

        assert_eq!(sub.recv().await.expect("recv"), Some(2));
        assert_eq!(sub.recv().await.expect("recv"), None);
    }

    #[tokio::test]
    async fn test_all_subscribers_same_order() {
        let broker = Broker::new();
        let scope = Scope::root();

        let mut a = broker.subscribe(&scope);
        let mut b = broker.subscribe(&scope);

        for i in 0..10u32 {
            broker.publish(i);
        }
        broker.close();

        for i in 0..10 {
            assert_eq!(a.recv().await.expect("recv"), Some(i));
            assert_eq!(b.recv().await.expect("recv"), Some(i));
        }
    }

    #[tokio::test]
    async fn test_slow_consumer_does_not_block_producer() {
        let broker = Broker::new();
        let scope = Scope::root();

        // Never read from this one.
        let _slow = broker.subscribe(&scope);
        let mut fast = broker.subscribe(&scope);

        for i in 0..1000u32 {
            broker.publish(i);
        }

        assert_eq!(fast.recv().await.expect("recv"), Some(0));
    }

    #[tokio::test]
    async fn test_cancelled_scope_ends_subscription() {
        let broker: Broker<u32> = Broker::new();
        let scope = Scope::root();

        let mut sub = broker.subscribe(&scope);
        scope.cancel();

        let result = sub.recv().await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_subscribe_after_close_ends_immediately() {
        let broker: Broker<u32> = Broker::new();
        broker.close();

        let scope = Scope::root();
        let mut sub = broker.subscribe(&scope);
        assert_eq!(sub.recv().await.expect("recv"), None);
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let broker = Broker::new();
        let scope = Scope::root();

        let sub = broker.subscribe(&scope);
        assert_eq!(broker.subscriber_count(), 1);

        drop(sub);
        broker.publish(1u32);
        assert_eq!(broker.subscriber_count(), 0);
    }
}
