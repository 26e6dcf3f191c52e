//! Typed publish/subscribe channels.
//!
//! A [`Subscription`] is the only handle a consumer holds on a channel;
//! dropping it unsubscribes. Views keep their subscriptions as fields so that
//! teardown releases every callback path at once.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct Channel<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Channel<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to every live subscriber. Publishing with no subscribers is not
    /// an error.
    pub fn publish(&self, value: T) {
        let _ = self.tx.send(value);
    }

    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next value. Returns `None` once every publisher is gone.
    /// A lagging subscriber skips to the oldest retained value.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Subscriber lagged, skipped {} values", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_next(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_subscription_unsubscribes() {
        let channel: Channel<u32> = Channel::new();
        let sub = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);
        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
        channel.publish(1);
    }

    #[test]
    fn subscribers_see_values_in_order() {
        let channel = Channel::new();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();
        channel.publish("x");
        channel.publish("y");
        assert_eq!(a.drain(), vec!["x", "y"]);
        assert_eq!(b.try_next(), Some("x"));
    }

    #[test]
    fn lagging_subscriber_keeps_latest() {
        let channel = Channel::with_capacity(2);
        let mut sub = channel.subscribe();
        for i in 0..5 {
            channel.publish(i);
        }
        assert_eq!(sub.drain(), vec![3, 4]);
    }
}
