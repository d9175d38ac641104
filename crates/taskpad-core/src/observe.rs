//! Replay-latest value cell shared by the store and the form controllers.
//!
//! Every subscriber owns an unbounded channel. Publishing happens while the
//! cell lock is held, so writes are serialized and every live subscriber
//! receives each value in write order. A new subscriber is seeded with the
//! current value before it is registered.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug)]
pub struct Observable<T> {
    inner: Mutex<Shared<T>>,
}

#[derive(Debug)]
struct Shared<T> {
    current: T,
    subscribers: Vec<Sender<T>>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Shared {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.lock().current.clone()
    }

    /// Replaces the value and publishes it.
    pub fn set(&self, value: T) {
        let mut shared = self.inner.lock();
        shared.current = value;
        shared.publish();
    }

    /// Derives the next value from the current one under the lock.
    ///
    /// Returning `None` leaves the value alone and publishes nothing.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut shared = self.inner.lock();
        let Some(next) = f(&shared.current) else {
            return false;
        };
        shared.current = next;
        shared.publish();
        true
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        let mut shared = self.inner.lock();
        // The receiver is still alive, so this cannot fail.
        let _ = tx.send(shared.current.clone());
        shared.subscribers.push(tx);
        Subscription { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl<T: Default + Clone> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> Shared<T> {
    fn publish(&mut self) {
        let value = &self.current;
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            trace!(pruned, "dropped closed subscribers");
        }
    }
}

/// Receiving end of an [`Observable`].
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next pending value, if one was published since the last read.
    pub fn try_next(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Every pending value, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Skips to the newest pending value.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::Observable;

    #[test]
    fn subscribe_replays_current_value() {
        let cell = Observable::new(1);
        cell.set(2);
        let sub = cell.subscribe();
        assert_eq!(sub.drain(), vec![2]);
    }

    #[test]
    fn every_subscriber_sees_every_write_in_order() {
        let cell = Observable::new(0);
        let first = cell.subscribe();
        let second = cell.subscribe();
        cell.set(1);
        cell.set(2);
        assert_eq!(first.drain(), vec![0, 1, 2]);
        assert_eq!(second.drain(), vec![0, 1, 2]);
    }

    #[test]
    fn update_returning_none_publishes_nothing() {
        let cell = Observable::new(5);
        let sub = cell.subscribe();
        assert_eq!(sub.try_next(), Some(5));
        assert!(!cell.update(|_| None));
        assert_eq!(sub.try_next(), None);
        assert!(cell.update(|v| Some(v + 1)));
        assert_eq!(sub.latest(), Some(6));
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_publish() {
        let cell = Observable::new("a".to_string());
        let kept = cell.subscribe();
        drop(cell.subscribe());
        assert_eq!(cell.subscriber_count(), 2);
        cell.set("b".to_string());
        assert_eq!(cell.subscriber_count(), 1);
        assert_eq!(kept.latest().as_deref(), Some("b"));
    }
}
