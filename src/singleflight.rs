//! Single Flight Module
//!
//! Collapses concurrent calls for the same key into one execution. The
//! first caller becomes the leader and runs the task; callers that join
//! while it is in flight wait and receive a clone of the leader's result.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;

type CallMap<T> = Mutex<HashMap<String, watch::Receiver<Option<T>>>>;

// == Single Flight ==
/// Per-key duplicate suppression for async work.
///
/// Results (including errors) are broadcast to every waiter, so `T` must be
/// cloneable. If a leader is cancelled before publishing, its flight is
/// retired and one of the waiters takes over as the new leader.
pub struct SingleFlight<T> {
    calls: CallMap<T>,
}

enum Role<T> {
    Leader(watch::Sender<Option<T>>),
    Follower(watch::Receiver<Option<T>>),
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    // == Work ==
    /// Runs `task` for `key`, unless a flight for `key` is already under
    /// way, in which case the caller waits for that flight's result.
    pub async fn work<F, Fut>(&self, key: &str, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let sender = loop {
            let role = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(receiver) => Role::Follower(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        calls.insert(key.to_string(), receiver);
                        Role::Leader(sender)
                    }
                }
            };

            match role {
                Role::Leader(sender) => break sender,
                Role::Follower(mut receiver) => {
                    // A closed channel means the leader vanished without a
                    // result; loop to join (or lead) a fresh flight.
                    if let Ok(value) = receiver.wait_for(|value| value.is_some()).await {
                        if let Some(value) = value.as_ref() {
                            return value.clone();
                        }
                    }
                }
            }
        };

        // Retire the flight even if this future is dropped mid-task.
        let guard = FlightGuard {
            calls: &self.calls,
            key,
        };
        let value = task().await;
        drop(guard);
        let _ = sender.send(Some(value.clone()));
        value
    }

    /// Number of flights currently in the air.
    #[allow(dead_code)]
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Removes the flight's map entry when the leader finishes or is dropped.
struct FlightGuard<'a, T> {
    calls: &'a CallMap<T>,
    key: &'a str,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}
