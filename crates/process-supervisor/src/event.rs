//! State-update notifications and their delivery
//!
//! Both supervisor components emit a single kind of notification on any
//! lifecycle transition. Delivery is decoupled from emission: every
//! subscriber owns an unbounded channel, emission enqueues without blocking,
//! and subscribers whose receiving end is gone are pruned on the next send.

use crate::group::ProcessGroup;
use crate::process::ManagedProcess;
use async_channel::{Receiver, Sender};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Notification that a managed process went through a lifecycle transition
///
/// The payload is a handle to the process itself; subscribers read whatever
/// they need (state, pid) from the handle. By the time a subscriber looks,
/// the state may already have moved on again.
#[derive(Debug, Clone)]
pub struct ProcessUpdate {
    /// The process that changed state
    pub process: ManagedProcess,
    /// When the transition happened
    pub at: DateTime<Utc>,
}

impl ProcessUpdate {
    pub(crate) fn new(process: ManagedProcess) -> Self {
        Self {
            process,
            at: Utc::now(),
        }
    }
}

/// Notification that a process group re-derived its state
///
/// Carries both the group and the member whose own update triggered the
/// re-derivation, so observers can tell a group-level shift apart from a
/// member that merely changed.
#[derive(Debug, Clone)]
pub struct GroupUpdate {
    /// The group that re-derived its state
    pub group: ProcessGroup,
    /// The member whose transition triggered this update
    pub member: ManagedProcess,
    /// When the re-derivation happened
    pub at: DateTime<Utc>,
}

impl GroupUpdate {
    pub(crate) fn new(group: ProcessGroup, member: ManagedProcess) -> Self {
        Self {
            group,
            member,
            at: Utc::now(),
        }
    }
}

/// Fan-out of one component's notifications to any number of subscribers
pub(crate) struct Subscribers<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber and hand back its receiving end
    pub(crate) fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = async_channel::unbounded();
        self.senders.lock().unwrap().push(tx);
        rx
    }

    /// Enqueue an update for every live subscriber
    ///
    /// Channels are unbounded, so a send only fails once the receiver has
    /// been dropped; such subscribers are pruned here.
    pub(crate) fn send(&self, update: T) {
        self.senders
            .lock()
            .unwrap()
            .retain(|tx| tx.try_send(update.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_out_reaches_every_subscriber() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        let first = subscribers.subscribe();
        let second = subscribers.subscribe();

        subscribers.send(7);
        assert_eq!(first.try_recv().unwrap(), 7);
        assert_eq!(second.try_recv().unwrap(), 7);
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_send() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        let first = subscribers.subscribe();
        let second = subscribers.subscribe();
        assert_eq!(subscribers.subscriber_count(), 2);

        drop(first);
        subscribers.send(8);
        assert_eq!(subscribers.subscriber_count(), 1);
        assert_eq!(second.try_recv().unwrap(), 8);
    }

    #[test]
    fn send_without_subscribers_is_fine() {
        let subscribers: Subscribers<u32> = Subscribers::new();
        subscribers.send(9);
        assert_eq!(subscribers.subscriber_count(), 0);
    }
}
