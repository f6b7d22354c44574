// SPDX-License-Identifier: GPL-3.0-only

//! Frame-ready notifications
//!
//! Sources keep a [`Notifier`] with one bounded channel per subscriber.
//! Consumers hold a [`Subscription`] which unregisters itself on drop.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use futures::channel::mpsc;
use tracing::{debug, trace};

use super::FrameSource;
use crate::constants::timing::NOTIFY_CHANNEL_CAPACITY;

/// Sent to subscribers each time the source captured a new frame set
#[derive(Debug, Clone, Copy)]
pub struct FrameNotification {
    /// Source frame sequence number
    pub sequence: u64,
    /// When the source published the frame set
    pub timestamp: Instant,
}

pub type NotifySender = mpsc::Sender<FrameNotification>;
pub type NotifyReceiver = mpsc::Receiver<FrameNotification>;

/// Identifier of a registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Subscriber list shared by source implementations
#[derive(Debug, Default)]
pub struct Notifier {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, NotifySender)>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sender: NotifySender) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((id, sender));
        }
        debug!(id = id.0, "Subscriber registered");
        id
    }

    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(id = id.0, "Subscriber unregistered");
        }
        removed
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a notification to every subscriber
    ///
    /// A full channel drops the notification (the subscriber will pick up
    /// the latest frame on its next cycle anyway). Disconnected subscribers
    /// are removed.
    pub fn notify(&self, notification: FrameNotification) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain_mut(|(id, sender)| match sender.try_send(notification) {
            Ok(()) => true,
            Err(e) if e.is_full() => {
                trace!(id = id.0, sequence = notification.sequence, "Subscriber busy, dropping notification");
                true
            }
            Err(_) => {
                debug!(id = id.0, "Subscriber disconnected");
                false
            }
        });
    }
}

/// Active registration against a frame source
///
/// Dropping the subscription unregisters it.
pub struct Subscription<'a> {
    source: &'a dyn FrameSource,
    id: SubscriptionId,
    receiver: NotifyReceiver,
    active: bool,
}

impl<'a> Subscription<'a> {
    /// Subscribe to frame notifications from `source`
    pub fn new(source: &'a dyn FrameSource) -> Self {
        let (sender, receiver) = mpsc::channel(NOTIFY_CHANNEL_CAPACITY);
        let id = source.register(sender);
        Self {
            source,
            id,
            receiver,
            active: true,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Take the next pending notification without blocking
    pub fn try_next(&mut self) -> Option<FrameNotification> {
        self.receiver.try_recv().ok()
    }

    /// Unregister from the source
    pub fn cancel(&mut self) {
        if self.active {
            self.active = false;
            self.source.unregister(self.id);
            self.receiver.close();
        }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.cancel();
    }
}
