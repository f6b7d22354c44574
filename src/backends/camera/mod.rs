// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction
//!
//! A frame source is the sensor-side collaborator of the monitor. It tells
//! subscribers when a new capture is ready and hands out the latest frame of
//! each kind as a scoped [`FrameLease`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   FrameMonitor      │
//! └──────────┬──────────┘
//!            │ subscribe / try_acquire_latest
//!            ▼
//! ┌─────────────────────┐
//! │  FrameSource Trait  │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌─────────┐  ┌──────────┐
//! │Synthetic│  │   File   │  ← Concrete implementations
//! └─────────┘  └──────────┘
//! ```

pub mod format_converters;
pub mod frame_loop;
pub mod lease;
pub mod notify;
pub mod types;

pub use lease::{FrameLease, LeaseLedger};
pub use notify::{FrameNotification, Notifier, Subscription, SubscriptionId};
pub use types::*;

/// Sensor-side frame provider
///
/// Implementations use interior mutability so a capture thread can publish
/// frames while the monitor acquires them from another thread.
pub trait FrameSource: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Try to acquire the latest frame of the given kind
    ///
    /// Returns `None` when no frame of that kind is ready. The returned lease
    /// releases the frame back to the source when dropped.
    fn try_acquire_latest(&self, kind: FrameKind) -> Option<FrameLease<'_>>;

    /// Return an acquired frame to the source
    ///
    /// Called by [`FrameLease`] on drop; not meant to be called directly.
    fn release(&self, id: FrameId);

    /// Register a notification channel, see [`Subscription::new`]
    fn register(&self, sender: notify::NotifySender) -> SubscriptionId;

    /// Remove a notification channel. Returns false if it was not registered.
    fn unregister(&self, id: SubscriptionId) -> bool;
}
