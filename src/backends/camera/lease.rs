// SPDX-License-Identifier: GPL-3.0-only

//! Scoped frame acquisition
//!
//! A [`FrameLease`] is the only way a frame leaves a source. It derefs to the
//! [`CameraFrame`] and releases it on drop, so every exit path of a frame
//! update (early returns and `?` included) gives the frame back.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{trace, warn};

use super::FrameSource;
use super::types::{CameraFrame, FrameId};

/// Exclusive access to one acquired frame
pub struct FrameLease<'a> {
    source: &'a dyn FrameSource,
    id: FrameId,
    frame: CameraFrame,
}

impl<'a> FrameLease<'a> {
    pub fn new(source: &'a dyn FrameSource, id: FrameId, frame: CameraFrame) -> Self {
        Self { source, id, frame }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }
}

impl std::ops::Deref for FrameLease<'_> {
    type Target = CameraFrame;

    fn deref(&self) -> &CameraFrame {
        &self.frame
    }
}

impl std::fmt::Debug for FrameLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLease")
            .field("source", &self.source.name())
            .field("id", &self.id)
            .field("frame", &self.frame)
            .finish()
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        trace!(source = self.source.name(), id = self.id.0, "Releasing frame");
        self.source.release(self.id);
    }
}

/// Bookkeeping of outstanding leases for a source
#[derive(Debug, Default)]
pub struct LeaseLedger {
    next_id: AtomicU64,
    outstanding: Mutex<HashSet<FrameId>>,
    released: AtomicU64,
}

impl LeaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a new acquisition
    pub fn acquire(&self) -> FrameId {
        let id = FrameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut outstanding) = self.outstanding.lock() {
            outstanding.insert(id);
        }
        id
    }

    /// Mark an acquisition as returned
    pub fn release(&self, id: FrameId) {
        let removed = self
            .outstanding
            .lock()
            .map(|mut outstanding| outstanding.remove(&id))
            .unwrap_or(false);
        if removed {
            self.released.fetch_add(1, Ordering::Relaxed);
        } else {
            warn!(id = id.0, "Release of unknown or already released frame");
        }
    }

    /// Number of leases currently held
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Total number of leases ever released
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }
}
