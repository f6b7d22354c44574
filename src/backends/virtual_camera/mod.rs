// SPDX-License-Identifier: GPL-3.0-only

//! Virtual frame sources
//!
//! Sources that need no sensor: a deterministic test-pattern generator and a
//! replay of a capture directory. Both publish a new frame set on every
//! [`tick`](SyntheticSource::tick), which is what a capture loop drives.

mod file_source;
mod synthetic;

pub use file_source::FileSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::backends::camera::notify::NotifySender;
use crate::backends::camera::{
    BackendResult, CameraFrame, FrameId, FrameKind, FrameLease, FrameNotification, FrameSource,
    LeaseLedger, Notifier, SubscriptionId,
};

/// Name selecting the synthetic source on the command line
pub const SYNTHETIC_SOURCE_NAME: &str = "synthetic";

/// Either virtual source, selected at runtime
#[derive(Debug)]
pub enum VirtualSource {
    Synthetic(SyntheticSource),
    File(FileSource),
}

impl VirtualSource {
    /// `"synthetic"` or a capture directory path
    pub fn open(name: &str, synthetic: SyntheticConfig) -> BackendResult<Self> {
        if name == SYNTHETIC_SOURCE_NAME {
            Ok(Self::Synthetic(SyntheticSource::new(synthetic)?))
        } else {
            Ok(Self::File(FileSource::open(Path::new(name))?))
        }
    }

    /// Publish the next frame set
    pub fn tick(&self) -> u64 {
        match self {
            Self::Synthetic(source) => source.tick(),
            Self::File(source) => source.tick(),
        }
    }

    pub fn ledger(&self) -> &LeaseLedger {
        match self {
            Self::Synthetic(source) => source.ledger(),
            Self::File(source) => source.ledger(),
        }
    }
}

impl FrameSource for VirtualSource {
    fn name(&self) -> &str {
        match self {
            Self::Synthetic(source) => source.name(),
            Self::File(source) => source.name(),
        }
    }

    fn try_acquire_latest(&self, kind: FrameKind) -> Option<FrameLease<'_>> {
        match self {
            Self::Synthetic(source) => source.try_acquire_latest(kind),
            Self::File(source) => source.try_acquire_latest(kind),
        }
    }

    fn release(&self, id: FrameId) {
        match self {
            Self::Synthetic(source) => source.release(id),
            Self::File(source) => source.release(id),
        }
    }

    fn register(&self, sender: NotifySender) -> SubscriptionId {
        match self {
            Self::Synthetic(source) => source.register(sender),
            Self::File(source) => source.register(sender),
        }
    }

    fn unregister(&self, id: SubscriptionId) -> bool {
        match self {
            Self::Synthetic(source) => source.unregister(id),
            Self::File(source) => source.unregister(id),
        }
    }
}

/// Latest published frame per kind plus per-kind availability
#[derive(Debug)]
struct FrameSlots {
    frames: Mutex<HashMap<FrameKind, CameraFrame>>,
    unavailable: Mutex<Vec<FrameKind>>,
    ledger: LeaseLedger,
    notifier: Notifier,
}

impl FrameSlots {
    fn new() -> Self {
        Self {
            frames: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(Vec::new()),
            ledger: LeaseLedger::new(),
            notifier: Notifier::new(),
        }
    }

    fn set_available(&self, kind: FrameKind, available: bool) {
        if let Ok(mut unavailable) = self.unavailable.lock() {
            unavailable.retain(|k| *k != kind);
            if !available {
                unavailable.push(kind);
            }
        }
    }

    fn is_available(&self, kind: FrameKind) -> bool {
        self.unavailable
            .lock()
            .map(|u| !u.contains(&kind))
            .unwrap_or(false)
    }

    /// Replace the latest frames and notify subscribers
    fn publish(&self, frames: Vec<(FrameKind, CameraFrame)>, sequence: u64) {
        if let Ok(mut slots) = self.frames.lock() {
            slots.extend(frames);
        }
        self.notifier.notify(FrameNotification {
            sequence,
            timestamp: Instant::now(),
        });
    }

    fn acquire<'a>(&self, source: &'a dyn FrameSource, kind: FrameKind) -> Option<FrameLease<'a>> {
        if !self.is_available(kind) {
            return None;
        }
        let frame = self.frames.lock().ok()?.get(&kind).cloned()?;
        let id = self.ledger.acquire();
        Some(FrameLease::new(source, id, frame))
    }

    fn release(&self, id: FrameId) {
        self.ledger.release(id);
    }
}
