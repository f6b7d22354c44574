// SPDX-License-Identifier: GPL-3.0-only

//! Capture directory replay
//!
//! A capture directory holds one frame of each kind:
//!
//! - `color.png` / `color.jpg`: any 8-bit color image
//! - `depth.png`: 16-bit grayscale, millimeters (0 = no return)
//! - `confidence.png`: 8-bit grayscale category codes
//!
//! Missing files are fine; that kind is simply never ready. Every tick
//! republishes the same frames with a new sequence number.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::FrameSlots;
use crate::backends::camera::notify::NotifySender;
use crate::backends::camera::{
    BackendError, BackendResult, CameraFrame, FrameId, FrameKind, FrameLease, FrameSource,
    LeaseLedger, PixelFormat, SubscriptionId,
};
use crate::constants::depth::MM_PER_METER;
use crate::constants::file_formats::{
    COLOR_STEM, CONFIDENCE_FILE, DEPTH_FILE, IMAGE_EXTENSIONS, is_image_extension,
};

/// Frame source replaying a capture directory
#[derive(Debug)]
pub struct FileSource {
    name: String,
    dir: PathBuf,
    frames: Vec<(FrameKind, CameraFrame)>,
    sequence: AtomicU64,
    slots: FrameSlots,
}

impl FileSource {
    /// Load every frame found in `dir`
    pub fn open(dir: &Path) -> BackendResult<Self> {
        if !dir.is_dir() {
            return Err(BackendError::NotAvailable(format!(
                "capture directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut frames = Vec::new();
        if let Some(path) = find_color_file(dir) {
            frames.push((FrameKind::Color, load_color(&path)?));
        }
        let depth_path = dir.join(DEPTH_FILE);
        if depth_path.is_file() {
            frames.push((FrameKind::Depth, load_depth(&depth_path)?));
        }
        let confidence_path = dir.join(CONFIDENCE_FILE);
        if confidence_path.is_file() {
            frames.push((FrameKind::Confidence, load_confidence(&confidence_path)?));
        }

        if frames.is_empty() {
            return Err(BackendError::NotAvailable(format!(
                "no {}.{{{}}}, {} or {} in '{}'",
                COLOR_STEM,
                IMAGE_EXTENSIONS.join(","),
                DEPTH_FILE,
                CONFIDENCE_FILE,
                dir.display()
            )));
        }

        let kinds: Vec<String> = frames.iter().map(|(k, _)| k.to_string()).collect();
        info!(dir = %dir.display(), kinds = %kinds.join(","), "Capture directory loaded");

        Ok(Self {
            name: format!("file:{}", dir.display()),
            dir: dir.to_path_buf(),
            frames,
            sequence: AtomicU64::new(0),
            slots: FrameSlots::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Kinds present in the capture
    pub fn kinds(&self) -> Vec<FrameKind> {
        self.frames.iter().map(|(kind, _)| *kind).collect()
    }

    /// Republish the capture as the next frame set
    pub fn tick(&self) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frames = self
            .frames
            .iter()
            .map(|(kind, frame)| {
                let mut frame = frame.clone();
                frame.sequence = sequence;
                frame.captured_at = std::time::Instant::now();
                (*kind, frame)
            })
            .collect();
        debug!(sequence, "Capture republished");
        self.slots.publish(frames, sequence);
        sequence
    }

    pub fn ledger(&self) -> &LeaseLedger {
        &self.slots.ledger
    }
}

impl FrameSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_acquire_latest(&self, kind: FrameKind) -> Option<FrameLease<'_>> {
        self.slots.acquire(self, kind)
    }

    fn release(&self, id: FrameId) {
        self.slots.release(id);
    }

    fn register(&self, sender: NotifySender) -> SubscriptionId {
        self.slots.notifier.register(sender)
    }

    fn unregister(&self, id: SubscriptionId) -> bool {
        self.slots.notifier.unregister(id)
    }
}

fn find_color_file(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_stem().and_then(|s| s.to_str()) == Some(COLOR_STEM)
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(is_image_extension)
        })
        .collect();
    candidates.sort();
    if candidates.len() > 1 {
        warn!(chosen = %candidates[0].display(), "Several color images found");
    }
    candidates.into_iter().next()
}

fn open_image(path: &Path) -> BackendResult<image::DynamicImage> {
    image::open(path).map_err(|e| {
        BackendError::IoError(format!("Failed to load image '{}': {}", path.display(), e))
    })
}

fn load_color(path: &Path) -> BackendResult<CameraFrame> {
    let rgba = open_image(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!(path = %path.display(), width, height, "Color image loaded");
    Ok(CameraFrame::packed(width, height, PixelFormat::RGBA, rgba.into_raw(), 0))
}

fn load_depth(path: &Path) -> BackendResult<CameraFrame> {
    let img = open_image(path)?;
    if !matches!(img, image::DynamicImage::ImageLuma16(_)) {
        return Err(BackendError::FormatNotSupported(format!(
            "'{}' must be a 16-bit grayscale PNG in millimeters",
            path.display()
        )));
    }
    let mm = img.into_luma16();
    let (width, height) = mm.dimensions();
    let meters: Vec<f32> = mm
        .as_raw()
        .iter()
        .map(|&d| {
            if d == 0 {
                f32::NAN
            } else {
                d as f32 / MM_PER_METER
            }
        })
        .collect();
    debug!(path = %path.display(), width, height, "Depth map loaded");
    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::DepthF32,
        bytemuck::cast_slice::<f32, u8>(&meters).to_vec(),
        0,
    ))
}

fn load_confidence(path: &Path) -> BackendResult<CameraFrame> {
    let codes = open_image(path)?.into_luma8();
    let (width, height) = codes.dimensions();
    debug!(path = %path.display(), width, height, "Confidence map loaded");
    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::Confidence8,
        codes.into_raw(),
        0,
    ))
}
