// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic test-pattern source
//!
//! Produces a moving color gradient, a horizontal depth ramp that drifts
//! back and forth, and confidence bands that follow the ramp (near = high).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::FrameSlots;
use crate::backends::camera::format_converters::rgb_to_yuv;
use crate::backends::camera::notify::NotifySender;
use crate::backends::camera::{
    BackendError, BackendResult, CameraFrame, FrameId, FrameKind, FrameLease, FrameSource,
    LeaseLedger, PixelFormat, SubscriptionId,
};
use crate::constants::synthetic::{
    DEFAULT_COLOR_HEIGHT, DEFAULT_COLOR_WIDTH, DEFAULT_DEPTH_HEIGHT, DEFAULT_DEPTH_WIDTH,
    RAMP_MAX_M, RAMP_MIN_M,
};

/// Shape of the generated frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub color_width: u32,
    pub color_height: u32,
    pub color_format: PixelFormat,
    /// Depth and confidence share one resolution
    pub depth_width: u32,
    pub depth_height: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            color_width: DEFAULT_COLOR_WIDTH,
            color_height: DEFAULT_COLOR_HEIGHT,
            color_format: PixelFormat::RGBA,
            depth_width: DEFAULT_DEPTH_WIDTH,
            depth_height: DEFAULT_DEPTH_HEIGHT,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> BackendResult<()> {
        if !self.color_format.is_valid_for(FrameKind::Color) {
            return Err(BackendError::FormatNotSupported(format!(
                "{} cannot carry color frames",
                self.color_format
            )));
        }
        if self.color_width == 0 || self.color_height == 0 {
            return Err(BackendError::InvalidFrame("empty color resolution".into()));
        }
        if self.depth_width == 0 || self.depth_height == 0 {
            return Err(BackendError::InvalidFrame("empty depth resolution".into()));
        }
        if self.color_format.is_yuv() && self.color_width % 2 != 0 {
            return Err(BackendError::InvalidFrame(format!(
                "{} needs an even width, got {}",
                self.color_format, self.color_width
            )));
        }
        Ok(())
    }
}

/// Test-pattern frame source
#[derive(Debug)]
pub struct SyntheticSource {
    config: Mutex<SyntheticConfig>,
    sequence: AtomicU64,
    slots: FrameSlots,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> BackendResult<Self> {
        config.validate()?;
        info!(?config, "Synthetic source created");
        Ok(Self {
            config: Mutex::new(config),
            sequence: AtomicU64::new(0),
            slots: FrameSlots::new(),
        })
    }

    /// Generate and publish the next frame set
    pub fn tick(&self) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let config = self.config();
        let frames = vec![
            (FrameKind::Color, color_frame(&config, sequence)),
            (FrameKind::Depth, depth_frame(&config, sequence)),
            (FrameKind::Confidence, confidence_frame(&config, sequence)),
        ];
        debug!(sequence, "Synthetic frame set published");
        self.slots.publish(frames, sequence);
        sequence
    }

    /// Make a kind (un)available, as when a sensor has no frame ready
    pub fn set_available(&self, kind: FrameKind, available: bool) {
        self.slots.set_available(kind, available);
    }

    /// Change the generated resolution, effective from the next tick
    pub fn reconfigure(&self, config: SyntheticConfig) -> BackendResult<()> {
        config.validate()?;
        if let Ok(mut current) = self.config.lock() {
            *current = config;
        }
        Ok(())
    }

    pub fn config(&self) -> SyntheticConfig {
        self.config.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn ledger(&self) -> &LeaseLedger {
        &self.slots.ledger
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots.notifier.len()
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
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

fn ratio(pos: u32, extent: u32) -> f32 {
    if extent <= 1 {
        0.0
    } else {
        pos as f32 / (extent - 1) as f32
    }
}

/// Gradient in RGB, blue channel drifts with the sequence
fn color_frame(config: &SyntheticConfig, sequence: u64) -> CameraFrame {
    let (w, h) = (config.color_width, config.color_height);
    let blue = ((sequence * 8) % 256) as u8;
    let rgb: Vec<[u8; 3]> = (0..h)
        .flat_map(|y| {
            (0..w).map(move |x| {
                [
                    (ratio(x, w) * 255.0).round() as u8,
                    (ratio(y, h) * 255.0).round() as u8,
                    blue,
                ]
            })
        })
        .collect();

    let data = encode_rgb(&rgb, w, h, config.color_format);
    CameraFrame::packed(w, h, config.color_format, data, sequence)
}

fn encode_rgb(rgb: &[[u8; 3]], w: u32, h: u32, format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::RGBA => rgb.iter().flat_map(|&[r, g, b]| [r, g, b, 255]).collect(),
        PixelFormat::BGRA => rgb.iter().flat_map(|&[r, g, b]| [b, g, r, 255]).collect(),
        PixelFormat::RGB24 => rgb.iter().flatten().copied().collect(),
        PixelFormat::Gray8 => rgb
            .iter()
            .map(|&[r, g, b]| rgb_to_yuv(r, g, b).0)
            .collect(),
        PixelFormat::YUYV => rgb
            .chunks_exact(2)
            .flat_map(|pair| {
                let (y0, u, v) = rgb_to_yuv(pair[0][0], pair[0][1], pair[0][2]);
                let (y1, _, _) = rgb_to_yuv(pair[1][0], pair[1][1], pair[1][2]);
                [y0, u, y1, v]
            })
            .collect(),
        PixelFormat::NV12 => {
            let (w, h) = (w as usize, h as usize);
            let mut data: Vec<u8> = rgb
                .iter()
                .map(|&[r, g, b]| rgb_to_yuv(r, g, b).0)
                .collect();
            // Chroma from the top-left pixel of every 2x2 block
            for y in (0..h).step_by(2) {
                for x in (0..w).step_by(2) {
                    let [r, g, b] = rgb[y * w + x];
                    let (_, u, v) = rgb_to_yuv(r, g, b);
                    data.extend_from_slice(&[u, v]);
                }
            }
            data
        }
        PixelFormat::DepthF32 | PixelFormat::Confidence8 => Vec::new(),
    }
}

/// Depth of a ramp sample in meters
fn ramp_depth(x: u32, width: u32, sequence: u64) -> f32 {
    let drift = (sequence as f32 * 0.1).sin() * 0.25;
    RAMP_MIN_M + (RAMP_MAX_M - RAMP_MIN_M) * ratio(x, width) + drift
}

fn depth_frame(config: &SyntheticConfig, sequence: u64) -> CameraFrame {
    let (w, h) = (config.depth_width, config.depth_height);
    let depth: Vec<f32> = (0..h)
        .flat_map(|_| (0..w).map(move |x| ramp_depth(x, w, sequence)))
        .collect();
    let data = bytemuck::cast_slice::<f32, u8>(&depth).to_vec();
    CameraFrame::packed(w, h, PixelFormat::DepthF32, data, sequence)
}

/// Near third is high confidence (2), far third low (0)
fn confidence_frame(config: &SyntheticConfig, sequence: u64) -> CameraFrame {
    let (w, h) = (config.depth_width, config.depth_height);
    let codes: Vec<u8> = (0..h)
        .flat_map(|_| (0..w).map(move |x| 2 - ((x * 3 / w).min(2) as u8)))
        .collect();
    CameraFrame::packed(w, h, PixelFormat::Confidence8, codes, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SyntheticConfig {
        SyntheticConfig {
            color_width: 8,
            color_height: 4,
            color_format: PixelFormat::RGBA,
            depth_width: 6,
            depth_height: 3,
        }
    }

    #[test]
    fn test_nothing_before_first_tick() {
        let source = SyntheticSource::new(small()).unwrap();
        assert!(source.try_acquire_latest(FrameKind::Color).is_none());
    }

    #[test]
    fn test_frames_are_valid_in_every_color_format() {
        for format in [
            PixelFormat::RGBA,
            PixelFormat::BGRA,
            PixelFormat::RGB24,
            PixelFormat::Gray8,
            PixelFormat::YUYV,
            PixelFormat::NV12,
        ] {
            let source = SyntheticSource::new(SyntheticConfig {
                color_format: format,
                ..small()
            })
            .unwrap();
            source.tick();
            for kind in FrameKind::ALL {
                let lease = source.try_acquire_latest(kind).unwrap();
                assert!(lease.validate().is_ok(), "{} {} invalid", format, kind);
                assert!(lease.format.is_valid_for(kind));
            }
        }
    }

    #[test]
    fn test_leases_released_on_drop() {
        let source = SyntheticSource::new(small()).unwrap();
        source.tick();
        {
            let _color = source.try_acquire_latest(FrameKind::Color).unwrap();
            let _depth = source.try_acquire_latest(FrameKind::Depth).unwrap();
            assert_eq!(source.ledger().outstanding(), 2);
        }
        assert_eq!(source.ledger().outstanding(), 0);
        assert_eq!(source.ledger().released(), 2);
    }

    #[test]
    fn test_unavailable_kind() {
        let source = SyntheticSource::new(small()).unwrap();
        source.tick();
        source.set_available(FrameKind::Depth, false);
        assert!(source.try_acquire_latest(FrameKind::Depth).is_none());
        assert!(source.try_acquire_latest(FrameKind::Confidence).is_some());
        source.set_available(FrameKind::Depth, true);
        assert!(source.try_acquire_latest(FrameKind::Depth).is_some());
    }

    #[test]
    fn test_confidence_follows_ramp() {
        let source = SyntheticSource::new(small()).unwrap();
        source.tick();
        let lease = source.try_acquire_latest(FrameKind::Confidence).unwrap();
        let row: Vec<u8> = lease.rows().next().unwrap().to_vec();
        assert_eq!(row, vec![2, 2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_rejects_odd_yuv_width() {
        let config = SyntheticConfig {
            color_width: 7,
            color_format: PixelFormat::NV12,
            ..small()
        };
        assert!(SyntheticSource::new(config).is_err());
    }

    #[test]
    fn test_reconfigure_changes_resolution() {
        let source = SyntheticSource::new(small()).unwrap();
        source
            .reconfigure(SyntheticConfig {
                depth_width: 10,
                depth_height: 5,
                ..small()
            })
            .unwrap();
        source.tick();
        let lease = source.try_acquire_latest(FrameKind::Depth).unwrap();
        assert_eq!((lease.width, lease.height), (10, 5));
    }
}
