// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame monitor
//!
//! On every frame notification the monitor acquires the latest color, depth
//! and confidence frames, converts them into the display buffers of the
//! enabled views and hands each buffer to the display sink:
//!
//! ```text
//! color      → format converter      → Camera
//! depth      → grayscale over 0..1 m → RawDepth
//!            → grayscale near..far   → GrayDepth
//! confidence → classifier            → Confidence
//! ```
//!
//! The three kinds are independent: a kind that is not ready or fails
//! validation is skipped for the cycle without affecting the others.

mod buffer_cache;
mod session;

pub use buffer_cache::BufferCache;
pub use session::MonitorSession;

use image::RgbaImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backends::camera::format_converters::convert_to_rgba;
use crate::backends::camera::{BackendError, BackendResult, CameraFrame, FrameKind, FrameSource};
use crate::backends::display::{DisplaySink, DisplayView};
use crate::config::{Config, ViewSettings};
use crate::errors::ConfigError;
use crate::media::{DepthRange, UnknownConfidence, confidence_frame_to_rgba, depth_frame_to_grayscale};

/// Conversion parameters resolved from [`Config`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub depth_range: DepthRange,
    pub unknown_confidence: UnknownConfidence,
    pub views: ViewSettings,
    pub flip_vertical: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let config = Config::default();
        Self {
            depth_range: DepthRange::new(config.depth.near, config.depth.far)
                .unwrap_or(DepthRange::RAW_VIEW),
            unknown_confidence: config.confidence.unknown_confidence(),
            views: config.views,
            flip_vertical: config.flip_vertical,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            depth_range: config.depth_range()?,
            unknown_confidence: config.confidence.unknown_confidence(),
            views: config.views,
            flip_vertical: config.flip_vertical,
        })
    }

    pub fn is_enabled(&self, view: DisplayView) -> bool {
        match view {
            DisplayView::Camera => self.views.camera,
            DisplayView::RawDepth => self.views.raw_depth,
            DisplayView::GrayDepth => self.views.gray_depth,
            DisplayView::Confidence => self.views.confidence,
        }
    }

    /// Enabled views fed by frames of `kind`
    pub fn views_for(&self, kind: FrameKind) -> Vec<DisplayView> {
        DisplayView::ALL
            .into_iter()
            .filter(|view| view.kind() == kind && self.is_enabled(*view))
            .collect()
    }
}

/// Result of one kind's update in a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Display buffers refreshed from a frame of this size
    Updated { width: u32, height: u32 },
    /// The source had no frame of this kind
    NotReady,
    /// The frame was rejected; the buffers keep their previous contents
    Invalid(String),
    /// No view of this kind is enabled
    Disabled,
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated { .. })
    }
}

/// Outcomes of one monitor cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub color: UpdateOutcome,
    pub depth: UpdateOutcome,
    pub confidence: UpdateOutcome,
}

impl CycleReport {
    pub fn outcome(&self, kind: FrameKind) -> &UpdateOutcome {
        match kind {
            FrameKind::Color => &self.color,
            FrameKind::Depth => &self.depth,
            FrameKind::Confidence => &self.confidence,
        }
    }

    /// Number of kinds updated this cycle
    pub fn updated(&self) -> usize {
        FrameKind::ALL
            .into_iter()
            .filter(|kind| self.outcome(*kind).is_updated())
            .count()
    }
}

/// Per-kind counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub updated: u64,
    pub not_ready: u64,
    pub invalid: u64,
}

impl KindStats {
    fn record(&mut self, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Updated { .. } => self.updated += 1,
            UpdateOutcome::NotReady => self.not_ready += 1,
            UpdateOutcome::Invalid(_) => self.invalid += 1,
            UpdateOutcome::Disabled => {}
        }
    }
}

/// Cumulative monitor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub cycles: u64,
    pub color: KindStats,
    pub depth: KindStats,
    pub confidence: KindStats,
    /// Textures the sink failed to accept
    pub sink_errors: u64,
    /// Display buffer allocations
    pub reallocations: u64,
}

impl MonitorStats {
    pub fn kind(&self, kind: FrameKind) -> &KindStats {
        match kind {
            FrameKind::Color => &self.color,
            FrameKind::Depth => &self.depth,
            FrameKind::Confidence => &self.confidence,
        }
    }

    fn kind_mut(&mut self, kind: FrameKind) -> &mut KindStats {
        match kind {
            FrameKind::Color => &mut self.color,
            FrameKind::Depth => &mut self.depth,
            FrameKind::Confidence => &mut self.confidence,
        }
    }
}

/// Converts source frames into display textures
pub struct FrameMonitor<S: DisplaySink> {
    settings: MonitorSettings,
    cache: BufferCache,
    sink: S,
    stats: MonitorStats,
}

impl<S: DisplaySink> FrameMonitor<S> {
    pub fn new(settings: MonitorSettings, sink: S) -> Self {
        info!(?settings, "Frame monitor created");
        Self {
            settings,
            cache: BufferCache::new(),
            sink,
            stats: MonitorStats::default(),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Replace the settings, effective from the next cycle
    pub fn set_settings(&mut self, settings: MonitorSettings) {
        debug!(?settings, "Monitor settings changed");
        self.settings = settings;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            reallocations: self.cache.reallocations(),
            ..self.stats
        }
    }

    /// Subscribe to `source` and process its notifications through
    /// the returned session
    pub fn start<'a>(&'a mut self, source: &'a dyn FrameSource) -> MonitorSession<'a, S> {
        MonitorSession::new(self, source)
    }

    /// Run one update cycle against `source`
    pub fn on_frame_received(&mut self, source: &dyn FrameSource) -> CycleReport {
        self.stats.cycles += 1;
        let report = CycleReport {
            color: self.update_kind(source, FrameKind::Color),
            depth: self.update_kind(source, FrameKind::Depth),
            confidence: self.update_kind(source, FrameKind::Confidence),
        };
        for kind in FrameKind::ALL {
            self.stats.kind_mut(kind).record(report.outcome(kind));
        }
        report
    }

    fn update_kind(&mut self, source: &dyn FrameSource, kind: FrameKind) -> UpdateOutcome {
        let views = self.settings.views_for(kind);
        if views.is_empty() {
            return UpdateOutcome::Disabled;
        }

        let Some(frame) = source.try_acquire_latest(kind) else {
            debug!(source = source.name(), %kind, "Frame not ready");
            return UpdateOutcome::NotReady;
        };

        if let Err(e) = check_kind(&frame, kind) {
            warn!(source = source.name(), %kind, error = %e, "Skipping invalid frame");
            return UpdateOutcome::Invalid(e.to_string());
        }

        for view in views {
            let buffer = self.cache.ensure(view, frame.width, frame.height);
            if let Err(e) = render(&self.settings, view, &frame, buffer) {
                warn!(source = source.name(), %view, error = %e, "Conversion failed");
                return UpdateOutcome::Invalid(e.to_string());
            }
            if let Err(e) = self.sink.set_display_texture(view, buffer) {
                warn!(%view, error = %e, "Display sink rejected texture");
                self.stats.sink_errors += 1;
            }
        }

        UpdateOutcome::Updated {
            width: frame.width,
            height: frame.height,
        }
    }
}

impl<S: DisplaySink + std::fmt::Debug> std::fmt::Debug for FrameMonitor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameMonitor")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("sink", &self.sink)
            .field("stats", &self.stats)
            .finish()
    }
}

fn check_kind(frame: &CameraFrame, kind: FrameKind) -> BackendResult<()> {
    if !frame.format.is_valid_for(kind) {
        return Err(BackendError::FormatNotSupported(format!(
            "{} frame delivered as {}",
            kind, frame.format
        )));
    }
    frame.validate()
}

fn render(
    settings: &MonitorSettings,
    view: DisplayView,
    frame: &CameraFrame,
    out: &mut RgbaImage,
) -> BackendResult<()> {
    let flip = settings.flip_vertical;
    match view {
        DisplayView::Camera => convert_to_rgba(frame, out, flip),
        DisplayView::RawDepth => depth_frame_to_grayscale(frame, DepthRange::RAW_VIEW, out, flip),
        DisplayView::GrayDepth => depth_frame_to_grayscale(frame, settings.depth_range, out, flip),
        DisplayView::Confidence => {
            confidence_frame_to_rgba(frame, settings.unknown_confidence, out, flip)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PixelFormat;
    use crate::backends::display::MemorySink;
    use crate::backends::virtual_camera::{SyntheticConfig, SyntheticSource};

    fn source() -> SyntheticSource {
        let source = SyntheticSource::new(SyntheticConfig {
            color_width: 8,
            color_height: 6,
            color_format: PixelFormat::NV12,
            depth_width: 4,
            depth_height: 3,
        })
        .unwrap();
        source.tick();
        source
    }

    #[test]
    fn test_cycle_updates_every_view() {
        let source = source();
        let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());

        let report = monitor.on_frame_received(&source);
        assert_eq!(report.color, UpdateOutcome::Updated { width: 8, height: 6 });
        assert_eq!(report.depth, UpdateOutcome::Updated { width: 4, height: 3 });
        assert_eq!(report.updated(), 3);

        for view in DisplayView::ALL {
            assert_eq!(monitor.sink().updates(view), 1, "{view}");
        }
        assert_eq!(source.ledger().outstanding(), 0);
    }

    #[test]
    fn test_disabled_views_are_skipped() {
        let source = source();
        let settings = MonitorSettings {
            views: ViewSettings {
                camera: false,
                raw_depth: false,
                ..ViewSettings::default()
            },
            ..MonitorSettings::default()
        };
        let mut monitor = FrameMonitor::new(settings, MemorySink::new());

        let report = monitor.on_frame_received(&source);
        assert_eq!(report.color, UpdateOutcome::Disabled);
        assert!(report.depth.is_updated());
        assert_eq!(monitor.sink().updates(DisplayView::RawDepth), 0);
        assert_eq!(monitor.sink().updates(DisplayView::GrayDepth), 1);
        // Nothing acquired for a disabled kind
        assert_eq!(source.ledger().released(), 2);
    }

    #[test]
    fn test_stats_accumulate() {
        let source = source();
        let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
        monitor.on_frame_received(&source);
        source.set_available(FrameKind::Confidence, false);
        monitor.on_frame_received(&source);

        let stats = monitor.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.color.updated, 2);
        assert_eq!(stats.confidence.updated, 1);
        assert_eq!(stats.confidence.not_ready, 1);
        assert_eq!(stats.reallocations, 4);
    }
}
