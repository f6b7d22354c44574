// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the frame monitor

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use frame_monitor::backends::camera::notify::NotifySender;
use frame_monitor::backends::camera::{
    FrameId, FrameLease, FrameNotification, LeaseLedger, Notifier, SubscriptionId,
};
use frame_monitor::errors::{SinkError, SinkResult};
use frame_monitor::{
    CameraFrame, DisplaySink, DisplayView, FrameKind, FrameMonitor, FrameSource, MemorySink,
    MonitorSettings, PixelFormat, SyntheticConfig, SyntheticSource, UpdateOutcome,
};
use image::RgbaImage;

/// Source serving hand-built frames
#[derive(Default)]
struct ScriptedSource {
    frames: Mutex<HashMap<FrameKind, CameraFrame>>,
    ledger: LeaseLedger,
    notifier: Notifier,
}

impl ScriptedSource {
    fn set(&self, kind: FrameKind, frame: CameraFrame) {
        self.frames.lock().unwrap().insert(kind, frame);
    }

    fn publish(&self, sequence: u64) {
        self.notifier.notify(FrameNotification {
            sequence,
            timestamp: Instant::now(),
        });
    }
}

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn try_acquire_latest(&self, kind: FrameKind) -> Option<FrameLease<'_>> {
        let frame = self.frames.lock().unwrap().get(&kind).cloned()?;
        Some(FrameLease::new(self, self.ledger.acquire(), frame))
    }

    fn release(&self, id: FrameId) {
        self.ledger.release(id);
    }

    fn register(&self, sender: NotifySender) -> SubscriptionId {
        self.notifier.register(sender)
    }

    fn unregister(&self, id: SubscriptionId) -> bool {
        self.notifier.unregister(id)
    }
}

fn depth_frame(width: u32, height: u32, samples: &[f32]) -> CameraFrame {
    CameraFrame::packed(
        width,
        height,
        PixelFormat::DepthF32,
        bytemuck::cast_slice::<f32, u8>(samples).to_vec(),
        0,
    )
}

fn gray_row(image: &RgbaImage) -> Vec<u8> {
    image.pixels().map(|p| p.0[0]).collect()
}

#[test]
fn test_depth_scenario_end_to_end() {
    let source = ScriptedSource::default();
    source.set(FrameKind::Depth, depth_frame(2, 2, &[0.5, 1.5, 2.5, 1.0]));

    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    let report = monitor.on_frame_received(&source);

    assert_eq!(report.depth, UpdateOutcome::Updated { width: 2, height: 2 });
    let gray = monitor.sink().latest(DisplayView::GrayDepth).unwrap();
    assert_eq!(gray_row(gray), vec![0, 128, 255, 64]);
    assert!(gray.pixels().all(|p| p.0[3] == 255));

    // Raw view spans 0..1 m
    let raw = monitor.sink().latest(DisplayView::RawDepth).unwrap();
    assert_eq!(gray_row(raw), vec![128, 255, 255, 255]);
}

#[test]
fn test_kinds_fail_independently() {
    let source = ScriptedSource::default();
    // Color frame too short for its shape
    source.set(
        FrameKind::Color,
        CameraFrame::packed(4, 4, PixelFormat::RGBA, vec![0u8; 10], 0),
    );
    source.set(
        FrameKind::Confidence,
        CameraFrame::packed(3, 1, PixelFormat::Confidence8, vec![0u8, 1, 2], 0),
    );

    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    let report = monitor.on_frame_received(&source);

    assert!(matches!(report.color, UpdateOutcome::Invalid(_)));
    assert_eq!(report.depth, UpdateOutcome::NotReady);
    assert_eq!(report.confidence, UpdateOutcome::Updated { width: 3, height: 1 });

    let conf = monitor.sink().latest(DisplayView::Confidence).unwrap();
    assert_eq!(conf.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(conf.get_pixel(1, 0).0, [0, 255, 0, 255]);
    assert_eq!(conf.get_pixel(2, 0).0, [0, 0, 255, 255]);
    assert!(monitor.sink().latest(DisplayView::Camera).is_none());

    let stats = monitor.stats();
    assert_eq!(stats.color.invalid, 1);
    assert_eq!(stats.depth.not_ready, 1);
}

#[test]
fn test_wrong_format_for_kind_is_invalid() {
    let source = ScriptedSource::default();
    source.set(
        FrameKind::Depth,
        CameraFrame::packed(2, 1, PixelFormat::Gray8, vec![1u8, 2], 0),
    );
    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    assert!(matches!(
        monitor.on_frame_received(&source).depth,
        UpdateOutcome::Invalid(_)
    ));
}

#[test]
fn test_overflowing_width_is_invalid() {
    let source = ScriptedSource::default();
    let mut frame = depth_frame(2, 2, &[1.0; 4]);
    frame.width = 0x4000_0001;
    frame.stride = 16;
    source.set(FrameKind::Depth, frame);

    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    let report = monitor.on_frame_received(&source);
    assert!(matches!(report.depth, UpdateOutcome::Invalid(_)));
    assert!(monitor.sink().latest(DisplayView::GrayDepth).is_none());
    assert_eq!(source.ledger.outstanding(), 0);
}

#[test]
fn test_every_lease_released() {
    let source = ScriptedSource::default();
    source.set(
        FrameKind::Color,
        CameraFrame::packed(2, 2, PixelFormat::RGBA, vec![0u8; 3], 0),
    );
    source.set(FrameKind::Depth, depth_frame(1, 1, &[1.0]));
    source.set(
        FrameKind::Confidence,
        CameraFrame::packed(1, 1, PixelFormat::Confidence8, vec![7u8], 0),
    );

    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    for _ in 0..3 {
        monitor.on_frame_received(&source);
    }
    assert_eq!(source.ledger.outstanding(), 0);
    assert_eq!(source.ledger.released(), 9);
}

#[test]
fn test_cache_reallocates_only_on_size_change() {
    let source = ScriptedSource::default();
    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());

    source.set(FrameKind::Depth, depth_frame(2, 1, &[1.0, 2.0]));
    monitor.on_frame_received(&source);
    monitor.on_frame_received(&source);
    // Raw and gray depth views
    assert_eq!(monitor.stats().reallocations, 2);

    source.set(FrameKind::Depth, depth_frame(1, 2, &[1.0, 2.0]));
    monitor.on_frame_received(&source);
    assert_eq!(monitor.stats().reallocations, 4);
    assert_eq!(
        monitor.cache().get(DisplayView::GrayDepth).map(|b| b.dimensions()),
        Some((1, 2))
    );
}

#[test]
fn test_session_follows_notifications() {
    let source = ScriptedSource::default();
    source.set(FrameKind::Depth, depth_frame(1, 1, &[2.5]));
    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());

    {
        let mut session = monitor.start(&source);
        assert_eq!(source.notifier.len(), 1);
        source.publish(0);
        assert_eq!(session.pump(), 1);
        assert_eq!(session.pump(), 0);
    }
    assert!(source.notifier.is_empty());

    // Notifications after the session ended are not processed
    source.publish(1);
    assert_eq!(monitor.stats().cycles, 1);
    assert_eq!(monitor.sink().updates(DisplayView::GrayDepth), 1);
}

/// Sink that refuses one view
struct FailingSink {
    refuse: DisplayView,
    accepted: Vec<DisplayView>,
}

impl DisplaySink for FailingSink {
    fn set_display_texture(&mut self, view: DisplayView, _texture: &RgbaImage) -> SinkResult<()> {
        if view == self.refuse {
            return Err(SinkError::Closed);
        }
        self.accepted.push(view);
        Ok(())
    }
}

#[test]
fn test_sink_errors_are_counted_not_fatal() {
    let source = SyntheticSource::new(SyntheticConfig::default()).unwrap();
    source.tick();
    let sink = FailingSink {
        refuse: DisplayView::RawDepth,
        accepted: Vec::new(),
    };
    let mut monitor = FrameMonitor::new(MonitorSettings::default(), sink);

    let report = monitor.on_frame_received(&source);
    assert_eq!(report.updated(), 3);
    assert_eq!(monitor.stats().sink_errors, 1);
    assert_eq!(
        monitor.sink().accepted,
        vec![
            DisplayView::Camera,
            DisplayView::GrayDepth,
            DisplayView::Confidence
        ]
    );
}

#[test]
fn test_stats_serialize() {
    let source = SyntheticSource::new(SyntheticConfig::default()).unwrap();
    source.tick();
    let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
    monitor.on_frame_received(&source);

    let json = serde_json::to_value(monitor.stats()).unwrap();
    assert_eq!(json["cycles"], 1);
    assert_eq!(json["depth"]["updated"], 1);
    assert_eq!(json["reallocations"], 4);
}
