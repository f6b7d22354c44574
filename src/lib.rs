// SPDX-License-Identifier: GPL-3.0-only

//! Frame Monitor - sensor frame visualization
//!
//! Turns the color, depth and confidence frames of a depth-capable camera
//! into displayable RGBA images.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Frame source and display sink abstractions, virtual sources
//! - [`media`]: Depth-to-grayscale and confidence-to-color mappings
//! - [`pipelines`]: The per-frame monitor tying sources to sinks
//! - [`config`]: User configuration handling
//! - [`terminal`]: Live terminal viewer
//!
//! # Example
//!
//! ```ignore
//! use frame_monitor::{FrameMonitor, MemorySink, MonitorSettings, SyntheticConfig, SyntheticSource};
//!
//! let source = SyntheticSource::new(SyntheticConfig::default())?;
//! let mut monitor = FrameMonitor::new(MonitorSettings::default(), MemorySink::new());
//! let mut session = monitor.start(&source);
//! source.tick();
//! session.pump();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod terminal;

// Re-export commonly used types
pub use backends::camera::{CameraFrame, FrameKind, FrameSource, PixelFormat};
pub use backends::display::{DisplaySink, DisplayView, MemorySink, PngSink, PngSinkMode};
pub use backends::virtual_camera::{FileSource, SyntheticConfig, SyntheticSource, VirtualSource};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{DepthRange, UnknownConfidence};
pub use pipelines::monitor::{
    CycleReport, FrameMonitor, MonitorSession, MonitorSettings, MonitorStats, UpdateOutcome,
};
