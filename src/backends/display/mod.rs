// SPDX-License-Identifier: GPL-3.0-only

//! Display sinks
//!
//! A display sink receives the converted RGBA buffers, one per view. The
//! buffer is only borrowed for the call; sinks that keep it must copy.

mod png;

pub use png::{PngSink, PngSinkMode};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::backends::camera::FrameKind;
use crate::errors::SinkResult;

/// A displayable output of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayView {
    /// Camera color image
    Camera,
    /// Depth in meters shown over 0..1 m
    RawDepth,
    /// Depth remapped between the near and far clip
    GrayDepth,
    /// Confidence classes in red/green/blue
    Confidence,
}

impl DisplayView {
    pub const ALL: [DisplayView; 4] = [
        DisplayView::Camera,
        DisplayView::RawDepth,
        DisplayView::GrayDepth,
        DisplayView::Confidence,
    ];

    /// Frame kind this view is produced from
    pub fn kind(&self) -> FrameKind {
        match self {
            DisplayView::Camera => FrameKind::Color,
            DisplayView::RawDepth | DisplayView::GrayDepth => FrameKind::Depth,
            DisplayView::Confidence => FrameKind::Confidence,
        }
    }

    /// Short name, also used for file names
    pub fn name(&self) -> &'static str {
        match self {
            DisplayView::Camera => "camera",
            DisplayView::RawDepth => "raw_depth",
            DisplayView::GrayDepth => "gray_depth",
            DisplayView::Confidence => "confidence",
        }
    }

    /// Next view in display order, wrapping around
    pub fn next(&self) -> DisplayView {
        let idx = Self::ALL.iter().position(|v| v == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for DisplayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Receiver of converted display buffers
pub trait DisplaySink {
    /// Show `texture` in `view`
    fn set_display_texture(&mut self, view: DisplayView, texture: &RgbaImage) -> SinkResult<()>;
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn set_display_texture(&mut self, view: DisplayView, texture: &RgbaImage) -> SinkResult<()> {
        (**self).set_display_texture(view, texture)
    }
}

/// Keeps the latest texture of every view in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    latest: HashMap<DisplayView, RgbaImage>,
    updates: HashMap<DisplayView, u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest texture shown in `view`
    pub fn latest(&self, view: DisplayView) -> Option<&RgbaImage> {
        self.latest.get(&view)
    }

    /// Number of times `view` was updated
    pub fn updates(&self, view: DisplayView) -> u64 {
        self.updates.get(&view).copied().unwrap_or(0)
    }
}

impl DisplaySink for MemorySink {
    fn set_display_texture(&mut self, view: DisplayView, texture: &RgbaImage) -> SinkResult<()> {
        match self.latest.get_mut(&view) {
            Some(existing) if existing.dimensions() == texture.dimensions() => {
                existing.copy_from_slice(texture);
            }
            _ => {
                self.latest.insert(view, texture.clone());
            }
        }
        *self.updates.entry(view).or_insert(0) += 1;
        Ok(())
    }
}
