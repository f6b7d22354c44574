// SPDX-License-Identifier: GPL-3.0-only

//! Display buffers, one per view, reused across frames

use image::RgbaImage;
use std::collections::BTreeMap;
use tracing::debug;

use crate::backends::display::DisplayView;

#[derive(Debug, Default)]
pub struct BufferCache {
    buffers: BTreeMap<DisplayView, RgbaImage>,
    reallocations: u64,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer for `view` sized `width` x `height`
    ///
    /// The existing buffer (and its contents) is returned when the size
    /// matches; otherwise a zeroed buffer replaces it.
    pub fn ensure(&mut self, view: DisplayView, width: u32, height: u32) -> &mut RgbaImage {
        let reallocate = self
            .buffers
            .get(&view)
            .is_none_or(|buf| buf.dimensions() != (width, height));
        if reallocate {
            debug!(view = %view, width, height, "Allocating display buffer");
            self.reallocations += 1;
            self.buffers.insert(view, RgbaImage::new(width, height));
        }
        self.buffers
            .entry(view)
            .or_insert_with(|| RgbaImage::new(width, height))
    }

    pub fn get(&self, view: DisplayView) -> Option<&RgbaImage> {
        self.buffers.get(&view)
    }

    /// Number of allocations so far, first allocations included
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }
}
