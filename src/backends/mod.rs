// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources and display sinks
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 FrameMonitor                 │
//! └───────────┬──────────────────────┬───────────┘
//!             │                      │
//! ┌───────────┴──────────┐ ┌─────────┴──────────┐
//! │   camera             │ │   display          │
//! │   FrameSource trait  │ │   DisplaySink      │
//! │   leases, notify     │ │   PNG / memory     │
//! └───────────┬──────────┘ └────────────────────┘
//!             │
//! ┌───────────┴──────────┐
//! │   virtual_camera     │
//! │   synthetic, file    │
//! └──────────────────────┘
//! ```

pub mod camera;
pub mod display;
pub mod virtual_camera;
