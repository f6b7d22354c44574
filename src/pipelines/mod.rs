// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ FrameSource  │ ──▶ │  FrameMonitor     │ ──▶ │ DisplaySink  │
//! │ color/depth/ │     │  - YUV/RGB→RGBA   │     │ PNG, memory, │
//! │ confidence   │     │  - depth→gray     │     │ terminal     │
//! │              │     │  - conf.→palette  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`monitor`]: per-frame conversion of sensor frames into display views

pub mod monitor;
