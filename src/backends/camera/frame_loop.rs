// SPDX-License-Identifier: GPL-3.0-only
//! Background capture loops
//!
//! A source publishes frames from its own thread, paced at a frame rate.
//! [`CaptureLoopController`] owns that thread; [`Ticker`] is the paced loop
//! that calls a source's `tick` until stopped or a frame limit is reached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Returned by a loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Owner of a capture loop thread
///
/// The loop runs until the closure returns [`LoopAction::Stop`] or
/// [`stop`](Self::stop) is called. Dropping the controller stops the loop.
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoopController {
    /// Run `loop_fn` repeatedly, at most once per `period` when given
    pub fn start<F>(name: &str, period: Option<Duration>, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, ?period, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut next_deadline = Instant::now();
            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn() == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
                if let Some(period) = period {
                    next_deadline += period;
                    let now = Instant::now();
                    if next_deadline > now {
                        thread::sleep(next_deadline - now);
                    } else {
                        // Running late, don't try to catch up
                        next_deadline = now;
                    }
                }
            }
            debug!(name = %thread_name, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread without signalling it
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Drives a source's `tick` at a fixed frame rate
pub struct Ticker {
    controller: CaptureLoopController,
    ticks: Arc<AtomicU64>,
}

impl Ticker {
    /// Start ticking at `fps` frames per second
    ///
    /// With `max_ticks` the loop ends on its own after that many frames.
    pub fn start<F>(name: &str, fps: u32, max_ticks: Option<u64>, mut tick: F) -> Self
    where
        F: FnMut() -> u64 + Send + 'static,
    {
        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let ticks = Arc::new(AtomicU64::new(0));
        let loop_ticks = Arc::clone(&ticks);

        let controller = CaptureLoopController::start(name, Some(period), move || {
            if max_ticks.is_some_and(|max| loop_ticks.load(Ordering::SeqCst) >= max) {
                return LoopAction::Stop;
            }
            tick();
            loop_ticks.fetch_add(1, Ordering::SeqCst);
            LoopAction::Continue
        });

        Self { controller, ticks }
    }

    /// Frames published so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// True until stopped or the frame limit is reached
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Wait for a bounded ticker to reach its limit
    pub fn join(&mut self) {
        self.controller.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", None, move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });
        controller.join();

        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller =
            CaptureLoopController::start("test-loop", Some(Duration::from_millis(5)), move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            });
        thread::sleep(Duration::from_millis(30));
        controller.stop();

        let seen = counter.load(Ordering::SeqCst);
        assert!(seen > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_ticker_respects_limit() {
        let published = Arc::new(AtomicU64::new(0));
        let published_clone = Arc::clone(&published);

        let mut ticker = Ticker::start("test-ticker", 1000, Some(5), move || {
            published_clone.fetch_add(1, Ordering::SeqCst)
        });
        ticker.join();

        assert_eq!(ticker.ticks(), 5);
        assert_eq!(published.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_drop_stops_ticker() {
        let ticker = Ticker::start("test-drop", 200, None, || 0);
        assert!(ticker.is_running());
        drop(ticker);
    }
}
