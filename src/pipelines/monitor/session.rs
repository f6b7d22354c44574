// SPDX-License-Identifier: GPL-3.0-only

//! Notification-driven monitor session

use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use super::{CycleReport, FrameMonitor};
use crate::backends::camera::{FrameSource, Subscription};
use crate::backends::display::DisplaySink;
use crate::constants::timing::POLL_INTERVAL;

/// A monitor subscribed to a source
///
/// Each pending frame notification runs one monitor cycle. Stopping or
/// dropping the session unsubscribes from the source.
pub struct MonitorSession<'a, S: DisplaySink> {
    monitor: &'a mut FrameMonitor<S>,
    source: &'a dyn FrameSource,
    subscription: Option<Subscription<'a>>,
    last_report: Option<CycleReport>,
}

impl<'a, S: DisplaySink> MonitorSession<'a, S> {
    pub(super) fn new(monitor: &'a mut FrameMonitor<S>, source: &'a dyn FrameSource) -> Self {
        let subscription = Subscription::new(source);
        info!(source = source.name(), id = subscription.id().0, "Monitor session started");
        Self {
            monitor,
            source,
            subscription: Some(subscription),
            last_report: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn monitor(&self) -> &FrameMonitor<S> {
        &*self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut FrameMonitor<S> {
        &mut *self.monitor
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Process pending notifications, one cycle each
    ///
    /// Returns the number of cycles run. Does nothing once stopped.
    pub fn pump(&mut self) -> usize {
        let mut cycles = 0;
        while let Some(notification) = self.subscription.as_mut().and_then(Subscription::try_next) {
            trace!(sequence = notification.sequence, "Frame notification");
            self.last_report = Some(self.monitor.on_frame_received(self.source));
            cycles += 1;
        }
        cycles
    }

    /// Pump until at least one cycle ran or `timeout` elapsed
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let cycles = self.pump();
            if cycles > 0 || !self.is_active() || Instant::now() >= deadline {
                return cycles;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Unsubscribe from the source
    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            debug!(source = self.source.name(), "Monitor session stopped");
        }
    }
}

impl<S: DisplaySink> Drop for MonitorSession<'_, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
