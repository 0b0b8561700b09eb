//! # Render-session timer pool.
//!
//! While the host renders it stops delivering the pre-tick notification. The
//! pool keeps one periodic timer per window instead, and each firing runs the
//! same decision pass the pre-tick hook would have run.
//!
//! ## Rules
//! - One timer per window, shared by every kind, at the finest period any
//!   running kind asked for. A finer request replaces the existing timers.
//! - Timers of windows that disappeared are removed on the next purge.
//! - The whole pool is released when the session ends or when no kind has a
//!   live instance anywhere.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::registry::Live;
use crate::events::{Bus, Event, EventKind};
use crate::host::{TimerId, TimerService, WindowId};

/// Process-wide render session state.
#[derive(Debug, Default)]
pub(crate) struct RenderPool {
    active: bool,
    interval: Option<Duration>,
    timers: HashMap<WindowId, TimerId>,
}

impl RenderPool {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// `true` if `timer` is this pool's timer for `window`.
    pub fn owns(&self, window: WindowId, timer: TimerId) -> bool {
        self.timers.get(&window) == Some(&timer)
    }

    /// Makes sure every live window has a timer of period `interval`.
    pub fn ensure(
        &mut self,
        timers: &mut impl TimerService,
        live: &Live,
        interval: Duration,
        bus: &Bus,
    ) {
        let interval = match self.interval {
            Some(current) if current <= interval => current,
            Some(_) => {
                self.release(timers, bus);
                interval
            }
            None => interval,
        };
        self.interval = Some(interval);

        for &window in live.windows() {
            if self.timers.contains_key(&window) {
                continue;
            }
            let timer = timers.add_timer(window, interval);
            self.timers.insert(window, timer);
            tracing::debug!(%window, ?interval, "render timer added");
            bus.publish(
                Event::new(EventKind::RenderTimerAdded)
                    .with_window(window)
                    .with_timer(interval),
            );
        }
    }

    /// Removes timers of windows that are gone.
    pub fn purge(&mut self, timers: &mut impl TimerService, live: &Live, bus: &Bus) {
        let dead: Vec<WindowId> = self
            .timers
            .keys()
            .filter(|w| !live.contains(w))
            .copied()
            .collect();
        for window in dead {
            self.remove(timers, window, bus);
        }
    }

    /// Removes every timer. The session flag is left untouched.
    pub fn release(&mut self, timers: &mut impl TimerService, bus: &Bus) {
        let mut windows: Vec<WindowId> = self.timers.keys().copied().collect();
        windows.sort_unstable();
        for window in windows {
            self.remove(timers, window, bus);
        }
        self.interval = None;
    }

    fn remove(&mut self, timers: &mut impl TimerService, window: WindowId, bus: &Bus) {
        if let Some(timer) = self.timers.remove(&window) {
            timers.remove_timer(timer);
            tracing::debug!(%window, "render timer removed");
            bus.publish(Event::new(EventKind::RenderTimerRemoved).with_window(window));
        }
    }
}
