//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], centralized settings for the supervisor.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Kind defaults**: `ManagedTaskKind::with_defaults(id, factory, &config)`
//!
//! ## Sentinel values
//! - `render_tick_interval = 0s` → kinds built from this config never request a render timer
//! - `exit_timer_delay = 0s` → exit timers fire on the host's next scheduling pass

use std::time::Duration;

use crate::tasks::RENDER_TICK_INTERVAL;

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `exit_timer_delay`: delay of the timer that lets the host unwind an exited handler
/// - `render_tick_interval`: default render timer period for kinds
/// - `min_render_tick_interval`: registration floor for non-zero render periods
/// - `restart`, `all_windows`: defaults for kinds
/// - `rebind_anchor_on_restart`: restore the previous anchor on restarted handlers
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages skip
    /// older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Delay of exit timers.
    pub exit_timer_delay: Duration,

    /// Default render timer period for kinds (`0s` = none).
    pub render_tick_interval: Duration,

    /// Smallest non-zero render timer period a kind may request.
    pub min_render_tick_interval: Duration,

    /// Default `restart` flag for kinds.
    pub restart: bool,

    /// Default `all_windows` flag for kinds.
    pub all_windows: bool,

    /// Put the previous anchor back onto a restarted handler.
    pub rebind_anchor_on_restart: bool,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns `true` when `interval` is acceptable for a kind.
    #[inline]
    pub fn accepts_render_tick(&self, interval: Duration) -> bool {
        interval == Duration::ZERO || interval >= self.min_render_tick_interval
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `exit_timer_delay = 0s`
    /// - `render_tick_interval = 1/60s`
    /// - `min_render_tick_interval = 5ms`
    /// - `restart = true`, `all_windows = true`
    /// - `rebind_anchor_on_restart = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            exit_timer_delay: Duration::ZERO,
            render_tick_interval: RENDER_TICK_INTERVAL,
            min_render_tick_interval: Duration::from_millis(5),
            restart: true,
            all_windows: true,
            rebind_anchor_on_restart: true,
        }
    }
}
