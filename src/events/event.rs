//! # Events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Instance events**: a managed instance started, was restarted, auto-started or exited
//! - **Bookkeeping events**: purges, exit confirmations, superseded instances, desyncs
//! - **Host wiring events**: hooks and render timers added or removed
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! window, instance and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use modalvisor::{Event, EventKind, host::WindowId};
//!
//! let ev = Event::new(EventKind::TaskRestarted)
//!     .with_task("view3d.screencast_keys")
//!     .with_window(WindowId(1))
//!     .with_reason("buried by ui");
//!
//! assert_eq!(ev.kind, EventKind::TaskRestarted);
//! assert_eq!(ev.window, Some(WindowId(1)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::host::{InstanceId, WindowId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registration ===
    /// A kind was registered. Sets `task`.
    KindRegistered,

    // === Instance lifecycle ===
    /// A user invocation installed a new instance. Sets `task`, `window`, `instance`.
    TaskStarted,
    /// A buried instance was replaced. Sets `task`, `window`, `instance`, `reason`.
    TaskRestarted,
    /// An instance was started on a window the kind had not reached, or on a
    /// window whose bookkeeping a desync dropped. Sets `task`, `window`, `instance`;
    /// `reason` is `"host desync"` for the latter.
    TaskAutoStarted,
    /// Exit bookkeeping ran for one window; a kind spanning every window emits
    /// one per window. Sets `task`, `window`, `reason`, and `instance` when one was removed.
    TaskExited,
    /// The host unwound the exited handler and the window is free again. Sets `task`, `window`.
    ExitConfirmed,
    /// A late event reached an instance that is no longer current. Sets `task`, `window`, `instance`.
    InstanceSuperseded,

    // === Recovery ===
    /// Bookkeeping of a window that no longer exists was dropped. Sets `task`, `window`.
    WindowPurged,
    /// The recorded instance shows up more than once on the host stack. Sets `task`, `window`, `instance`.
    HostDesync,

    // === Host wiring ===
    /// A host hook was registered. Sets `reason` (hook name).
    HookRegistered,
    /// A host hook was unregistered. Sets `reason` (hook name).
    HookUnregistered,
    /// The host entered a render session.
    RenderSessionStarted,
    /// The render session completed or was cancelled. Sets `reason`.
    RenderSessionEnded,
    /// A render timer was added. Sets `window`, `timer_ms`.
    RenderTimerAdded,
    /// A render timer was removed. Sets `window`.
    RenderTimerRemoved,
    /// `terminate()` tore everything down.
    Terminated,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed). Sets `task` (subscriber), `reason`.
    SubscriberOverflow,
    /// Subscriber panicked during event processing. Sets `task` (subscriber), `reason`.
    SubscriberPanicked,
}

impl EventKind {
    /// Short stable label used by log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::KindRegistered => "kind-registered",
            EventKind::TaskStarted => "started",
            EventKind::TaskRestarted => "restarted",
            EventKind::TaskAutoStarted => "auto-started",
            EventKind::TaskExited => "exited",
            EventKind::ExitConfirmed => "exit-confirmed",
            EventKind::InstanceSuperseded => "superseded",
            EventKind::WindowPurged => "window-purged",
            EventKind::HostDesync => "host-desync",
            EventKind::HookRegistered => "hook-registered",
            EventKind::HookUnregistered => "hook-unregistered",
            EventKind::RenderSessionStarted => "render-started",
            EventKind::RenderSessionEnded => "render-ended",
            EventKind::RenderTimerAdded => "render-timer-added",
            EventKind::RenderTimerRemoved => "render-timer-removed",
            EventKind::Terminated => "terminated",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::SubscriberPanicked => "subscriber-panicked",
        }
    }
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Window the event concerns.
    pub window: Option<WindowId>,
    /// Instance the event concerns.
    pub instance: Option<InstanceId>,
    /// Timer period in milliseconds (compact).
    pub timer_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            window: None,
            instance: None,
            timer_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_window(mut self, window: WindowId) -> Self {
        self.window = Some(window);
        self
    }

    #[inline]
    pub fn with_instance(mut self, instance: InstanceId) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Attaches a timer period (stored as milliseconds).
    #[inline]
    pub fn with_timer(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timer_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }
}
