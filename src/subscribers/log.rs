//! # LogWriter: events as `tracing` records
//!
//! A subscriber that turns each [`Event`] into one `tracing` record. Lifecycle
//! decisions log at `info`, wiring (hooks, timers) at `debug`, anomalies at
//! `warn`. Install any `tracing` subscriber to see the output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  modalvisor: [started] task="view3d.screencast_keys" window=win#1 instance=i1
//! INFO  modalvisor: [restarted] task="view3d.screencast_keys" window=win#1 instance=i3 reason="buried by UI"
//! DEBUG modalvisor: [render-timer-added] window=win#2 timer_ms=16
//! WARN  modalvisor: [host-desync] task="view3d.screencast_keys" window=win#1 instance=i3
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_str();
        let task = e.task.as_deref().unwrap_or("-");
        let window = e.window.map(|w| w.to_string()).unwrap_or_default();
        let instance = e.instance.map(|i| i.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskStarted
            | EventKind::TaskRestarted
            | EventKind::TaskAutoStarted
            | EventKind::TaskExited
            | EventKind::KindRegistered
            | EventKind::RenderSessionStarted
            | EventKind::RenderSessionEnded
            | EventKind::Terminated => {
                tracing::info!(seq = e.seq, "[{label}] task={task:?} window={window} instance={instance} reason={reason:?}");
            }
            EventKind::ExitConfirmed
            | EventKind::InstanceSuperseded
            | EventKind::WindowPurged
            | EventKind::HookRegistered
            | EventKind::HookUnregistered
            | EventKind::RenderTimerRemoved => {
                tracing::debug!(seq = e.seq, "[{label}] task={task:?} window={window} instance={instance} reason={reason:?}");
            }
            EventKind::RenderTimerAdded => {
                tracing::debug!(seq = e.seq, "[{label}] window={window} timer_ms={:?}", e.timer_ms);
            }
            EventKind::HostDesync
            | EventKind::SubscriberOverflow
            | EventKind::SubscriberPanicked => {
                tracing::warn!(seq = e.seq, "[{label}] task={task:?} window={window} instance={instance} reason={reason:?}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
