//! # Managed task kind descriptor.
//!
//! [`ManagedTaskKind`] describes how one kind of modal task is supervised:
//! - its identity (unique across all registered kinds),
//! - the factory that builds a fresh instance per invocation,
//! - the default [`InvokeArgs`] used for restarts and auto-starts,
//! - `restart`: re-invoke when a foreign handler buries the task,
//! - `all_windows`: auto-start on every window, not just the first one,
//! - an optional handover callback run on restart and auto-start,
//! - `render_tick_interval`: timer period while the host renders (`0` = no timer).
//!
//! A kind can be created:
//! - **Explicitly** with [`ManagedTaskKind::new`] and the `with_*` setters
//! - **From config** with [`ManagedTaskKind::with_defaults`]
//!
//! The id is validated by [`Supervisor::register`](crate::Supervisor::register),
//! not here.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::SupervisorConfig;
use crate::host::InstanceId;
use crate::tasks::args::InvokeArgs;
use crate::tasks::task::{HostEvent, ModalTask, TaskContext};

/// Builds a fresh task instance.
pub type TaskFactory = Arc<dyn Fn() -> Box<dyn ModalTask> + Send + Sync>;

/// Callback run when the supervisor restarts or auto-starts a kind.
pub type HandoverFn = Arc<dyn Fn(&mut Handover<'_>) + Send + Sync>;

/// Arguments of a [`HandoverFn`].
///
/// `previous` is the instance being replaced on a restart and `None` on an
/// auto-start.
pub struct Handover<'a> {
    pub ctx: &'a TaskContext,
    pub event: &'a HostEvent,
    pub instance: InstanceId,
    pub task: &'a mut dyn ModalTask,
    pub previous: Option<InstanceId>,
}

/// Default render timer period (60 Hz).
pub(crate) const RENDER_TICK_INTERVAL: Duration = Duration::from_micros(16_667);

/// Immutable descriptor of a supervised task kind.
#[derive(Clone)]
pub struct ManagedTaskKind {
    raw_id: String,
    factory: TaskFactory,
    args: InvokeArgs,
    restart: bool,
    all_windows: bool,
    callback: Option<HandoverFn>,
    render_tick_interval: Duration,
}

impl ManagedTaskKind {
    /// Creates a kind with `restart` and `all_windows` enabled and a 60 Hz
    /// render tick.
    pub fn new<F, T>(id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ModalTask,
    {
        Self {
            raw_id: id.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn ModalTask>),
            args: InvokeArgs::default(),
            restart: true,
            all_windows: true,
            callback: None,
            render_tick_interval: RENDER_TICK_INTERVAL,
        }
    }

    /// Creates a kind inheriting `restart`, `all_windows` and the render tick
    /// from the supervisor config.
    pub fn with_defaults<F, T>(id: impl Into<String>, factory: F, cfg: &SupervisorConfig) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: ModalTask,
    {
        Self::new(id, factory)
            .with_restart(cfg.restart)
            .with_all_windows(cfg.all_windows)
            .with_render_tick_interval(cfg.render_tick_interval)
    }

    pub fn with_args(mut self, args: InvokeArgs) -> Self {
        self.args = args;
        self
    }

    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_all_windows(mut self, all_windows: bool) -> Self {
        self.all_windows = all_windows;
        self
    }

    pub fn with_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(&mut Handover<'_>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// `Duration::ZERO` means this kind never needs a render timer.
    pub fn with_render_tick_interval(mut self, interval: Duration) -> Self {
        self.render_tick_interval = interval;
        self
    }

    /// The id exactly as given (normalised on registration).
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    pub fn args(&self) -> InvokeArgs {
        self.args
    }

    pub fn restart(&self) -> bool {
        self.restart
    }

    pub fn all_windows(&self) -> bool {
        self.all_windows
    }

    pub fn render_tick_interval(&self) -> Duration {
        self.render_tick_interval
    }

    /// Render tick as an `Option` (`None` = no timer needed).
    #[inline]
    pub fn render_tick(&self) -> Option<Duration> {
        if self.render_tick_interval == Duration::ZERO {
            None
        } else {
            Some(self.render_tick_interval)
        }
    }

    pub(crate) fn callback(&self) -> Option<&HandoverFn> {
        self.callback.as_ref()
    }

    pub(crate) fn spawn(&self) -> Box<dyn ModalTask> {
        (self.factory)()
    }
}

impl fmt::Debug for ManagedTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedTaskKind")
            .field("id", &self.raw_id)
            .field("args", &self.args)
            .field("restart", &self.restart)
            .field("all_windows", &self.all_windows)
            .field("callback", &self.callback.is_some())
            .field("render_tick_interval", &self.render_tick_interval)
            .finish()
    }
}
