//! # Modal task abstraction.
//!
//! A [`ModalTask`] has two entry points, both called synchronously on the host
//! thread:
//! - [`start`](ModalTask::start) once, when the task is invoked in a window;
//! - [`tick`](ModalTask::tick) for every event the host routes to its handler.
//!
//! The supervisor wraps both (see `core::lifecycle`) and never lets a task see
//! an event meant for a superseded instance.

use crate::host::{Anchor, TimerId, WindowId};
use crate::tasks::args::InvokeArgs;

/// Run state carried by an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The handler stays installed.
    Running,
    /// The task completed; the host pops the handler.
    Finished,
    /// The task gave up; the host pops the handler.
    Cancelled,
}

/// Result of a task entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub state: RunState,
    /// Let the event continue to handlers further down the stack.
    pub pass_through: bool,
}

impl Outcome {
    #[inline]
    pub fn running() -> Self {
        Self {
            state: RunState::Running,
            pass_through: false,
        }
    }

    /// Background tasks return this for almost every event.
    #[inline]
    pub fn running_pass_through() -> Self {
        Self {
            state: RunState::Running,
            pass_through: true,
        }
    }

    #[inline]
    pub fn finished() -> Self {
        Self {
            state: RunState::Finished,
            pass_through: false,
        }
    }

    #[inline]
    pub fn cancelled() -> Self {
        Self {
            state: RunState::Cancelled,
            pass_through: false,
        }
    }

    /// What a superseded instance answers to a late event.
    #[inline]
    pub fn cancelled_pass_through() -> Self {
        Self {
            state: RunState::Cancelled,
            pass_through: true,
        }
    }

    /// `true` when the host will remove the handler.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Finished | RunState::Cancelled)
    }
}

/// Result of [`ModalTask::start`]: the outcome plus the trailing manage flag.
///
/// `manage = false` hands the outcome straight back to the host: no handler is
/// pushed and no exit bookkeeping runs. Tasks use it to bail out of an
/// invocation without stopping their instances in other windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartResult {
    pub outcome: Outcome,
    pub manage: bool,
}

impl StartResult {
    pub fn unmanaged(outcome: Outcome) -> Self {
        Self {
            outcome,
            manage: false,
        }
    }
}

impl From<Outcome> for StartResult {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            manage: true,
        }
    }
}

/// Modifier keys held when an event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub oskey: bool,
}

/// Event type as routed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEventKind {
    /// No particular event (supervisor-issued invocations outside dispatch).
    None,
    Timer(TimerId),
    Key { code: u32, pressed: bool },
    Button { code: u32, pressed: bool },
    MouseMove { x: i32, y: i32 },
}

/// Event delivered to a task entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEvent {
    pub kind: HostEventKind,
    pub modifiers: Modifiers,
}

impl HostEvent {
    pub fn none() -> Self {
        Self {
            kind: HostEventKind::None,
            modifiers: Modifiers::default(),
        }
    }

    pub fn timer(timer: TimerId) -> Self {
        Self {
            kind: HostEventKind::Timer(timer),
            modifiers: Modifiers::default(),
        }
    }

    pub fn key(code: u32, pressed: bool) -> Self {
        Self {
            kind: HostEventKind::Key { code, pressed },
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

impl Default for HostEvent {
    fn default() -> Self {
        Self::none()
    }
}

/// Execution context a task entry point runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    pub window: WindowId,
    pub anchor: Anchor,
    pub args: InvokeArgs,
}

impl TaskContext {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            anchor: Anchor::NONE,
            args: InvokeArgs::default(),
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Merges invocation args: overrides win over the ambient anchor and
    /// non-interactive contexts are coerced.
    pub(crate) fn invoked_with(mut self, args: InvokeArgs) -> Self {
        let args = args.coerced();
        if let Some(area) = args.overrides.area {
            self.anchor.area = Some(area);
        }
        if let Some(region) = args.overrides.region {
            self.anchor.region = Some(region);
        }
        self.args = args;
        self
    }
}

/// A long-running interactive routine kept alive by the supervisor.
pub trait ModalTask: Send + 'static {
    /// Called once per invocation. Returning a running, managed result installs
    /// the task's handler in `ctx.window`.
    fn start(&mut self, ctx: &TaskContext, event: &HostEvent) -> StartResult;

    /// Called for each event the host routes to this instance's handler.
    fn tick(&mut self, ctx: &TaskContext, event: &HostEvent) -> Outcome;
}
