//! # Host seams.
//!
//! The supervisor never touches host-owned memory directly. Everything it needs
//! from the host application goes through the narrow traits below:
//!
//! ```text
//!                ┌────────────────────────── Host ───────────────────────────┐
//!                │                                                           │
//!  Supervisor ──►│ HandlerStackReader  snapshot(window) -> [HandlerEntry]    │ (read-only)
//!                │ ModalHandlers       add_modal_handler / rebind_anchor     │ (stack writes)
//!                │ WindowRegistry      live_windows / active_window          │
//!                │ TimerService        add_timer / remove_timer              │
//!                │ HookRegistry        register_hook / unregister_hook       │
//!                └───────────────────────────────────────────────────────────┘
//! ```
//!
//! [`HandlerStackReader`] is the single place where privileged introspection of
//! the host's per-window handler stack happens. A real integration usually backs
//! it with an FFI call; [`sim::SimHost`] backs it with plain vectors.

pub mod sim;

use std::fmt;
use std::time::Duration;

use crate::tasks::TaskId;

/// Identifier of a host window (an independently event-dispatching unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win#{}", self.0)
    }
}

/// Identifier of a screen area inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaId(pub u64);

/// Identifier of a region inside an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(pub u64);

/// Handle of a host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Identifier the supervisor assigns to every managed task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Owning sub-region context a handler was bound to.
///
/// Region-sensitive tasks (drawing into one viewport, picking under the cursor)
/// rely on it, so a restart puts the previous anchor back onto the new handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Anchor {
    pub area: Option<AreaId>,
    pub region: Option<RegionId>,
}

impl Anchor {
    pub const NONE: Anchor = Anchor {
        area: None,
        region: None,
    };

    pub fn new(area: AreaId, region: RegionId) -> Self {
        Self {
            area: Some(area),
            region: Some(region),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area.is_none() && self.region.is_none()
    }
}

/// What the host knows about the owner of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerTag {
    /// A task with a readable identifier (managed or not).
    Task(TaskId),
    /// A UI handler (menus, popups, text fields).
    Ui,
    /// Anything the host cannot describe.
    Unknown,
}

/// One entry of a window's modal handler stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerEntry {
    pub tag: HandlerTag,
    /// Set for handlers pushed by the supervisor.
    pub instance: Option<InstanceId>,
    pub anchor: Anchor,
}

impl HandlerEntry {
    /// Entry for a supervised task instance.
    pub fn managed(task: TaskId, instance: InstanceId, anchor: Anchor) -> Self {
        Self {
            tag: HandlerTag::Task(task),
            instance: Some(instance),
            anchor,
        }
    }

    /// Entry for a task the supervisor does not own.
    pub fn foreign(task: TaskId) -> Self {
        Self {
            tag: HandlerTag::Task(task),
            instance: None,
            anchor: Anchor::NONE,
        }
    }

    pub fn ui() -> Self {
        Self {
            tag: HandlerTag::Ui,
            instance: None,
            anchor: Anchor::NONE,
        }
    }

    pub fn unknown() -> Self {
        Self {
            tag: HandlerTag::Unknown,
            instance: None,
            anchor: Anchor::NONE,
        }
    }

    /// Returns the task id if the entry has one.
    pub fn task(&self) -> Option<&TaskId> {
        match &self.tag {
            HandlerTag::Task(id) => Some(id),
            _ => None,
        }
    }
}

/// Host notifications the supervisor subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Per-frame notification delivered before the host updates a window.
    PreTick,
    /// A render session is starting (pre-tick stops being delivered).
    RenderInit,
    /// A render session completed.
    RenderComplete,
    /// A render session was cancelled.
    RenderCancel,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::PreTick,
        HookKind::RenderInit,
        HookKind::RenderComplete,
        HookKind::RenderCancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::PreTick => "pre_tick",
            HookKind::RenderInit => "render_init",
            HookKind::RenderComplete => "render_complete",
            HookKind::RenderCancel => "render_cancel",
        }
    }
}

/// Read-only view of the host's per-window handler stacks.
pub trait HandlerStackReader {
    /// Returns the window's handlers, topmost (first to receive events) first.
    ///
    /// Must return an empty vector for a window without handlers and for a
    /// window that is transiently invalid; never panics.
    fn snapshot(&self, window: WindowId) -> Vec<HandlerEntry>;
}

/// Write access to the host's handler stacks.
pub trait ModalHandlers {
    /// Pushes a handler on top of `window`'s stack.
    fn add_modal_handler(&mut self, window: WindowId, entry: HandlerEntry);

    /// Rewrites the anchor of the handler owned by `instance`.
    ///
    /// Returns `false` when no such handler exists.
    fn rebind_anchor(&mut self, window: WindowId, instance: InstanceId, anchor: Anchor) -> bool;
}

/// Enumeration of the host's windows. Never cached between ticks.
pub trait WindowRegistry {
    /// Currently valid windows, in host order, without duplicates.
    fn live_windows(&self) -> Vec<WindowId>;

    /// The host's current primary window, if any.
    fn active_window(&self) -> Option<WindowId>;
}

/// Host timers. A timer keeps firing every `interval` until removed.
pub trait TimerService {
    fn add_timer(&mut self, window: WindowId, interval: Duration) -> TimerId;
    fn remove_timer(&mut self, timer: TimerId);
}

/// Registration of host notification hooks.
pub trait HookRegistry {
    fn register_hook(&mut self, hook: HookKind);
    fn unregister_hook(&mut self, hook: HookKind);
}

/// Everything the supervisor needs from a host.
pub trait Host: HandlerStackReader + ModalHandlers + WindowRegistry + TimerService + HookRegistry {}

impl<T> Host for T where
    T: HandlerStackReader + ModalHandlers + WindowRegistry + TimerService + HookRegistry
{
}
