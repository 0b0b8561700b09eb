//! # In-memory host.
//!
//! [`SimHost`] implements every host seam with plain collections. It is what
//! the tests and the demo drive the supervisor with, and a reference for what
//! a real integration has to provide.
//!
//! Event delivery follows the usual modal-stack rules: handlers are visited
//! topmost first, a handler that does not pass the event through stops the
//! walk, and handlers that return a terminal outcome are popped.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::core::Supervisor;
use crate::host::{
    Anchor, HandlerEntry, HandlerStackReader, HandlerTag, HookKind, HookRegistry, InstanceId,
    ModalHandlers, TimerId, TimerService, WindowId, WindowRegistry,
};
use crate::tasks::{HostEvent, Outcome, TaskContext, TaskId};

#[derive(Debug, Clone, Copy)]
struct SimTimer {
    window: WindowId,
    interval: Duration,
}

/// Host simulation with windows, handler stacks, timers and hooks.
#[derive(Debug, Default)]
pub struct SimHost {
    windows: Vec<WindowId>,
    active: Option<WindowId>,
    stacks: HashMap<WindowId, Vec<HandlerEntry>>,
    timers: HashMap<TimerId, SimTimer>,
    hooks: HashSet<HookKind>,
    next_window: u64,
    next_timer: u64,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a window. The first window opened becomes the active one.
    pub fn open_window(&mut self) -> WindowId {
        self.next_window += 1;
        let id = WindowId(self.next_window);
        self.windows.push(id);
        self.stacks.insert(id, Vec::new());
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    /// Closes a window and drops its handler stack. Its timers stay until
    /// their owner removes them.
    pub fn close_window(&mut self, window: WindowId) {
        self.windows.retain(|w| *w != window);
        self.stacks.remove(&window);
        if self.active == Some(window) {
            self.active = self.windows.first().copied();
        }
    }

    pub fn set_active(&mut self, window: WindowId) {
        self.active = Some(window);
    }

    /// Pushes a handler owned by a task the supervisor does not manage.
    pub fn push_foreign(&mut self, window: WindowId, id: &str) {
        self.push(window, HandlerEntry::foreign(TaskId::from_host(id)));
    }

    /// Pushes a UI handler (menu, popup).
    pub fn push_ui(&mut self, window: WindowId) {
        self.push(window, HandlerEntry::ui());
    }

    pub fn push_unknown(&mut self, window: WindowId) {
        self.push(window, HandlerEntry::unknown());
    }

    /// Pushes an arbitrary entry on top of `window`'s stack.
    pub fn push(&mut self, window: WindowId, entry: HandlerEntry) {
        if let Some(stack) = self.stacks.get_mut(&window) {
            stack.insert(0, entry);
        }
    }

    /// Pops the topmost handler.
    pub fn pop(&mut self, window: WindowId) -> Option<HandlerEntry> {
        let stack = self.stacks.get_mut(&window)?;
        if stack.is_empty() {
            None
        } else {
            Some(stack.remove(0))
        }
    }

    /// Removes the first non-managed handler (UI or foreign task) from the top.
    pub fn dismiss_foreign(&mut self, window: WindowId) -> Option<HandlerEntry> {
        let stack = self.stacks.get_mut(&window)?;
        let pos = stack.iter().position(|e| e.instance.is_none() && e.tag != HandlerTag::Unknown)?;
        Some(stack.remove(pos))
    }

    /// Current stack of `window`, topmost first.
    pub fn handlers(&self, window: WindowId) -> &[HandlerEntry] {
        self.stacks.get(&window).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Timers attached to `window`, sorted by id.
    pub fn timers_on(&self, window: WindowId) -> Vec<TimerId> {
        let mut ids: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, t)| t.window == window)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable_by_key(|t| t.0);
        ids
    }

    pub fn timer_interval(&self, timer: TimerId) -> Option<Duration> {
        self.timers.get(&timer).map(|t| t.interval)
    }

    pub fn hook_registered(&self, hook: HookKind) -> bool {
        self.hooks.contains(&hook)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Delivers `event` to `window`'s handlers, topmost first.
    ///
    /// Managed handlers go through [`Supervisor::dispatch`]; foreign handlers
    /// swallow the event. Returns the outcomes of the managed handlers reached.
    pub fn deliver(&mut self, sup: &mut Supervisor, window: WindowId, event: &HostEvent) -> Vec<Outcome> {
        let managed: HashSet<TaskId> = sup.kinds().cloned().collect();
        let snapshot = self.snapshot(window);
        let mut outcomes = Vec::new();

        for entry in snapshot {
            match (&entry.tag, entry.instance) {
                (HandlerTag::Unknown, _) => continue,
                (HandlerTag::Task(id), Some(instance)) if managed.contains(id) => {
                    let ctx = TaskContext::new(window).with_anchor(entry.anchor);
                    let outcome = sup.dispatch(self, id, instance, &ctx, event);
                    if outcome.is_terminal() {
                        self.remove_instance(window, instance);
                    }
                    outcomes.push(outcome);
                    if !outcome.pass_through {
                        break;
                    }
                }
                _ => break,
            }
        }
        outcomes
    }

    /// Host frame for `window`: runs the pre-tick hook when registered.
    pub fn frame(&mut self, sup: &mut Supervisor, window: WindowId, event: &HostEvent) -> bool {
        if !self.hook_registered(HookKind::PreTick) {
            return false;
        }
        sup.pre_tick(self, window, event);
        true
    }

    /// Fires `timer` once. Returns `false` for an unknown timer.
    pub fn fire_timer(&mut self, sup: &mut Supervisor, timer: TimerId) -> bool {
        let Some(t) = self.timers.get(&timer).copied() else {
            return false;
        };
        sup.on_timer(self, t.window, timer);
        true
    }

    /// Fires every timer currently attached to `window`.
    pub fn fire_timers_on(&mut self, sup: &mut Supervisor, window: WindowId) -> usize {
        let ids = self.timers_on(window);
        ids.into_iter().filter(|t| self.fire_timer(sup, *t)).count()
    }

    /// Starts a render session when the render-init hook is registered.
    pub fn render_init(&mut self, sup: &mut Supervisor) -> bool {
        if !self.hook_registered(HookKind::RenderInit) {
            return false;
        }
        sup.on_render_init(self);
        true
    }

    pub fn render_complete(&mut self, sup: &mut Supervisor) -> bool {
        if !self.hook_registered(HookKind::RenderComplete) {
            return false;
        }
        sup.on_render_complete(self);
        true
    }

    pub fn render_cancel(&mut self, sup: &mut Supervisor) -> bool {
        if !self.hook_registered(HookKind::RenderCancel) {
            return false;
        }
        sup.on_render_cancel(self);
        true
    }

    fn remove_instance(&mut self, window: WindowId, instance: InstanceId) {
        if let Some(stack) = self.stacks.get_mut(&window) {
            if let Some(pos) = stack.iter().position(|e| e.instance == Some(instance)) {
                stack.remove(pos);
            }
        }
    }
}

impl HandlerStackReader for SimHost {
    fn snapshot(&self, window: WindowId) -> Vec<HandlerEntry> {
        self.handlers(window).to_vec()
    }
}

impl ModalHandlers for SimHost {
    fn add_modal_handler(&mut self, window: WindowId, entry: HandlerEntry) {
        self.push(window, entry);
    }

    fn rebind_anchor(&mut self, window: WindowId, instance: InstanceId, anchor: Anchor) -> bool {
        let Some(stack) = self.stacks.get_mut(&window) else {
            return false;
        };
        match stack.iter_mut().find(|e| e.instance == Some(instance)) {
            Some(entry) => {
                entry.anchor = anchor;
                true
            }
            None => false,
        }
    }
}

impl WindowRegistry for SimHost {
    fn live_windows(&self) -> Vec<WindowId> {
        self.windows.clone()
    }

    fn active_window(&self) -> Option<WindowId> {
        self.active
    }
}

impl TimerService for SimHost {
    fn add_timer(&mut self, window: WindowId, interval: Duration) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.timers.insert(id, SimTimer { window, interval });
        id
    }

    fn remove_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }
}

impl HookRegistry for SimHost {
    fn register_hook(&mut self, hook: HookKind) {
        self.hooks.insert(hook);
    }

    fn unregister_hook(&mut self, hook: HookKind) {
        self.hooks.remove(&hook);
    }
}
