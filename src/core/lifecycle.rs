//! # Lifecycle adapters around a task's two entry points.
//!
//! ```text
//! invoke(kind, ctx, event)                        dispatch(kind, instance, ctx, event)
//!   ├─ purge                                        ├─ purge, cancel pending exit timer
//!   ├─ status != Normal && running?                 ├─ superseded instance?
//!   │     yes ─► handover callback                  │     yes ─► Cancelled + pass-through
//!   │            Running + pass-through             ├─ task.tick
//!   │     no  ─► task.start                         └─ terminal ─► Exit
//!   ├─ manage = false ─► return as is
//!   ├─ terminal ─► Exit
//!   └─ running  ─► push handler, record instance,
//!                  ensure hooks and render timers
//! ```
//!
//! Exit removes the instance (every window when `all_windows`) and parks an exit
//! timer per window. The slot counts as free for auto-start only once the timer
//! fires and the host has unwound the old handler.

use crate::core::registry::{Instance, Live, SupervisorStatus};
use crate::core::stack::{self, StackVerdict};
use crate::core::supervisor::Supervisor;
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::host::{Anchor, HandlerEntry, HandlerTag, Host, InstanceId, TimerId, WindowId};
use crate::tasks::{Handover, HostEvent, Outcome, RunState, StartResult, TaskContext, TaskId};

/// What one pass through the invoke adapter produced.
pub(super) struct Invocation {
    pub outcome: Outcome,
    /// Set when a new instance was recorded.
    pub instance: Option<InstanceId>,
}

impl Supervisor {
    /// Invoke adapter: starts `id` in `ctx.window`.
    ///
    /// This is the user-facing entry point. The returned outcome is what the
    /// host should treat as the result of the invocation.
    pub fn invoke<H: Host>(
        &mut self,
        host: &mut H,
        id: &str,
        ctx: &TaskContext,
        event: &HostEvent,
    ) -> Result<Outcome, RuntimeError> {
        let idx = self
            .registry
            .index_of(id)
            .ok_or_else(|| RuntimeError::UnknownKind { id: id.to_string() })?;

        let ctx = ctx.invoked_with(ctx.args);
        let started = self.invoke_kind(host, idx, &ctx, event);
        if let Some(instance) = started.instance {
            let kind = self.registry.get(idx);
            tracing::info!(task = %kind.id, window = %ctx.window, %instance, "task started");
            self.bus.publish(
                Event::new(EventKind::TaskStarted)
                    .with_task(kind.id.shared())
                    .with_window(ctx.window)
                    .with_instance(instance),
            );
        }
        Ok(started.outcome)
    }

    /// Tick adapter: routes one host event to `instance` of kind `id`.
    ///
    /// Events for unknown kinds or superseded instances are answered with
    /// cancelled + pass-through so the host drops the stale handler.
    pub fn dispatch<H: Host>(
        &mut self,
        host: &mut H,
        id: &TaskId,
        instance: InstanceId,
        ctx: &TaskContext,
        event: &HostEvent,
    ) -> Outcome {
        let Some(idx) = self.registry.position(id) else {
            return Outcome::cancelled_pass_through();
        };
        let window = ctx.window;

        let live = Live::read(host);
        self.purge_kind(host, idx, &live);

        let kind = self.registry.get_mut(idx);
        if let Some(timer) = kind.state.pending_exit.remove(&window) {
            host.remove_timer(timer);
        }

        let Some(current) = kind.state.instances.get_mut(&window) else {
            self.superseded(idx, window, instance);
            return Outcome::cancelled_pass_through();
        };
        if current.id != instance {
            self.superseded(idx, window, instance);
            return Outcome::cancelled_pass_through();
        }

        let outcome = current.task.tick(ctx, event);
        if outcome.is_terminal() {
            self.exit(host, idx, window, exit_reason(outcome));
        }
        outcome
    }

    pub(super) fn invoke_kind<H: Host>(
        &mut self,
        host: &mut H,
        idx: usize,
        ctx: &TaskContext,
        event: &HostEvent,
    ) -> Invocation {
        let window = ctx.window;
        let live = Live::read(host);
        self.purge_kind(host, idx, &live);

        let instance = self.next_instance_id();
        let kind = self.registry.get(idx);
        let status = kind.state.status;
        let supervised = status != SupervisorStatus::Normal && kind.state.is_running(&live);
        let mut task = kind.spec.spawn();

        let result = if supervised {
            let previous = match status {
                SupervisorStatus::Restarting => kind.state.instances.get(&window).map(|i| i.id),
                _ => None,
            };
            if let Some(callback) = kind.spec.callback() {
                callback(&mut Handover {
                    ctx,
                    event,
                    instance,
                    task: task.as_mut(),
                    previous,
                });
            }
            StartResult::from(Outcome::running_pass_through())
        } else {
            task.start(ctx, event)
        };

        if !result.manage {
            return Invocation {
                outcome: result.outcome,
                instance: None,
            };
        }
        if result.outcome.is_terminal() {
            self.exit(host, idx, window, exit_reason(result.outcome));
            return Invocation {
                outcome: result.outcome,
                instance: None,
            };
        }

        let kind = self.registry.get_mut(idx);
        host.add_modal_handler(window, HandlerEntry::managed(kind.id.clone(), instance, ctx.anchor));
        kind.state.instances.insert(
            window,
            Instance {
                id: instance,
                task,
                anchor: ctx.anchor,
            },
        );

        self.ensure_hooks(host);
        let live = Live::read(host);
        self.sync_render_timers(host, &live);

        Invocation {
            outcome: result.outcome,
            instance: Some(instance),
        }
    }

    /// Exit bookkeeping for `window`, or for every window when the kind spans
    /// all windows.
    pub(super) fn exit<H: Host>(&mut self, host: &mut H, idx: usize, window: WindowId, reason: &'static str) {
        let delay = self.cfg.exit_timer_delay;
        let kind = self.registry.get_mut(idx);

        let mut windows: Vec<WindowId> = if kind.spec.all_windows() {
            kind.state.instances.keys().copied().collect()
        } else {
            Vec::new()
        };
        if !windows.contains(&window) {
            windows.push(window);
        }
        windows.sort_unstable();

        for w in windows {
            let removed = kind.state.instances.remove(&w);
            if !kind.state.pending_exit.contains_key(&w) {
                let timer = host.add_timer(w, delay);
                kind.state.pending_exit.insert(w, timer);
            }
            let mut ev = Event::new(EventKind::TaskExited)
                .with_task(kind.id.shared())
                .with_window(w)
                .with_reason(reason);
            if let Some(instance) = removed {
                ev = ev.with_instance(instance.id);
            }
            tracing::info!(task = %kind.id, window = %w, reason, "task exited");
            self.bus.publish(ev);
        }

        let live = Live::read(host);
        if !self.registry.any_running(&live) {
            self.render.release(host, &self.bus);
        }
    }

    /// Confirms a pending exit once the host no longer carries a stale handler
    /// of this kind in `window`.
    pub(super) fn confirm_exit<H: Host>(&mut self, host: &mut H, idx: usize, window: WindowId, timer: TimerId) {
        let kind = self.registry.get(idx);
        if kind.state.pending_exit.get(&window) != Some(&timer) {
            return;
        }
        let current = kind.state.instances.get(&window).map(|i| i.id);
        let unwound = host
            .snapshot(window)
            .iter()
            .filter(|e| e.task() == Some(&kind.id))
            .all(|e| e.instance.is_some() && e.instance == current);
        if !unwound {
            return;
        }

        let kind = self.registry.get_mut(idx);
        kind.state.pending_exit.remove(&window);
        host.remove_timer(timer);
        self.bus.publish(
            Event::new(EventKind::ExitConfirmed)
                .with_task(kind.id.shared())
                .with_window(window),
        );
    }

    /// Handler-stack check for a kind that has an instance in `window`.
    pub(super) fn check_stack<H: Host>(&mut self, host: &mut H, idx: usize, window: WindowId, event: &HostEvent) {
        let registry = &self.registry;
        let kind = registry.get(idx);
        let Some(recorded) = kind.state.instances.get(&window) else {
            return;
        };
        let recorded_anchor = recorded.anchor;
        let snapshot = host.snapshot(window);
        let verdict = stack::inspect(&snapshot, &kind.id, recorded.id, |id| registry.is_managed(id));

        match verdict {
            StackVerdict::Anchored { anchor, top } => {
                if top && anchor != recorded_anchor {
                    if let Some(inst) = self.registry.get_mut(idx).state.instances.get_mut(&window) {
                        inst.anchor = anchor;
                    }
                }
            }
            StackVerdict::Buried { anchor, by } => {
                if kind.spec.restart() {
                    let previous = anchor.unwrap_or(recorded_anchor);
                    self.restart(host, idx, window, event, previous, &by);
                }
            }
            StackVerdict::Desync => {
                let kind = self.registry.get_mut(idx);
                let dropped = kind.state.instances.remove(&window);
                kind.state.resync.insert(window, recorded_anchor);
                tracing::warn!(task = %kind.id, %window, "handler stack shows the instance twice");
                let mut ev = Event::new(EventKind::HostDesync)
                    .with_task(kind.id.shared())
                    .with_window(window)
                    .with_reason("instance listed twice");
                if let Some(inst) = dropped {
                    ev = ev.with_instance(inst.id);
                }
                self.bus.publish(ev);
            }
            StackVerdict::Missing => {}
        }
    }

    /// Auto-start on a window the kind does not run in yet.
    pub(super) fn auto_start<H: Host>(&mut self, host: &mut H, idx: usize, window: WindowId, event: &HostEvent) {
        let kind = self.registry.get(idx);
        let ctx = TaskContext::new(window).invoked_with(kind.spec.args());
        self.start_unattended(host, idx, &ctx, event, None);
    }

    /// Starts a fresh instance in a window whose bookkeeping was dropped on
    /// a desync, bound to the anchor the dropped instance had.
    pub(super) fn reestablish<H: Host>(&mut self, host: &mut H, idx: usize, window: WindowId, event: &HostEvent) {
        let kind = self.registry.get_mut(idx);
        let Some(anchor) = kind.state.resync.remove(&window) else {
            return;
        };
        let ctx = TaskContext::new(window)
            .with_anchor(anchor)
            .invoked_with(kind.spec.args());
        self.start_unattended(host, idx, &ctx, event, Some("host desync"));
    }

    fn start_unattended<H: Host>(
        &mut self,
        host: &mut H,
        idx: usize,
        ctx: &TaskContext,
        event: &HostEvent,
        reason: Option<&'static str>,
    ) {
        let window = ctx.window;
        let kind = self.registry.get_mut(idx);
        if kind.state.pending_exit.contains_key(&window) {
            return;
        }

        kind.state.status = SupervisorStatus::AutoStarting;
        let started = self.invoke_kind(host, idx, ctx, event);
        let kind = self.registry.get_mut(idx);
        kind.state.status = SupervisorStatus::Normal;

        if let Some(instance) = started.instance {
            tracing::info!(task = %kind.id, %window, %instance, "task auto-started");
            let mut ev = Event::new(EventKind::TaskAutoStarted)
                .with_task(kind.id.shared())
                .with_window(window)
                .with_instance(instance);
            if let Some(reason) = reason {
                ev = ev.with_reason(reason);
            }
            self.bus.publish(ev);
        }
    }

    fn restart<H: Host>(
        &mut self,
        host: &mut H,
        idx: usize,
        window: WindowId,
        event: &HostEvent,
        previous: Anchor,
        by: &HandlerTag,
    ) {
        let kind = self.registry.get_mut(idx);
        let ctx = TaskContext::new(window).invoked_with(kind.spec.args());
        let before = host.snapshot(window).len();

        kind.state.status = SupervisorStatus::Restarting;
        let started = self.invoke_kind(host, idx, &ctx, event);
        self.registry.get_mut(idx).state.status = SupervisorStatus::Normal;

        let Some(instance) = started.instance else {
            return;
        };

        if self.cfg.rebind_anchor_on_restart && !previous.is_empty() && previous != ctx.anchor {
            let stack = host.snapshot(window);
            let pushed = stack.len() == before + 1
                && stack.first().and_then(|e| e.instance) == Some(instance);
            if pushed && host.rebind_anchor(window, instance, previous) {
                if let Some(inst) = self.registry.get_mut(idx).state.instances.get_mut(&window) {
                    inst.anchor = previous;
                }
            }
        }

        let kind = self.registry.get(idx);
        let reason = match by {
            HandlerTag::Task(id) => format!("buried by {id}"),
            HandlerTag::Ui => "buried by UI".to_string(),
            HandlerTag::Unknown => "buried".to_string(),
        };
        tracing::info!(task = %kind.id, %window, %instance, %reason, "task restarted");
        self.bus.publish(
            Event::new(EventKind::TaskRestarted)
                .with_task(kind.id.shared())
                .with_window(window)
                .with_instance(instance)
                .with_reason(reason),
        );
    }

    fn superseded(&self, idx: usize, window: WindowId, instance: InstanceId) {
        let kind = self.registry.get(idx);
        tracing::debug!(task = %kind.id, %window, %instance, "late event for a superseded instance");
        self.bus.publish(
            Event::new(EventKind::InstanceSuperseded)
                .with_task(kind.id.shared())
                .with_window(window)
                .with_instance(instance),
        );
    }
}

fn exit_reason(outcome: Outcome) -> &'static str {
    match outcome.state {
        RunState::Cancelled => "cancelled",
        _ => "finished",
    }
}
