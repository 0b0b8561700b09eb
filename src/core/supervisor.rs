//! # Supervisor: keeps managed modal tasks alive, exactly once per window.
//!
//! The [`Supervisor`] owns every piece of process-wide state: the kind
//! registry (one `SupervisorState` per kind), the render-session timer pool,
//! the set of host hooks it registered, and the event bus.
//!
//! ## Host wiring
//! ```text
//! Host                               Supervisor
//! ────                               ──────────
//! user starts a task          ──►    invoke(kind, ctx, event)        (invoke adapter)
//! event routed to a handler   ──►    dispatch(kind, instance, ...)   (tick adapter)
//! PreTick hook (per window)   ──►    pre_tick(window, event)
//! timer fired                 ──►    on_timer(window, timer)
//! RenderInit / Complete / Cancel ─►  on_render_init / on_render_complete / on_render_cancel
//! host shutting down          ──►    terminate()
//! ```
//!
//! ## Per-window decision pass (`pre_tick`, render timers)
//! ```text
//! purge dead windows (every kind, render pool)
//! for kind in registration order:
//!   ├─ window marked by a desync ─► fresh instance on the old anchor
//!   ├─ not running anywhere ─► skip
//!   ├─ instance in window ─► inspect stack
//!   │     ├─ Buried + restart ─► Restart (status = Restarting)
//!   │     ├─ Desync          ─► drop window bookkeeping, mark window
//!   │     └─ Anchored        ─► refresh anchor when topmost
//!   └─ no instance, all_windows, window is primary ─► Auto-Start (status = AutoStarting)
//! render session active ─► one timer per window at the finest period
//! nothing running or marked ─► unregister PreTick, release render timers
//! ```
//!
//! Everything runs synchronously on the host thread; "waiting" is always a
//! future tick or timer. No entry point except [`Supervisor::invoke`] and
//! [`Supervisor::register`] returns an error.
//!
//! ## Example
//! ```rust
//! use modalvisor::{
//!     HostEvent, ManagedTaskKind, ModalFn, Outcome, Supervisor, SupervisorConfig, TaskContext,
//!     host::sim::SimHost,
//! };
//!
//! let mut host = SimHost::new();
//! let w1 = host.open_window();
//!
//! let mut sup = Supervisor::new(SupervisorConfig::default());
//! sup.register(ManagedTaskKind::new("view3d.screencast_keys", || {
//!     ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running_pass_through())
//! }))
//! .unwrap();
//!
//! let ctx = TaskContext::new(w1);
//! sup.invoke(&mut host, "view3d.screencast_keys", &ctx, &HostEvent::none()).unwrap();
//! assert!(sup.is_running(&host, "view3d.screencast_keys", Some(w1)));
//!
//! let w2 = host.open_window();
//! host.set_active(w2);
//! sup.pre_tick(&mut host, w2, &HostEvent::none());
//! assert!(sup.is_running(&host, "view3d.screencast_keys", Some(w2)));
//!
//! sup.terminate(&mut host);
//! assert_eq!(host.timer_count(), 0);
//! assert_eq!(host.hook_count(), 0);
//! ```

use std::collections::HashSet;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::registry::{Live, Registry, SupervisorStatus};
use crate::core::render::RenderPool;
use crate::error::RegistrationError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{Anchor, Host, HookKind, InstanceId, TimerId, WindowId, WindowRegistry};
use crate::tasks::{HostEvent, ManagedTaskKind, TaskId};

/// Supervisor of managed modal tasks.
pub struct Supervisor {
    pub(super) cfg: SupervisorConfig,
    pub(super) bus: Bus,
    pub(super) registry: Registry,
    pub(super) render: RenderPool,
    hooks: HashSet<HookKind>,
    next_instance: u64,
    listener: Option<CancellationToken>,
}

impl Supervisor {
    /// Creates a supervisor without subscribers.
    pub fn new(cfg: SupervisorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self::new_internal(cfg, bus, None)
    }

    /// Returns a builder for a supervisor with subscribers.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        listener: Option<CancellationToken>,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry: Registry::default(),
            render: RenderPool::default(),
            hooks: HashSet::new(),
            next_instance: 0,
            listener,
        }
    }

    /// Registers a kind. Registration order is the per-tick evaluation order.
    pub fn register(&mut self, kind: ManagedTaskKind) -> Result<TaskId, RegistrationError> {
        let id = self.registry.register(kind, &self.cfg)?.clone();
        self.bus
            .publish(Event::new(EventKind::KindRegistered).with_task(id.shared()));
        Ok(id)
    }

    /// Receiver observing every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Per-frame pre-tick hook, called by the host for `window`.
    ///
    /// `event` is the window's current event state; it is handed to tasks the
    /// supervisor invokes during this pass.
    pub fn pre_tick<H: Host>(&mut self, host: &mut H, window: WindowId, event: &HostEvent) {
        self.reconcile(host, window, event);
    }

    /// Host timer notification.
    ///
    /// Exit timers confirm pending exits; render timers run the same decision
    /// pass as [`pre_tick`](Self::pre_tick). Other timers are ignored.
    pub fn on_timer<H: Host>(&mut self, host: &mut H, window: WindowId, timer: TimerId) {
        let live = Live::read(host);
        self.purge_all(host, &live);
        for idx in 0..self.registry.len() {
            self.confirm_exit(host, idx, window, timer);
        }
        if self.render.is_active() && self.render.owns(window, timer) {
            self.reconcile(host, window, &HostEvent::timer(timer));
        }
    }

    /// The host started rendering; pre-tick notifications stop until it ends.
    pub fn on_render_init<H: Host>(&mut self, host: &mut H) {
        self.render.set_active(true);
        self.bus.publish(Event::new(EventKind::RenderSessionStarted));
        self.register_hook(host, HookKind::RenderComplete);
        self.register_hook(host, HookKind::RenderCancel);

        let live = Live::read(host);
        self.purge_all(host, &live);
        self.sync_render_timers(host, &live);
    }

    pub fn on_render_complete<H: Host>(&mut self, host: &mut H) {
        self.end_render(host, "complete");
    }

    pub fn on_render_cancel<H: Host>(&mut self, host: &mut H) {
        self.end_render(host, "cancel");
    }

    /// Abrupt full shutdown.
    ///
    /// Removes every hook and timer and clears all bookkeeping without running
    /// exit logic. Registered kinds stay registered.
    pub fn terminate<H: Host>(&mut self, host: &mut H) {
        for hook in HookKind::ALL {
            self.unregister_hook(host, hook);
        }
        self.render.release(host, &self.bus);
        self.render.set_active(false);
        for kind in self.registry.iter_mut() {
            kind.state.clear(host);
        }
        tracing::debug!("supervisor terminated");
        self.bus.publish(Event::new(EventKind::Terminated));
        if let Some(token) = self.listener.take() {
            token.cancel();
        }
    }

    // ---------------------------
    // Queries
    // ---------------------------

    /// `true` if the kind runs in `window`, or in any live window when `None`.
    pub fn is_running(&self, host: &impl WindowRegistry, id: &str, window: Option<WindowId>) -> bool {
        let Some(idx) = self.registry.index_of(id) else {
            return false;
        };
        let state = &self.registry.get(idx).state;
        match window {
            Some(w) => state.instances.contains_key(&w),
            None => state.is_running(&Live::read(host)),
        }
    }

    /// The host's current primary window.
    pub fn active_window(&self, host: &impl WindowRegistry) -> Option<WindowId> {
        host.active_window()
    }

    /// Current instance of the kind in `window`.
    pub fn instance(&self, id: &str, window: WindowId) -> Option<InstanceId> {
        let idx = self.registry.index_of(id)?;
        self.registry
            .get(idx)
            .state
            .instances
            .get(&window)
            .map(|i| i.id)
    }

    /// Anchor recorded for the kind's instance in `window`.
    pub fn anchor(&self, id: &str, window: WindowId) -> Option<Anchor> {
        let idx = self.registry.index_of(id)?;
        self.registry
            .get(idx)
            .state
            .instances
            .get(&window)
            .map(|i| i.anchor)
    }

    /// Windows the kind has an instance in, sorted.
    pub fn windows(&self, id: &str) -> Vec<WindowId> {
        let Some(idx) = self.registry.index_of(id) else {
            return Vec::new();
        };
        let mut windows: Vec<WindowId> = self
            .registry
            .get(idx)
            .state
            .instances
            .keys()
            .copied()
            .collect();
        windows.sort_unstable();
        windows
    }

    /// `true` while an exit in `window` waits for the host to unwind.
    pub fn is_exit_pending(&self, id: &str, window: WindowId) -> bool {
        self.registry
            .index_of(id)
            .is_some_and(|idx| self.registry.get(idx).state.pending_exit.contains_key(&window))
    }

    pub fn status(&self, id: &str) -> Option<SupervisorStatus> {
        let idx = self.registry.index_of(id)?;
        Some(self.registry.get(idx).state.status)
    }

    pub fn render_session_active(&self) -> bool {
        self.render.is_active()
    }

    pub fn render_timer_count(&self) -> usize {
        self.render.len()
    }

    /// `true` if the supervisor currently holds `hook` registered with the host.
    pub fn has_hook(&self, hook: HookKind) -> bool {
        self.hooks.contains(&hook)
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &TaskId> {
        self.registry.iter().map(|k| &k.id)
    }

    // ---------------------------
    // Decision pass
    // ---------------------------

    fn reconcile<H: Host>(&mut self, host: &mut H, window: WindowId, event: &HostEvent) {
        let live = Live::read(host);
        self.purge_all(host, &live);

        if live.contains(&window) {
            let primary = host.active_window() == Some(window);
            for idx in 0..self.registry.len() {
                let kind = self.registry.get(idx);
                if kind.state.resync.contains_key(&window) {
                    self.reestablish(host, idx, window, event);
                    continue;
                }
                if !kind.state.is_running(&live) {
                    continue;
                }
                if kind.state.instances.contains_key(&window) {
                    self.check_stack(host, idx, window, event);
                } else if kind.spec.all_windows() && primary {
                    self.auto_start(host, idx, window, event);
                }
            }
        }

        self.sync_render_timers(host, &live);
        self.evict_if_idle(host, &live);
    }

    fn end_render<H: Host>(&mut self, host: &mut H, reason: &'static str) {
        let live = Live::read(host);
        self.render.release(host, &self.bus);
        self.render.set_active(false);
        if !self.registry.any_running(&live) {
            self.unregister_hook(host, HookKind::RenderInit);
        }
        self.unregister_hook(host, HookKind::RenderComplete);
        self.unregister_hook(host, HookKind::RenderCancel);
        self.bus
            .publish(Event::new(EventKind::RenderSessionEnded).with_reason(reason));
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    pub(super) fn next_instance_id(&mut self) -> InstanceId {
        self.next_instance += 1;
        InstanceId(self.next_instance)
    }

    /// Purges dead windows from every kind and from the render pool.
    pub(super) fn purge_all<H: Host>(&mut self, host: &mut H, live: &Live) {
        self.render.purge(host, live, &self.bus);
        for idx in 0..self.registry.len() {
            self.purge_kind(host, idx, live);
        }
    }

    pub(super) fn purge_kind<H: Host>(&mut self, host: &mut H, idx: usize, live: &Live) {
        let kind = self.registry.get_mut(idx);
        for window in kind.state.purge(live, host) {
            self.bus.publish(
                Event::new(EventKind::WindowPurged)
                    .with_task(kind.id.shared())
                    .with_window(window),
            );
        }
    }

    /// Keeps render timers in line with the running kinds.
    pub(super) fn sync_render_timers<H: Host>(&mut self, host: &mut H, live: &Live) {
        if !self.render.is_active() {
            return;
        }
        match self.registry.min_render_tick(live) {
            Some(interval) => self.render.ensure(host, live, interval, &self.bus),
            None => self.render.release(host, &self.bus),
        }
    }

    /// Registers the hooks a running kind needs.
    pub(super) fn ensure_hooks<H: Host>(&mut self, host: &mut H) {
        self.register_hook(host, HookKind::PreTick);
        self.register_hook(host, HookKind::RenderInit);
    }

    /// Drops idle overhead once nothing runs anywhere.
    pub(super) fn evict_if_idle<H: Host>(&mut self, host: &mut H, live: &Live) {
        if self.registry.any_active(live) {
            return;
        }
        self.render.release(host, &self.bus);
        self.unregister_hook(host, HookKind::PreTick);
    }

    fn register_hook<H: Host>(&mut self, host: &mut H, hook: HookKind) {
        if self.hooks.insert(hook) {
            host.register_hook(hook);
            tracing::debug!(hook = hook.as_str(), "hook registered");
            self.bus
                .publish(Event::new(EventKind::HookRegistered).with_reason(hook.as_str()));
        }
    }

    fn unregister_hook<H: Host>(&mut self, host: &mut H, hook: HookKind) {
        if self.hooks.remove(&hook) {
            host.unregister_hook(hook);
            tracing::debug!(hook = hook.as_str(), "hook unregistered");
            self.bus
                .publish(Event::new(EventKind::HookUnregistered).with_reason(hook.as_str()));
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(token) = self.listener.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::error::RuntimeError;
    use crate::host::sim::SimHost;
    use crate::host::{AreaId, HandlerEntry, RegionId, WindowRegistry};
    use crate::tasks::{HostEventKind, ModalFn, Outcome, StartResult, TaskContext};

    const KEYS: &str = "view3d.screencast_keys";
    const ESC: u32 = 27;

    fn background(id: &str) -> ManagedTaskKind {
        ManagedTaskKind::new(id, || {
            ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running_pass_through())
        })
    }

    /// Background task that finishes on Escape.
    fn escapable(id: &str) -> ManagedTaskKind {
        ManagedTaskKind::new(id, || {
            ModalFn::new(|_: &TaskContext, e: &HostEvent| match e.kind {
                HostEventKind::Key { code: ESC, pressed: true } => Outcome::finished(),
                _ => Outcome::running_pass_through(),
            })
        })
    }

    fn setup(kind: ManagedTaskKind) -> (SimHost, Supervisor, WindowId) {
        let mut host = SimHost::new();
        let w1 = host.open_window();
        let mut sup = Supervisor::new(SupervisorConfig::default());
        sup.register(kind).unwrap();
        (host, sup, w1)
    }

    fn start(sup: &mut Supervisor, host: &mut SimHost, id: &str, ctx: TaskContext) -> Outcome {
        sup.invoke(host, id, &ctx, &HostEvent::none()).unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn count(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    fn area_a() -> Anchor {
        Anchor::new(AreaId(3), RegionId(4))
    }

    #[test]
    fn invoke_installs_handler_and_hooks() {
        let (mut host, mut sup, w1) = setup(background(KEYS));

        let out = start(&mut sup, &mut host, KEYS, TaskContext::new(w1));

        assert_eq!(out, Outcome::running_pass_through());
        assert_eq!(host.handlers(w1).len(), 1);
        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(1)));
        assert!(sup.is_running(&host, KEYS, Some(w1)));
        assert!(sup.is_running(&host, "VIEW3D_OT_screencast_keys", None));
        assert!(host.hook_registered(HookKind::PreTick));
        assert!(host.hook_registered(HookKind::RenderInit));
        assert_eq!(sup.active_window(&host), Some(w1));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        let err = sup
            .invoke(&mut host, "mesh.knife", &TaskContext::new(w1), &HostEvent::none())
            .unwrap_err();
        assert_eq!(err, RuntimeError::UnknownKind { id: "mesh.knife".into() });
    }

    #[test]
    fn registration_errors_surface_from_supervisor() {
        let mut sup = Supervisor::new(SupervisorConfig::default());
        assert!(matches!(
            sup.register(background("nodot")),
            Err(RegistrationError::InvalidId { .. })
        ));
        sup.register(background(KEYS)).unwrap();
        assert!(matches!(
            sup.register(background("VIEW3D_OT_screencast_keys")),
            Err(RegistrationError::DuplicateKind { .. })
        ));
        assert_eq!(sup.kinds().count(), 1);
    }

    #[test]
    fn auto_start_follows_the_active_window() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();

        // not primary yet
        assert!(host.frame(&mut sup, w2, &HostEvent::none()));
        assert!(!sup.is_running(&host, KEYS, Some(w2)));

        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        assert!(sup.is_running(&host, KEYS, Some(w2)));
        assert_eq!(sup.status(KEYS), Some(SupervisorStatus::Normal));

        // further ticks keep exactly one handler
        host.frame(&mut sup, w2, &HostEvent::none());
        host.frame(&mut sup, w2, &HostEvent::none());
        assert_eq!(host.handlers(w2).len(), 1);
        assert_eq!(sup.windows(KEYS), vec![w1, w2]);
    }

    #[test]
    fn single_window_kind_is_not_auto_started() {
        let (mut host, mut sup, w1) = setup(background(KEYS).with_all_windows(false));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);

        host.frame(&mut sup, w2, &HostEvent::none());
        host.frame(&mut sup, w2, &HostEvent::none());

        assert!(!sup.is_running(&host, KEYS, Some(w2)));
        assert!(host.handlers(w2).is_empty());
    }

    #[test]
    fn buried_task_restarts_on_its_anchor() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        let mut rx = sup.subscribe();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1).with_anchor(area_a()));

        host.push_ui(w1);
        host.frame(&mut sup, w1, &HostEvent::none());

        let top = &host.handlers(w1)[0];
        assert_eq!(top.instance, Some(InstanceId(2)));
        assert_eq!(top.anchor, area_a());
        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(2)));
        assert_eq!(sup.anchor(KEYS, w1), Some(area_a()));

        let events = drain(&mut rx);
        let restarted: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::TaskRestarted)
            .collect();
        assert_eq!(restarted.len(), 1);
        assert_eq!(restarted[0].reason.as_deref(), Some("buried by UI"));

        // the next tick sees the task on top and leaves it alone
        host.frame(&mut sup, w1, &HostEvent::none());
        assert_eq!(count(&drain(&mut rx), EventKind::TaskRestarted), 0);
    }

    #[test]
    fn superseded_instance_is_cancelled_on_its_next_event() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        host.push_ui(w1);
        host.frame(&mut sup, w1, &HostEvent::none());
        assert_eq!(host.handlers(w1).len(), 3);

        host.dismiss_foreign(w1);
        let outcomes = host.deliver(&mut sup, w1, &HostEvent::key(65, true));

        assert_eq!(
            outcomes,
            vec![Outcome::running_pass_through(), Outcome::cancelled_pass_through()]
        );
        assert_eq!(host.handlers(w1).len(), 1);
        assert_eq!(host.handlers(w1)[0].instance, sup.instance(KEYS, w1));
    }

    #[test]
    fn restart_disabled_leaves_task_buried() {
        let (mut host, mut sup, w1) = setup(background(KEYS).with_restart(false));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));

        host.push_foreign(w1, "MESH_OT_knife_tool");
        host.frame(&mut sup, w1, &HostEvent::none());
        host.frame(&mut sup, w1, &HostEvent::none());

        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(1)));
        assert_eq!(host.handlers(w1).len(), 2);
        assert_eq!(host.handlers(w1)[0].instance, None);
    }

    #[test]
    fn managed_kinds_never_bury_each_other() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        sup.register(background("mesh.draw_nearest")).unwrap();
        let mut rx = sup.subscribe();

        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        start(&mut sup, &mut host, "mesh.draw_nearest", TaskContext::new(w1));
        host.frame(&mut sup, w1, &HostEvent::none());

        assert_eq!(count(&drain(&mut rx), EventKind::TaskRestarted), 0);
        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(1)));
        assert_eq!(host.handlers(w1).len(), 2);
    }

    #[test]
    fn two_window_scenario() {
        let (mut host, mut sup, w1) = setup(background(KEYS));

        // tick 1: user invocation on W1
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1).with_anchor(area_a()));
        assert_eq!(sup.windows(KEYS), vec![w1]);

        // tick 2: W2 becomes the active window
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        assert_eq!(sup.windows(KEYS), vec![w1, w2]);
        let i2 = sup.instance(KEYS, w2);

        // tick 3: a foreign handler buries the W1 instance
        host.push_foreign(w1, "MESH_OT_knife_tool");
        host.frame(&mut sup, w1, &HostEvent::none());
        assert_ne!(sup.instance(KEYS, w1), Some(InstanceId(1)));
        assert_eq!(sup.anchor(KEYS, w1), Some(area_a()));
        assert_eq!(sup.instance(KEYS, w2), i2);

        // render session gives W2 a timer
        assert!(host.render_init(&mut sup));
        assert_eq!(host.timers_on(w2).len(), 1);

        // tick 4: W2 closes
        host.close_window(w2);
        assert_eq!(host.fire_timers_on(&mut sup, w1), 1);
        assert_eq!(sup.windows(KEYS), vec![w1]);
        assert!(host.timers_on(w2).is_empty());
        assert_eq!(host.timer_count(), 1);
    }

    #[test]
    fn render_timers_replace_pre_tick() {
        fn run(render: bool) -> Vec<(EventKind, Option<WindowId>)> {
            let (mut host, mut sup, w1) = setup(background(KEYS));
            let mut rx = sup.subscribe();
            start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
            let w2 = host.open_window();
            if render {
                assert!(host.render_init(&mut sup));
            }

            let tick = |host: &mut SimHost, sup: &mut Supervisor, w: WindowId| {
                if render {
                    assert_eq!(host.fire_timers_on(sup, w), 1);
                } else {
                    assert!(host.frame(sup, w, &HostEvent::none()));
                }
            };

            host.push_ui(w1);
            tick(&mut host, &mut sup, w1);
            host.set_active(w2);
            tick(&mut host, &mut sup, w2);
            host.push_foreign(w2, "OBJECT_OT_transform");
            tick(&mut host, &mut sup, w2);

            drain(&mut rx)
                .into_iter()
                .filter(|e| matches!(e.kind, EventKind::TaskRestarted | EventKind::TaskAutoStarted))
                .map(|e| (e.kind, e.window))
                .collect()
        }

        let ticks = run(false);
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks, run(true));
    }

    #[test]
    fn render_pool_follows_the_finest_running_kind() {
        let (mut host, mut sup, w1) = setup(
            background(KEYS).with_render_tick_interval(Duration::from_millis(50)),
        );
        sup.register(
            background("mesh.draw_nearest").with_render_tick_interval(Duration::from_millis(10)),
        )
        .unwrap();
        host.open_window();

        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        assert!(host.render_init(&mut sup));
        assert!(sup.render_session_active());
        assert_eq!(sup.render_timer_count(), 2);
        assert_eq!(host.timer_interval(host.timers_on(w1)[0]), Some(Duration::from_millis(50)));

        start(&mut sup, &mut host, "mesh.draw_nearest", TaskContext::new(w1));
        assert_eq!(host.timer_count(), 2);
        assert_eq!(host.timer_interval(host.timers_on(w1)[0]), Some(Duration::from_millis(10)));

        assert!(host.render_complete(&mut sup));
        assert_eq!(host.timer_count(), 0);
        assert!(!sup.render_session_active());
        assert!(host.hook_registered(HookKind::RenderInit));
        assert!(!host.hook_registered(HookKind::RenderComplete));
        assert!(!host.hook_registered(HookKind::RenderCancel));
    }

    #[test]
    fn exit_waits_for_the_host_to_unwind() {
        let (mut host, mut sup, w1) = setup(escapable(KEYS));
        let mut rx = sup.subscribe();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());

        let outcomes = host.deliver(&mut sup, w1, &HostEvent::key(ESC, true));
        assert_eq!(outcomes, vec![Outcome::finished()]);

        // every window exits
        assert!(!sup.is_running(&host, KEYS, None));
        assert!(sup.is_exit_pending(KEYS, w1));
        assert!(sup.is_exit_pending(KEYS, w2));
        assert_eq!(host.timer_count(), 2);

        // W1 is unwound, W2 still carries the old handler
        host.fire_timers_on(&mut sup, w1);
        host.fire_timers_on(&mut sup, w2);
        assert!(!sup.is_exit_pending(KEYS, w1));
        assert!(sup.is_exit_pending(KEYS, w2));

        // its next event cancels it and clears the exit
        let outcomes = host.deliver(&mut sup, w2, &HostEvent::key(65, true));
        assert_eq!(outcomes, vec![Outcome::cancelled_pass_through()]);
        assert!(!sup.is_exit_pending(KEYS, w2));
        assert!(host.handlers(w2).is_empty());
        assert_eq!(host.timer_count(), 0);

        let events = drain(&mut rx);
        assert_eq!(count(&events, EventKind::TaskExited), 2);
        assert_eq!(count(&events, EventKind::ExitConfirmed), 1);
        assert_eq!(count(&events, EventKind::InstanceSuperseded), 1);
    }

    #[test]
    fn auto_start_waits_for_pending_exit() {
        let (mut host, mut sup, w1) = setup(escapable(KEYS));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        host.deliver(&mut sup, w1, &HostEvent::key(ESC, true));

        // user starts it again on W1 while W2 has not unwound
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        host.frame(&mut sup, w2, &HostEvent::none());
        assert!(!sup.is_running(&host, KEYS, Some(w2)));

        host.deliver(&mut sup, w2, &HostEvent::key(65, true));
        host.frame(&mut sup, w2, &HostEvent::none());
        assert!(sup.is_running(&host, KEYS, Some(w2)));
        assert_eq!(host.handlers(w2).len(), 1);
    }

    #[test]
    fn hooks_evict_themselves_and_come_back() {
        let (mut host, mut sup, w1) = setup(escapable(KEYS));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        host.deliver(&mut sup, w1, &HostEvent::key(ESC, true));
        assert!(host.hook_registered(HookKind::PreTick));

        host.frame(&mut sup, w1, &HostEvent::none());
        assert!(!host.hook_registered(HookKind::PreTick));
        assert!(!sup.has_hook(HookKind::PreTick));
        assert!(!host.frame(&mut sup, w1, &HostEvent::none()));

        host.fire_timers_on(&mut sup, w1);
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        assert!(host.hook_registered(HookKind::PreTick));
    }

    #[test]
    fn terminal_start_runs_exit_bookkeeping() {
        let kind = ManagedTaskKind::new(KEYS, || {
            ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running())
                .with_start(|_: &TaskContext, _: &HostEvent| Outcome::finished().into())
        });
        let (mut host, mut sup, w1) = setup(kind);

        let out = start(&mut sup, &mut host, KEYS, TaskContext::new(w1));

        assert_eq!(out, Outcome::finished());
        assert!(host.handlers(w1).is_empty());
        assert!(sup.is_exit_pending(KEYS, w1));
        assert_eq!(host.timer_count(), 1);
    }

    #[test]
    fn unmanaged_start_is_returned_untouched() {
        let kind = ManagedTaskKind::new(KEYS, || {
            ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running())
                .with_start(|_: &TaskContext, _: &HostEvent| {
                    StartResult::unmanaged(Outcome::cancelled())
                })
        });
        let (mut host, mut sup, w1) = setup(kind);

        let out = start(&mut sup, &mut host, KEYS, TaskContext::new(w1));

        assert_eq!(out, Outcome::cancelled());
        assert!(host.handlers(w1).is_empty());
        assert!(!sup.is_exit_pending(KEYS, w1));
        assert_eq!(host.timer_count(), 0);
        assert_eq!(host.hook_count(), 0);
    }

    #[test]
    fn handover_callback_tells_restart_from_auto_start() {
        let seen: Arc<Mutex<Vec<(InstanceId, Option<InstanceId>)>>> = Arc::default();
        let log = Arc::clone(&seen);
        let (mut host, mut sup, w1) = setup(background(KEYS).with_callback(move |h| {
            log.lock().unwrap().push((h.instance, h.previous));
        }));

        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        host.push_ui(w2);
        host.frame(&mut sup, w2, &HostEvent::none());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (InstanceId(2), None),
                (InstanceId(3), Some(InstanceId(2)))
            ]
        );
    }

    #[test]
    fn duplicated_handler_drops_bookkeeping() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        let mut rx = sup.subscribe();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        host.set_active(w1);

        host.push(
            w1,
            HandlerEntry::managed(TaskId::from_host(KEYS), InstanceId(1), Anchor::NONE),
        );
        host.frame(&mut sup, w1, &HostEvent::none());
        assert!(!sup.is_running(&host, KEYS, Some(w1)));
        assert_eq!(count(&drain(&mut rx), EventKind::HostDesync), 1);

        // next tick re-establishes a single instance
        host.frame(&mut sup, w1, &HostEvent::none());
        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(3)));
    }

    #[test]
    fn desync_in_the_only_window_is_recovered() {
        let (mut host, mut sup, w1) = setup(background(KEYS).with_all_windows(false));
        let mut rx = sup.subscribe();
        let anchor = Anchor::new(AreaId(1), RegionId(2));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1).with_anchor(anchor));

        host.push(
            w1,
            HandlerEntry::managed(TaskId::from_host(KEYS), InstanceId(1), anchor),
        );
        host.frame(&mut sup, w1, &HostEvent::none());
        assert!(!sup.is_running(&host, KEYS, None));
        assert!(host.hook_registered(HookKind::PreTick));

        for _ in 0..5 {
            assert!(host.frame(&mut sup, w1, &HostEvent::none()));
        }
        assert!(sup.is_running(&host, KEYS, Some(w1)));
        assert_eq!(sup.instance(KEYS, w1), Some(InstanceId(2)));
        assert_eq!(sup.anchor(KEYS, w1), Some(anchor));
        assert_eq!(host.handlers(w1)[0].instance, Some(InstanceId(2)));

        let events = drain(&mut rx);
        assert_eq!(count(&events, EventKind::HostDesync), 1);
        let started: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::TaskAutoStarted)
            .collect();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].reason.as_deref(), Some("host desync"));
    }

    #[test]
    fn render_cancel_ends_the_session() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        let mut rx = sup.subscribe();
        host.open_window();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        assert!(host.render_init(&mut sup));
        assert_eq!(sup.render_timer_count(), 2);

        assert!(host.render_cancel(&mut sup));
        assert!(!sup.render_session_active());
        assert_eq!(sup.render_timer_count(), 0);
        assert_eq!(host.timer_count(), 0);
        assert!(host.hook_registered(HookKind::RenderInit));
        assert!(!host.hook_registered(HookKind::RenderComplete));
        assert!(!host.hook_registered(HookKind::RenderCancel));
        assert!(host.hook_registered(HookKind::PreTick));

        let ended: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::RenderSessionEnded)
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].reason.as_deref(), Some("cancel"));
    }

    #[test]
    fn closed_window_loses_its_exit_timer() {
        let (mut host, mut sup, w1) = setup(escapable(KEYS).with_all_windows(false));
        let w2 = host.open_window();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w2));
        host.deliver(&mut sup, w2, &HostEvent::key(ESC, true));
        assert_eq!(host.timers_on(w2).len(), 1);

        host.close_window(w2);
        sup.pre_tick(&mut host, w1, &HostEvent::none());

        assert_eq!(host.timer_count(), 0);
        assert!(!sup.is_exit_pending(KEYS, w2));
        assert_eq!(sup.windows(KEYS), vec![w1]);
    }

    #[test]
    fn terminate_leaves_nothing_behind() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        sup.register(background("mesh.draw_nearest").with_all_windows(false))
            .unwrap();
        sup.register(ManagedTaskKind::new("view3d.lock_cursor", || {
            ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::finished())
        }))
        .unwrap();

        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        start(&mut sup, &mut host, "mesh.draw_nearest", TaskContext::new(w1));
        let w2 = host.open_window();
        host.set_active(w2);
        host.frame(&mut sup, w2, &HostEvent::none());
        host.render_init(&mut sup);
        start(&mut sup, &mut host, "view3d.lock_cursor", TaskContext::new(w1));
        host.deliver(&mut sup, w1, &HostEvent::key(65, true));
        assert_eq!(host.timer_count(), 3);

        sup.terminate(&mut host);

        assert_eq!(host.timer_count(), 0);
        assert_eq!(host.hook_count(), 0);
        assert!(!sup.is_running(&host, KEYS, None));
        assert!(!sup.render_session_active());
        assert_eq!(sup.kinds().count(), 3);
    }

    #[test]
    fn exactly_one_handler_per_window() {
        let (mut host, mut sup, w1) = setup(background(KEYS));
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));

        let mut seed: u64 = 0x2545_f491;
        let mut next = move |n: u64| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (seed >> 33) % n
        };

        for _ in 0..300 {
            let live = host.live_windows();
            let w = live[next(live.len() as u64) as usize];
            match next(7) {
                0 if live.len() < 4 => {
                    host.open_window();
                }
                1 if live.len() > 1 => host.close_window(w),
                2 => host.set_active(w),
                3 => host.push_ui(w),
                4 => {
                    host.dismiss_foreign(w);
                }
                5 => {
                    host.deliver(&mut sup, w, &HostEvent::key(65, true));
                }
                _ => {
                    host.frame(&mut sup, w, &HostEvent::none());
                }
            }

            for w in host.live_windows() {
                if let Some(current) = sup.instance(KEYS, w) {
                    let copies = host
                        .handlers(w)
                        .iter()
                        .filter(|e| e.instance == Some(current))
                        .count();
                    assert_eq!(copies, 1, "{w} carries {copies} copies of {current}");
                }
            }
        }
    }

    #[test]
    fn builder_without_runtime_rejects_subscribers() {
        struct Quiet;

        #[async_trait::async_trait]
        impl crate::subscribers::Subscribe for Quiet {
            async fn on_event(&self, _event: &Event) {}
        }

        let subs: Vec<Arc<dyn crate::subscribers::Subscribe>> = vec![Arc::new(Quiet)];
        let res = Supervisor::builder(SupervisorConfig::default())
            .with_subscribers(subs)
            .build();
        assert!(matches!(res, Err(RuntimeError::NoAsyncRuntime)));
        assert!(Supervisor::builder(SupervisorConfig::default()).build().is_ok());
    }

    #[tokio::test]
    async fn subscribers_see_supervisor_events() {
        #[derive(Default)]
        struct Recorder {
            seen: Mutex<Vec<EventKind>>,
        }

        #[async_trait::async_trait]
        impl crate::subscribers::Subscribe for Recorder {
            async fn on_event(&self, event: &Event) {
                self.seen.lock().unwrap().push(event.kind);
            }
        }

        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn crate::subscribers::Subscribe>> = vec![recorder.clone()];
        let mut sup = Supervisor::builder(SupervisorConfig::default())
            .with_subscribers(subs)
            .build()
            .unwrap();
        let mut host = SimHost::new();
        let w1 = host.open_window();

        sup.register(background(KEYS)).unwrap();
        start(&mut sup, &mut host, KEYS, TaskContext::new(w1));
        sup.terminate(&mut host);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&EventKind::KindRegistered));
        assert!(seen.contains(&EventKind::TaskStarted));
        assert_eq!(seen.last(), Some(&EventKind::Terminated));
    }
}
