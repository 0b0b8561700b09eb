//! # Kind registry and per-kind bookkeeping.
//!
//! One [`RegisteredKind`] per [`ManagedTaskKind`], in registration order. Each
//! carries the kind's `SupervisorState`:
//!
//! ```text
//! RegisteredKind
//!   ├─ id            normalised TaskId
//!   ├─ spec          ManagedTaskKind (factory, flags, default args)
//!   └─ state
//!        ├─ instances     WindowId → Instance      (at most one per window)
//!        ├─ pending_exit  WindowId → TimerId       (exit requested, not yet unwound)
//!        ├─ resync        WindowId → Anchor        (desynced, re-established next tick)
//!        └─ status        Normal | Restarting | AutoStarting
//! ```
//!
//! ## Rules
//! - Purge always runs before any decision for a kind.
//! - `status` leaves `Normal` only for the extent of a supervisor-issued invocation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::core::config::SupervisorConfig;
use crate::error::RegistrationError;
use crate::host::{Anchor, InstanceId, TimerId, TimerService, WindowId, WindowRegistry};
use crate::tasks::{ManagedTaskKind, ModalTask, TaskId};

/// Mode flag telling the invoke adapter who is invoking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorStatus {
    /// Genuine user invocation.
    #[default]
    Normal,
    /// The supervisor is replacing a buried instance.
    Restarting,
    /// The supervisor is starting the kind on a new window.
    AutoStarting,
}

/// A live task instance.
pub(crate) struct Instance {
    pub id: InstanceId,
    pub task: Box<dyn ModalTask>,
    pub anchor: Anchor,
}

/// Windows reported by the host at one point of a tick.
pub(crate) struct Live {
    order: Vec<WindowId>,
    set: HashSet<WindowId>,
}

impl Live {
    pub fn read(host: &impl WindowRegistry) -> Self {
        let order = host.live_windows();
        let set = order.iter().copied().collect();
        Self { order, set }
    }

    #[inline]
    pub fn contains(&self, window: &WindowId) -> bool {
        self.set.contains(window)
    }

    /// Windows in host order.
    pub fn windows(&self) -> &[WindowId] {
        &self.order
    }
}

#[derive(Default)]
pub(crate) struct KindState {
    pub instances: HashMap<WindowId, Instance>,
    pub pending_exit: HashMap<WindowId, TimerId>,
    pub resync: HashMap<WindowId, Anchor>,
    pub status: SupervisorStatus,
}

impl KindState {
    /// `true` if an instance lives in any live window.
    pub fn is_running(&self, live: &Live) -> bool {
        self.instances.keys().any(|w| live.contains(w))
    }

    /// `true` if the kind runs somewhere or waits to be re-established.
    pub fn is_active(&self, live: &Live) -> bool {
        self.is_running(live) || self.resync.keys().any(|w| live.contains(w))
    }

    /// Drops bookkeeping of windows that are gone and returns them.
    pub fn purge(&mut self, live: &Live, timers: &mut impl TimerService) -> Vec<WindowId> {
        let mut purged: Vec<WindowId> = Vec::new();

        self.instances.retain(|w, _| {
            let keep = live.contains(w);
            if !keep {
                purged.push(*w);
            }
            keep
        });
        self.resync.retain(|w, _| live.contains(w));

        let dead: Vec<WindowId> = self
            .pending_exit
            .keys()
            .filter(|w| !live.contains(w))
            .copied()
            .collect();
        for w in dead {
            if let Some(timer) = self.pending_exit.remove(&w) {
                timers.remove_timer(timer);
            }
            if !purged.contains(&w) {
                purged.push(w);
            }
        }

        if self.instances.is_empty() {
            self.status = SupervisorStatus::Normal;
        }
        purged.sort_unstable();
        purged
    }

    /// Removes every instance and exit timer.
    pub fn clear(&mut self, timers: &mut impl TimerService) {
        self.instances.clear();
        self.resync.clear();
        for (_, timer) in self.pending_exit.drain() {
            timers.remove_timer(timer);
        }
        self.status = SupervisorStatus::Normal;
    }
}

pub(crate) struct RegisteredKind {
    pub id: TaskId,
    pub spec: ManagedTaskKind,
    pub state: KindState,
}

/// Registered kinds in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    kinds: Vec<RegisteredKind>,
}

impl Registry {
    /// Validates and appends a kind.
    pub fn register(
        &mut self,
        spec: ManagedTaskKind,
        cfg: &SupervisorConfig,
    ) -> Result<&TaskId, RegistrationError> {
        let id = TaskId::parse(spec.raw_id())?;
        if self.kinds.iter().any(|k| k.id == id) {
            return Err(RegistrationError::DuplicateKind {
                id: id.to_string(),
            });
        }
        let exec = spec.args().exec;
        if !exec.is_invoke() {
            return Err(RegistrationError::NonInvokeContext {
                id: id.to_string(),
                exec: exec.as_str(),
            });
        }
        let interval = spec.render_tick_interval();
        if !cfg.accepts_render_tick(interval) {
            return Err(RegistrationError::RenderIntervalTooShort {
                id: id.to_string(),
                interval,
                min: cfg.min_render_tick_interval,
            });
        }

        self.kinds.push(RegisteredKind {
            id,
            spec,
            state: KindState::default(),
        });
        Ok(&self.kinds[self.kinds.len() - 1].id)
    }

    /// Finds a kind by raw or normalised id.
    pub fn index_of(&self, raw: &str) -> Option<usize> {
        let id = TaskId::from_host(raw);
        self.kinds.iter().position(|k| k.id == id)
    }

    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.kinds.iter().position(|k| k.id == *id)
    }

    #[inline]
    pub fn is_managed(&self, id: &TaskId) -> bool {
        self.kinds.iter().any(|k| k.id == *id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> &RegisteredKind {
        &self.kinds[idx]
    }

    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut RegisteredKind {
        &mut self.kinds[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredKind> {
        self.kinds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredKind> {
        self.kinds.iter_mut()
    }

    pub fn any_running(&self, live: &Live) -> bool {
        self.kinds.iter().any(|k| k.state.is_running(live))
    }

    pub fn any_active(&self, live: &Live) -> bool {
        self.kinds.iter().any(|k| k.state.is_active(live))
    }

    /// Finest render tick requested by a running kind.
    pub fn min_render_tick(&self, live: &Live) -> Option<Duration> {
        self.kinds
            .iter()
            .filter(|k| k.state.is_running(live))
            .filter_map(|k| k.spec.render_tick())
            .min()
    }
}
