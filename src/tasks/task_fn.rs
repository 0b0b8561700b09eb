//! # Closure-backed modal task (`ModalFn`)
//!
//! [`ModalFn`] wraps a tick closure and, optionally, a start closure. Without
//! a start closure the task starts as a background handler
//! ([`Outcome::running_pass_through`]).
//!
//! The kind's factory builds a fresh `ModalFn` per invocation, so closure state
//! never leaks between a superseded instance and its replacement. Share state
//! across instances explicitly through an `Arc<...>` captured by the factory.
//!
//! ## Example
//! ```rust
//! use modalvisor::{HostEvent, ManagedTaskKind, ModalFn, Outcome, TaskContext};
//!
//! let kind = ManagedTaskKind::new("view3d.screencast_keys", || {
//!     ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running_pass_through())
//! });
//! assert_eq!(kind.raw_id(), "view3d.screencast_keys");
//! ```

use crate::tasks::task::{HostEvent, ModalTask, Outcome, StartResult, TaskContext};

type StartFn = Box<dyn FnMut(&TaskContext, &HostEvent) -> StartResult + Send>;

/// Function-backed modal task.
pub struct ModalFn<T> {
    start: Option<StartFn>,
    tick: T,
}

impl<T> ModalFn<T>
where
    T: FnMut(&TaskContext, &HostEvent) -> Outcome + Send + 'static,
{
    pub fn new(tick: T) -> Self {
        Self { start: None, tick }
    }

    /// Replaces the default start behaviour.
    pub fn with_start<S>(mut self, start: S) -> Self
    where
        S: FnMut(&TaskContext, &HostEvent) -> StartResult + Send + 'static,
    {
        self.start = Some(Box::new(start));
        self
    }
}

impl<T> ModalTask for ModalFn<T>
where
    T: FnMut(&TaskContext, &HostEvent) -> Outcome + Send + 'static,
{
    fn start(&mut self, ctx: &TaskContext, event: &HostEvent) -> StartResult {
        match self.start.as_mut() {
            Some(start) => start(ctx, event),
            None => Outcome::running_pass_through().into(),
        }
    }

    fn tick(&mut self, ctx: &TaskContext, event: &HostEvent) -> Outcome {
        (self.tick)(ctx, event)
    }
}
