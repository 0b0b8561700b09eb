//! # Managed tasks: identity, descriptor and entry points.
//!
//! - [`TaskId`] normalised task identifier
//! - [`ModalTask`] trait with the two entry points the supervisor wraps
//! - [`ModalFn`] closure-backed task implementation
//! - [`ManagedTaskKind`] immutable descriptor registered with the supervisor
//! - [`InvokeArgs`], [`ExecContext`], [`ContextOverride`] invocation contract

mod args;
mod id;
mod kind;
mod task;
mod task_fn;

pub use args::{ContextOverride, ExecContext, InvokeArgs};
pub use id::TaskId;
pub use kind::{Handover, HandoverFn, ManagedTaskKind, TaskFactory};
pub(crate) use kind::RENDER_TICK_INTERVAL;
pub use task::{HostEvent, HostEventKind, ModalTask, Modifiers, Outcome, RunState, StartResult, TaskContext};
pub use task_fn::ModalFn;
