//! # modalvisor
//!
//! **Modalvisor** keeps long-running interactive (modal) tasks alive inside a
//! host application's single-threaded event loop.
//!
//! A background modal task (a key-press overlay, a hover highlighter, a cursor
//! lock) is easily knocked off the handler stack: a menu opens above it, a
//! foreign tool takes the input, a new window appears. The [`Supervisor`]
//! watches every window each frame and puts the task back, exactly once per
//! window, on the same screen region it was bound to.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────────┐   ┌──────────────────┐
//!     │ ManagedTaskKind  │   │ ManagedTaskKind  │
//!     │ (factory, flags) │   │ (factory, flags) │
//!     └────────┬─────────┘   └────────┬─────────┘
//!              ▼                      ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Supervisor (host thread, synchronous)                    │
//! │  - Registry      per-kind instances / pending exits       │
//! │  - RenderPool    one timer per window while rendering     │
//! │  - hooks         PreTick, RenderInit/Complete/Cancel      │
//! └──────┬───────────────────────────────┬────────────────────┘
//!        │ Host seams                    │ publish(Event)
//!        ▼                               ▼
//! ┌──────────────────────────┐   ┌───────────────────────────┐
//! │ HandlerStackReader       │   │ Bus (broadcast channel)   │
//! │ ModalHandlers            │   └─────────────┬─────────────┘
//! │ WindowRegistry           │                 ▼
//! │ TimerService             │        subscriber_listener
//! │ HookRegistry             │         (tokio task, optional)
//! └──────────────────────────┘                 ▼
//!                                         SubscriberSet
//!                                     ┌────────┼────────┐
//!                                     ▼        ▼        ▼
//!                                  worker1  worker2  workerN
//! ```
//!
//! ### Per-window state machine
//! ```text
//! ABSENT ──invoke / auto-start──► RUNNING ──foreign handler on top──► BURIED
//!   ▲                               │  ▲                                │
//!   │                               │  └──────────── restart ───────────┘
//!   │                         terminal result
//!   │                               ▼
//!   └──── exit timer fired, ──── EXITING
//!         stack unwound
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Restart, auto-start, exit bookkeeping, render-session timers | [`Supervisor`], [`SupervisorStatus`]        |
//! | **Tasks**         | Task entry points and the kind descriptor                    | [`ModalTask`], [`ModalFn`], [`ManagedTaskKind`] |
//! | **Host seams**    | What a host integration implements                           | [`host::Host`], [`host::sim::SimHost`]      |
//! | **Subscriber API**| Hook into lifecycle events (logging, custom subscribers)     | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed registration and runtime errors                        | [`RegistrationError`], [`RuntimeError`]     |
//! | **Configuration** | Centralize supervisor settings                               | [`SupervisorConfig`]                        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
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
//! sup.register(ManagedTaskKind::new("VIEW3D_OT_screencast_keys", || {
//!     ModalFn::new(|_: &TaskContext, _: &HostEvent| Outcome::running_pass_through())
//! }))
//! .unwrap();
//!
//! sup.invoke(&mut host, "view3d.screencast_keys", &TaskContext::new(w1), &HostEvent::none())
//!     .unwrap();
//!
//! // a menu opens above the task ...
//! host.push_ui(w1);
//! host.frame(&mut sup, w1, &HostEvent::none());
//!
//! // ... and the task is back on top
//! assert_eq!(
//!     host.handlers(w1)[0].task().map(|t| t.as_str()),
//!     Some("view3d.screencast_keys")
//! );
//! ```

mod core;
mod error;
mod events;
pub mod host;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Supervisor, SupervisorBuilder, SupervisorConfig, SupervisorStatus};
pub use error::{RegistrationError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    ContextOverride, ExecContext, Handover, HandoverFn, HostEvent, HostEventKind, InvokeArgs,
    ManagedTaskKind, ModalFn, ModalTask, Modifiers, Outcome, RunState, StartResult, TaskContext,
    TaskFactory, TaskId,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
