//! Supervisor core: bookkeeping and the per-window state machine.
//!
//! The only public API from this module is [`Supervisor`] (plus its builder,
//! config and status flag).
//!
//! Internal modules:
//! - [`registry`]: registered kinds and their per-window bookkeeping;
//! - [`stack`]: classifies a handler-stack snapshot for one instance;
//! - [`render`]: render-session timer pool;
//! - [`lifecycle`]: invoke and tick adapters, exit, restart, auto-start;
//! - [`supervisor`]: decision pass, hooks, timers, terminate, queries.

mod builder;
mod config;
mod lifecycle;
mod registry;
mod render;
mod stack;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use registry::SupervisorStatus;
pub use supervisor::Supervisor;
