//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for reacting to supervisor events;
//! [`SubscriberSet`] fans events out to many subscribers without blocking the
//! host thread.
//!
//! ## Architecture
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► listener (tokio task)
//!                                              │
//!                                              └──► SubscriberSet::emit(&Event)
//!                                                     ├──► [queue] ─► LogWriter
//!                                                     └──► [queue] ─► Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use modalvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct RestartCounter;
//!
//! #[async_trait]
//! impl Subscribe for RestartCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::TaskRestarted {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
