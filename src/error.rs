//! Error types used by the modalvisor supervisor.
//!
//! This module defines two enums:
//!
//! - [`RegistrationError`]: a task kind was registered with a broken contract.
//! - [`RuntimeError`]: the supervisor was misused by its integrator.
//!
//! Tick, dispatch and timer paths never produce errors: stale windows, missing
//! handlers and host desyncs are absorbed and reported as events instead.
//! Both enums provide `as_label` / `as_message` helpers for logs.

use std::time::Duration;
use thiserror::Error;

/// # Errors rejected at kind registration.
///
/// These are programming errors in the integration, reported once when the
/// kind is registered rather than on every tick.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The id is empty or not of the form `module.function` / `MODULE_OT_function`.
    #[error("invalid task id {id:?}")]
    InvalidId {
        /// The id as given.
        id: String,
    },

    /// Another kind with the same (normalised) id is already registered.
    #[error("task kind {id} is already registered")]
    DuplicateKind {
        /// The normalised id.
        id: String,
    },

    /// Default invocation args use a non-interactive context, so a restart could
    /// not reproduce the original invocation.
    #[error("task kind {id} must be invoked interactively, got {exec}")]
    NonInvokeContext {
        /// The normalised id.
        id: String,
        /// The offending context name.
        exec: &'static str,
    },

    /// Render timer period below the host's floor.
    #[error("render tick {interval:?} of {id} is below the minimum {min:?}")]
    RenderIntervalTooShort {
        /// The normalised id.
        id: String,
        /// Requested period.
        interval: Duration,
        /// Configured floor.
        min: Duration,
    },
}

impl RegistrationError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use modalvisor::RegistrationError;
    ///
    /// let err = RegistrationError::DuplicateKind { id: "view3d.keys".into() };
    /// assert_eq!(err.as_label(), "registration_duplicate_kind");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistrationError::InvalidId { .. } => "registration_invalid_id",
            RegistrationError::DuplicateKind { .. } => "registration_duplicate_kind",
            RegistrationError::NonInvokeContext { .. } => "registration_non_invoke_context",
            RegistrationError::RenderIntervalTooShort { .. } => "registration_render_interval",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RegistrationError::InvalidId { id } => format!("invalid id: {id:?}"),
            RegistrationError::DuplicateKind { id } => format!("duplicate kind: {id}"),
            RegistrationError::NonInvokeContext { id, exec } => {
                format!("kind {id} defaults to {exec}")
            }
            RegistrationError::RenderIntervalTooShort { id, interval, min } => {
                format!("kind {id} render tick {interval:?} < {min:?}")
            }
        }
    }
}

/// # Errors produced by supervisor entry points.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The id does not name a registered kind.
    #[error("unknown task kind {id:?}")]
    UnknownKind {
        /// The id as given.
        id: String,
    },

    /// Subscribers were configured but no tokio runtime is available to drive them.
    #[error("subscribers require a tokio runtime")]
    NoAsyncRuntime,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use modalvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NoAsyncRuntime.as_label(), "runtime_no_async_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::UnknownKind { .. } => "runtime_unknown_kind",
            RuntimeError::NoAsyncRuntime => "runtime_no_async_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::UnknownKind { id } => format!("unknown kind: {id:?}"),
            RuntimeError::NoAsyncRuntime => "no tokio runtime for subscribers".to_string(),
        }
    }
}
