//! # Task identifiers.
//!
//! Hosts name the same task in two ways: the dotted call form
//! (`view3d.screencast_keys`) and the registered class form
//! (`VIEW3D_OT_screencast_keys`). [`TaskId`] always stores the dotted form, so
//! ids read back from a handler stack compare equal to registered ones.

use std::fmt;
use std::sync::Arc;

use crate::error::RegistrationError;

const CLASS_SEPARATOR: &str = "_OT_";

/// Normalised, cheaply cloneable task identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Arc<str>);

impl TaskId {
    /// Parses and validates an id given at registration time.
    ///
    /// ```
    /// use modalvisor::TaskId;
    ///
    /// let id = TaskId::parse("VIEW3D_OT_screencast_keys").unwrap();
    /// assert_eq!(id.as_str(), "view3d.screencast_keys");
    /// assert!(TaskId::parse("no_separator").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RegistrationError> {
        let normalized = normalize(raw);
        let valid = match normalized.split_once('.') {
            Some((module, func)) => {
                !module.is_empty()
                    && !func.is_empty()
                    && !func.contains('.')
                    && !normalized.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(RegistrationError::InvalidId { id: raw.to_string() });
        }
        Ok(Self(normalized.into()))
    }

    /// Builds an id from a name reported by the host. Never fails.
    pub fn from_host(raw: &str) -> Self {
        Self(normalize(raw).into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('.') {
        return raw.to_string();
    }
    match raw.split_once(CLASS_SEPARATOR) {
        Some((module, func)) => format!("{}.{}", module.to_lowercase(), func),
        None => raw.to_string(),
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}
