//! # Invocation contract.
//!
//! [`InvokeArgs`] are the arguments a kind is invoked with when the supervisor
//! starts it on its own (restart, auto-start). They must describe an
//! interactive invocation: a kind whose defaults use an `Exec*` context is
//! rejected at registration.

use crate::host::{AreaId, RegionId};

/// Host operator-call context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecContext {
    #[default]
    InvokeDefault,
    InvokeRegionWin,
    InvokeArea,
    InvokeScreen,
    ExecDefault,
    ExecRegionWin,
    ExecArea,
    ExecScreen,
}

impl ExecContext {
    /// `true` for the interactive (`Invoke*`) contexts.
    #[inline]
    pub fn is_invoke(&self) -> bool {
        matches!(
            self,
            ExecContext::InvokeDefault
                | ExecContext::InvokeRegionWin
                | ExecContext::InvokeArea
                | ExecContext::InvokeScreen
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecContext::InvokeDefault => "INVOKE_DEFAULT",
            ExecContext::InvokeRegionWin => "INVOKE_REGION_WIN",
            ExecContext::InvokeArea => "INVOKE_AREA",
            ExecContext::InvokeScreen => "INVOKE_SCREEN",
            ExecContext::ExecDefault => "EXEC_DEFAULT",
            ExecContext::ExecRegionWin => "EXEC_REGION_WIN",
            ExecContext::ExecArea => "EXEC_AREA",
            ExecContext::ExecScreen => "EXEC_SCREEN",
        }
    }
}

/// Area/region pinned by the invocation instead of the ambient ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextOverride {
    pub area: Option<AreaId>,
    pub region: Option<RegionId>,
}

/// Arguments a managed task is invoked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvokeArgs {
    pub exec: ExecContext,
    pub undo: Option<bool>,
    pub overrides: ContextOverride,
}

impl InvokeArgs {
    pub fn new(exec: ExecContext) -> Self {
        Self {
            exec,
            ..Self::default()
        }
    }

    pub fn with_undo(mut self, undo: bool) -> Self {
        self.undo = Some(undo);
        self
    }

    pub fn with_overrides(mut self, overrides: ContextOverride) -> Self {
        self.overrides = overrides;
        self
    }

    /// Returns the args with a non-interactive context replaced by `InvokeDefault`.
    pub(crate) fn coerced(mut self) -> Self {
        if !self.exec.is_invoke() {
            self.exec = ExecContext::InvokeDefault;
        }
        self
    }
}
