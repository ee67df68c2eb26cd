//! Orchestrator errors.

use std::fmt;

use nitro_rpc::{ClientError, ServerError};
use nitro_types::BoxError;
use thiserror::Error;

/// Lifecycle phase a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Runs before the server starts.
    BeforeStart,
    /// Runs after the server started.
    AfterStart,
    /// Runs before the server stops.
    BeforeStop,
    /// Runs after the server stopped.
    AfterStop,
}

impl HookPhase {
    /// Phase name as used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeStart => "before_start",
            Self::AfterStart => "after_start",
            Self::BeforeStop => "before_stop",
            Self::AfterStop => "after_stop",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the [`Application`](crate::Application).
#[derive(Debug, Error)]
pub enum AppError {
    /// A lifecycle hook failed. The hook's own error is the source.
    #[error("{phase} hook failed: {source}")]
    Hook {
        /// Phase of the failing hook.
        phase: HookPhase,
        /// Error returned by the hook.
        source: BoxError,
    },

    /// The server failed to start, stop or accept a registration.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// A call or publish through the client failed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

impl AppError {
    /// Phase of a hook failure, if this is one.
    #[must_use]
    pub fn hook_phase(&self) -> Option<HookPhase> {
        match self {
            Self::Hook { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
