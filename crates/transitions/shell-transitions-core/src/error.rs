//! Error types for the transition core

use crate::ids::{HandlerId, TransitionToken};
use crate::table::TransitionState;

/// Errors surfaced by the transition orchestrator.
///
/// Protocol violations mean the authority and the orchestrator disagree about which
/// transitions exist. They are returned immediately and stop the control loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    /// Ready (or an animation completion) arrived for a token that is not active
    #[error("non-active transition {token}, expecting one of {active:?}")]
    UnknownTransition {
        token: TransitionToken,
        active: Vec<TransitionToken>,
    },

    /// Ready delivered twice for the same token
    #[error("got a duplicate transition ready call for {token}")]
    DuplicateReady { token: TransitionToken },

    /// Start requested for a token that is already active
    #[error("transition already started {token}")]
    DuplicateStart { token: TransitionToken },

    /// A transition was driven out of its lifecycle order
    #[error("illegal state change for {token}: {from:?} -> {to:?}")]
    IllegalStateChange {
        token: TransitionToken,
        from: TransitionState,
        to: TransitionState,
    },

    /// Explicit handler is not registered
    #[error("handler not registered: {id}")]
    UnknownHandler { id: HandlerId },

    /// The control sequence is gone; nothing can be delivered anymore
    #[error("transition control sequence closed")]
    ControlClosed,

    /// Invalid configuration
    #[error("invalid transitions config: {reason}")]
    Config { reason: String },
}

impl TransitionError {
    /// True for desynchronization between the authority and the orchestrator.
    #[inline]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownTransition { .. } | Self::DuplicateReady { .. } | Self::DuplicateStart { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownTransition { .. }
            | Self::DuplicateReady { .. }
            | Self::DuplicateStart { .. } => "protocol",
            Self::IllegalStateChange { .. } => "state",
            Self::UnknownHandler { .. } => "registry",
            Self::ControlClosed => "channel",
            Self::Config { .. } => "config",
        }
    }
}

impl From<serde_json::Error> for TransitionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            reason: err.to_string(),
        }
    }
}
