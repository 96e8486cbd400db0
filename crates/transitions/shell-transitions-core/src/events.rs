//! Lifecycle events recorded by the orchestrator for hosts and diagnostics.

use serde::{Deserialize, Serialize};

use crate::ids::{HandlerId, TransitionToken};
use crate::info::TransitionType;
use crate::table::TransitionState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// The authority started the transition; it is now pending ready.
    Started {
        token: TransitionToken,
        kind: TransitionType,
        assigned: Option<HandlerId>,
    },
    StateChanged {
        token: TransitionToken,
        from: TransitionState,
        to: TransitionState,
    },
    /// Ready dispatch settled. `owner` is `None` when the default animation runs.
    Dispatched {
        token: TransitionToken,
        owner: Option<HandlerId>,
        default_animations: usize,
    },
    Finished {
        token: TransitionToken,
    },
}

impl TransitionEvent {
    pub fn token(&self) -> TransitionToken {
        match self {
            TransitionEvent::Started { token, .. }
            | TransitionEvent::StateChanged { token, .. }
            | TransitionEvent::Dispatched { token, .. }
            | TransitionEvent::Finished { token } => *token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TransitionEvent::StateChanged {
            token: TransitionToken(2),
            from: TransitionState::PendingRequest,
            to: TransitionState::ReadyDispatching,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "event": "state_changed",
                "token": 2,
                "from": "pending_request",
                "to": "ready_dispatching"
            })
        );
        assert_eq!(ev.token(), TransitionToken(2));
    }
}
