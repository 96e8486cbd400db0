//! Remote bridge: the thread-safe front door of the control sequence.
//!
//! The authority calls into a [`TransitionPlayer`] from whatever thread its transport
//! uses. The player never touches transition state; it only enqueues a
//! [`ControlMessage`] which the control sequence processes in FIFO order.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::trace;

use surface_api::Transaction;

use crate::error::TransitionError;
use crate::ids::{AnimationId, HandlerId, TransitionToken};
use crate::info::{TransitionInfo, TransitionType, TriggerTask};

/// Everything that reaches the control sequence from another execution context.
#[derive(Debug)]
pub enum ControlMessage {
    Ready {
        token: TransitionToken,
        info: TransitionInfo,
        transaction: Transaction,
    },
    RequestStart {
        kind: TransitionType,
        token: TransitionToken,
        trigger: Option<TriggerTask>,
    },
    /// A handler invoked the finish callback it was given at dispatch.
    HandlerFinished {
        token: TransitionToken,
        handler: HandlerId,
        /// Generation of the transition instance the callback was issued for.
        generation: u64,
    },
    /// A default animation completed or was cancelled.
    AnimationFinished {
        token: TransitionToken,
        animation: AnimationId,
    },
    Shutdown,
}

impl ControlMessage {
    pub fn token(&self) -> Option<TransitionToken> {
        match self {
            ControlMessage::Ready { token, .. }
            | ControlMessage::RequestStart { token, .. }
            | ControlMessage::HandlerFinished { token, .. }
            | ControlMessage::AnimationFinished { token, .. } => Some(*token),
            ControlMessage::Shutdown => None,
        }
    }
}

pub(crate) fn control_channel() -> (
    UnboundedSender<ControlMessage>,
    UnboundedReceiver<ControlMessage>,
) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Handle the authority uses to deliver transition events. Cheap to clone, usable
/// from any thread.
#[derive(Debug, Clone)]
pub struct TransitionPlayer {
    sender: UnboundedSender<ControlMessage>,
}

impl TransitionPlayer {
    pub(crate) fn new(sender: UnboundedSender<ControlMessage>) -> Self {
        Self { sender }
    }

    /// The authority has collected the participants of `token` and is ready to animate.
    pub fn on_transition_ready(
        &self,
        token: TransitionToken,
        info: TransitionInfo,
        transaction: Transaction,
    ) -> Result<(), TransitionError> {
        self.post(ControlMessage::Ready {
            token,
            info,
            transaction,
        })
    }

    /// The authority asks whether a transition of `kind` should start.
    pub fn request_start_transition(
        &self,
        kind: TransitionType,
        token: TransitionToken,
        trigger: Option<TriggerTask>,
    ) -> Result<(), TransitionError> {
        self.post(ControlMessage::RequestStart {
            kind,
            token,
            trigger,
        })
    }

    /// Stop the async control loop after the messages already queued.
    pub fn shutdown(&self) -> Result<(), TransitionError> {
        self.post(ControlMessage::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn post(&self, msg: ControlMessage) -> Result<(), TransitionError> {
        trace!(token = ?msg.token(), "posting to control sequence");
        self.sender
            .send(msg)
            .map_err(|_| TransitionError::ControlClosed)
    }
}
