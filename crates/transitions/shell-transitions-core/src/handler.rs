//! Pluggable animation handlers.

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use surface_api::{ContainerTransaction, Transaction};

use crate::bridge::ControlMessage;
use crate::ids::{HandlerId, TransitionToken};
use crate::info::{TransitionInfo, TransitionType, TriggerTask};

/// Something that can animate a subset of transitions.
///
/// Handlers are consulted most recently registered first. A handler that claimed a
/// request through [`handle_request`](TransitionHandler::handle_request) always gets
/// the first offer at ready time; otherwise it is only offered the transition if no
/// handler before it accepted.
pub trait TransitionHandler: Send {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Offer a ready transition. Return true to take ownership.
    ///
    /// `start` holds the start-state transaction. An accepting handler may take it
    /// (`start.take()`) and apply it with its first frame; whatever is left is applied
    /// by the orchestrator right after acceptance. An accepting handler must call
    /// `finish` once its animation is done, from any thread. A declining handler
    /// drops it.
    fn start_animation(
        &mut self,
        token: TransitionToken,
        info: &TransitionInfo,
        start: &mut Transaction,
        finish: FinishCallback,
    ) -> bool;

    /// Potentially claim a start request before the transition exists.
    ///
    /// Returning a container transaction merges it into the start and makes this
    /// handler the transition's first choice at ready time.
    fn handle_request(
        &mut self,
        _kind: TransitionType,
        _token: TransitionToken,
        _trigger: Option<&TriggerTask>,
    ) -> Option<ContainerTransaction> {
        None
    }
}

/// One-shot completion signal handed to a handler with each offer.
///
/// Consumed by [`finish`](FinishCallback::finish); `Send`, so it can be moved onto
/// whatever context runs the animation.
#[derive(Debug)]
pub struct FinishCallback {
    token: TransitionToken,
    handler: HandlerId,
    generation: u64,
    sender: UnboundedSender<ControlMessage>,
}

impl FinishCallback {
    pub(crate) fn new(
        token: TransitionToken,
        handler: HandlerId,
        generation: u64,
        sender: UnboundedSender<ControlMessage>,
    ) -> Self {
        Self {
            token,
            handler,
            generation,
            sender,
        }
    }

    pub fn token(&self) -> TransitionToken {
        self.token
    }

    /// Report the animation as done.
    pub fn finish(self) {
        let msg = ControlMessage::HandlerFinished {
            token: self.token,
            handler: self.handler,
            generation: self.generation,
        };
        if self.sender.send(msg).is_err() {
            debug!(token = %self.token, "finish after control sequence closed");
        }
    }
}
