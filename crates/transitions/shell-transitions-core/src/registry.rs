//! Ordered handler registry and the two dispatch protocols.
//!
//! Both protocols walk the registry from the most recently added handler to the
//! least recently added one.

use surface_api::{ContainerTransaction, Transaction};
use tracing::trace;

use crate::handler::{FinishCallback, TransitionHandler};
use crate::ids::{HandlerId, TransitionToken};
use crate::info::{TransitionInfo, TransitionType, TriggerTask};

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn TransitionHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Later handlers are consulted first.
    pub fn add(&mut self, handler: Box<dyn TransitionHandler>) -> HandlerId {
        let id = HandlerId(self.handlers.len());
        self.handlers.push(handler);
        id
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        id.0 < self.handlers.len()
    }

    pub fn name_of(&self, id: HandlerId) -> Option<&str> {
        self.handlers.get(id.0).map(|h| h.name())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Request-time negotiation: the first handler proposing a container transaction
    /// claims the transition. Handlers after it are not asked.
    pub fn negotiate_request(
        &mut self,
        kind: TransitionType,
        token: TransitionToken,
        trigger: Option<&TriggerTask>,
    ) -> Option<(HandlerId, ContainerTransaction)> {
        for (index, handler) in self.handlers.iter_mut().enumerate().rev() {
            if let Some(wct) = handler.handle_request(kind, token, trigger) {
                trace!(%token, handler = handler.name(), "request claimed");
                return Some((HandlerId(index), wct));
            }
        }
        None
    }

    /// Ready-time dispatch: the assigned handler gets an exclusive first offer, then
    /// every other handler in order. Returns the handler that accepted.
    pub fn dispatch_ready(
        &mut self,
        assigned: Option<HandlerId>,
        token: TransitionToken,
        info: &TransitionInfo,
        start: &mut Transaction,
        mut finish_for: impl FnMut(HandlerId) -> FinishCallback,
    ) -> Option<HandlerId> {
        if let Some(id) = assigned {
            if let Some(handler) = self.handlers.get_mut(id.0) {
                if handler.start_animation(token, info, start, finish_for(id)) {
                    trace!(%token, handler = handler.name(), "assigned handler accepted");
                    return Some(id);
                }
            }
        }
        for (index, handler) in self.handlers.iter_mut().enumerate().rev() {
            let id = HandlerId(index);
            if Some(id) == assigned {
                continue;
            }
            if handler.start_animation(token, info, start, finish_for(id)) {
                trace!(%token, handler = handler.name(), "handler accepted");
                return Some(id);
            }
        }
        None
    }
}
