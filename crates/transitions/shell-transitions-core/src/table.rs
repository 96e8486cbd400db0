//! Active transition bookkeeping, keyed by transition token.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::ids::{AnimationId, HandlerId, TransitionToken};
use crate::info::TransitionType;

/// Lifecycle of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    /// Started with the authority, waiting for ready
    PendingRequest,
    /// Ready delivered; start state and handler dispatch in progress
    ReadyDispatching,
    /// A handler or the default animation owns it
    Animating,
    /// Finish sent; the token is gone
    Finished,
}

impl TransitionState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PendingRequest => "pending_request",
            Self::ReadyDispatching => "ready_dispatching",
            Self::Animating => "animating",
            Self::Finished => "finished",
        }
    }

    /// Check whether `next` is a legal successor. A no-op batch may finish
    /// straight from dispatching.
    #[inline]
    pub fn can_advance_to(&self, next: TransitionState) -> bool {
        matches!(
            (self, next),
            (Self::PendingRequest, Self::ReadyDispatching)
                | (Self::ReadyDispatching, Self::Animating)
                | (Self::ReadyDispatching, Self::Finished)
                | (Self::Animating, Self::Finished)
        )
    }

}

/// Mutable record for one transition, owned by the control sequence.
#[derive(Debug, Clone)]
pub struct ActiveTransition {
    pub kind: TransitionType,
    pub state: TransitionState,
    /// Handler that claimed the request (or was named explicitly); tried first at ready.
    pub assigned: Option<HandlerId>,
    /// Handler that accepted the animation at ready.
    pub owner: Option<HandlerId>,
    /// Running default animations. `None` until the default animation path starts;
    /// an empty list afterwards means every one of them has finished.
    pub animations: Option<Vec<AnimationId>>,
    /// Distinguishes this instance from earlier transitions that used the same token.
    pub generation: u64,
}

impl ActiveTransition {
    pub fn new(kind: TransitionType, assigned: Option<HandlerId>) -> Self {
        Self {
            kind,
            state: TransitionState::PendingRequest,
            assigned,
            owner: None,
            animations: None,
            generation: 0,
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// True while default animations are still running.
    #[inline]
    pub fn has_outstanding_animations(&self) -> bool {
        self.animations.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Remove a finished default animation. Returns false if it was not tracked.
    pub fn remove_animation(&mut self, id: AnimationId) -> bool {
        match self.animations.as_mut() {
            Some(list) => match list.iter().position(|a| *a == id) {
                Some(pos) => {
                    list.remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

/// Map from token to transition, in insertion order.
#[derive(Debug, Default)]
pub struct ActiveTransitionTable {
    inner: IndexMap<TransitionToken, ActiveTransition>,
}

impl ActiveTransitionTable {
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Insert a new transition. A token may only be active once.
    pub fn insert(
        &mut self,
        token: TransitionToken,
        active: ActiveTransition,
    ) -> Result<(), TransitionError> {
        if self.inner.contains_key(&token) {
            return Err(TransitionError::DuplicateStart { token });
        }
        self.inner.insert(token, active);
        Ok(())
    }

    pub fn get(&self, token: TransitionToken) -> Option<&ActiveTransition> {
        self.inner.get(&token)
    }

    pub fn get_mut(&mut self, token: TransitionToken) -> Option<&mut ActiveTransition> {
        self.inner.get_mut(&token)
    }

    /// Like `get_mut`, but an unknown token is a protocol violation.
    pub fn expect_mut(
        &mut self,
        token: TransitionToken,
    ) -> Result<&mut ActiveTransition, TransitionError> {
        if self.inner.contains_key(&token) {
            Ok(&mut self.inner[&token])
        } else {
            Err(self.unknown(token))
        }
    }

    pub fn remove(&mut self, token: TransitionToken) -> Option<ActiveTransition> {
        self.inner.shift_remove(&token)
    }

    pub fn contains(&self, token: TransitionToken) -> bool {
        self.inner.contains_key(&token)
    }

    pub fn tokens(&self) -> Vec<TransitionToken> {
        self.inner.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub(crate) fn unknown(&self, token: TransitionToken) -> TransitionError {
        TransitionError::UnknownTransition {
            token,
            active: self.tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_successors() {
        use TransitionState::*;
        assert!(PendingRequest.can_advance_to(ReadyDispatching));
        assert!(ReadyDispatching.can_advance_to(Animating));
        assert!(ReadyDispatching.can_advance_to(Finished));
        assert!(Animating.can_advance_to(Finished));
        assert!(!PendingRequest.can_advance_to(Animating));
        assert!(!Animating.can_advance_to(ReadyDispatching));
        assert!(!Finished.can_advance_to(PendingRequest));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut table = ActiveTransitionTable::new();
        let token = TransitionToken(1);
        table
            .insert(token, ActiveTransition::new(TransitionType::Open, None))
            .unwrap();
        let err = table
            .insert(token, ActiveTransition::new(TransitionType::Close, None))
            .unwrap_err();
        assert_eq!(err, TransitionError::DuplicateStart { token });
        assert_eq!(table.get(token).unwrap().kind, TransitionType::Open);
    }

    #[test]
    fn unknown_lists_active_tokens_in_order() {
        let mut table = ActiveTransitionTable::new();
        for n in [4, 2, 9] {
            table
                .insert(
                    TransitionToken(n),
                    ActiveTransition::new(TransitionType::Open, None),
                )
                .unwrap();
        }
        table.remove(TransitionToken(2));
        let err = table.expect_mut(TransitionToken(7)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::UnknownTransition {
                token: TransitionToken(7),
                active: vec![TransitionToken(4), TransitionToken(9)],
            }
        );
    }

    #[test]
    fn outstanding_animations() {
        let mut active = ActiveTransition::new(TransitionType::Open, None);
        assert!(!active.has_outstanding_animations());
        assert!(!active.remove_animation(AnimationId(0)));

        active.animations = Some(vec![AnimationId(0), AnimationId(1)]);
        assert!(active.has_outstanding_animations());
        assert!(active.remove_animation(AnimationId(0)));
        assert!(!active.remove_animation(AnimationId(0)));
        assert!(active.remove_animation(AnimationId(1)));
        assert!(!active.has_outstanding_animations());
        assert_eq!(active.animations.as_deref(), Some(&[][..]));
    }
}
