//! Identifiers for transitions, handlers and default animations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token naming one transition for its whole lifetime. Issued by the
/// transition authority; never reused while the transition is active.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionToken(pub u64);

impl fmt::Display for TransitionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a handler in the registry. Stable because registration is append-only.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(pub usize);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler:{}", self.0)
    }
}

/// Id of one default (fallback) animation spawned by the orchestrator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationId(pub u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim:{}", self.0)
    }
}

/// Monotonic allocator for AnimationId.
#[derive(Default, Debug)]
pub struct AnimationIdAllocator {
    next: u64,
}

impl AnimationIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> AnimationId {
        let id = AnimationId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = AnimationIdAllocator::new();
        assert_eq!(alloc.alloc(), AnimationId(0));
        assert_eq!(alloc.alloc(), AnimationId(1));
        assert_eq!(alloc.alloc(), AnimationId(2));
    }

    #[test]
    fn display_forms() {
        assert_eq!(TransitionToken(9).to_string(), "#9");
        assert_eq!(HandlerId(2).to_string(), "handler:2");
        assert_eq!(AnimationId(4).to_string(), "anim:4");
    }
}
