//! Collaborators the orchestrator calls out to.

use surface_api::{ContainerTransaction, Transaction};

use crate::bridge::TransitionPlayer;
use crate::ids::TransitionToken;
use crate::info::TransitionType;

/// The service that owns window state and issues transition tokens.
pub trait TransitionAuthority: Send {
    /// Start a transition. `token` is the placeholder from a request (if any); the
    /// returned token is the one the transition is known by from now on.
    fn start_transition(
        &mut self,
        kind: TransitionType,
        token: Option<TransitionToken>,
        wct: Option<ContainerTransaction>,
    ) -> TransitionToken;

    /// Every animation of `token` is done; the final state is already applied.
    fn finish_transition(&mut self, token: TransitionToken);
}

/// Applies surface transactions. Called from the control sequence and from
/// animation contexts.
pub trait SurfaceComposer: Send + Sync {
    fn apply(&self, transaction: Transaction);
}

/// Registration point for the transition player (the task organizer side of the
/// authority).
pub trait PlayerRegistrar {
    fn register_transition_player(&mut self, player: TransitionPlayer);
}
