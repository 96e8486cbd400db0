//! Default fade animation.
//!
//! An [`AnimationJob`] is what an executor runs: it writes the fade's alpha into its
//! own transaction each frame and applies it. Completion, cancellation and dropping
//! the job all go through the same finisher, which writes the end value and posts
//! `(token, animation)` back to the control sequence exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use surface_api::{SurfaceId, Transaction};

use crate::authority::SurfaceComposer;
use crate::bridge::ControlMessage;
use crate::ids::{AnimationId, TransitionToken};

/// Alpha fade of one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeAnimation {
    pub surface: SurfaceId,
    pub from: f32,
    pub to: f32,
    pub duration: Duration,
}

impl FadeAnimation {
    /// Fade from transparent to opaque (`show`) or the reverse.
    pub fn new(surface: SurfaceId, show: bool, duration: Duration) -> Self {
        let to = if show { 1.0 } else { 0.0 };
        Self {
            surface,
            from: 1.0 - to,
            to,
            duration,
        }
    }

    /// Alpha at an animated fraction in [0, 1].
    #[inline]
    pub fn alpha_at(&self, fraction: f32) -> f32 {
        let t = fraction.clamp(0.0, 1.0);
        self.from * (1.0 - t) + self.to * t
    }

    /// Animated fraction after `elapsed`. Zero-length fades are complete immediately.
    #[inline]
    pub fn fraction_at(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// A running default animation, owned by an animation executor.
pub struct AnimationJob {
    id: AnimationId,
    token: TransitionToken,
    fade: FadeAnimation,
    transaction: Transaction,
    composer: Arc<dyn SurfaceComposer>,
    sender: UnboundedSender<ControlMessage>,
    finished: bool,
}

impl std::fmt::Debug for AnimationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationJob")
            .field("id", &self.id)
            .field("token", &self.token)
            .field("fade", &self.fade)
            .field("finished", &self.finished)
            .finish()
    }
}

impl AnimationJob {
    pub(crate) fn new(
        id: AnimationId,
        token: TransitionToken,
        fade: FadeAnimation,
        composer: Arc<dyn SurfaceComposer>,
        sender: UnboundedSender<ControlMessage>,
    ) -> Self {
        Self {
            id,
            token,
            fade,
            transaction: Transaction::new(),
            composer,
            sender,
            finished: false,
        }
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn token(&self) -> TransitionToken {
        self.token
    }

    pub fn fade(&self) -> &FadeAnimation {
        &self.fade
    }

    pub fn duration(&self) -> Duration {
        self.fade.duration
    }

    /// Apply one frame at the given animated fraction.
    pub fn apply_fraction(&mut self, fraction: f32) {
        let alpha = self.fade.alpha_at(fraction);
        self.transaction.set_alpha(self.fade.surface, alpha);
        self.composer.apply(self.transaction.take());
    }

    /// Natural completion.
    pub fn finish(mut self) {
        self.complete();
    }

    /// External cancellation; bookkeeping is identical to completion and the surface
    /// is left at its end value.
    pub fn cancel(mut self) {
        trace!(token = %self.token, animation = %self.id, "default animation cancelled");
        self.complete();
    }

    fn complete(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.transaction.set_alpha(self.fade.surface, self.fade.to);
        self.composer.apply(self.transaction.take());
        let msg = ControlMessage::AnimationFinished {
            token: self.token,
            animation: self.id,
        };
        if self.sender.send(msg).is_err() {
            debug!(token = %self.token, animation = %self.id, "animation finished after control sequence closed");
        }
    }
}

impl Drop for AnimationJob {
    fn drop(&mut self) {
        self.complete();
    }
}
