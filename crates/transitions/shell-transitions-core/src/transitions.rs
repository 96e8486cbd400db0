//! The transition orchestrator.
//!
//! All transition state lives here and is only touched by the control sequence: the
//! thread or task that owns this value and calls [`Transitions::drain`] or awaits
//! [`Transitions::run`]. Other contexts talk to it through the
//! [`TransitionPlayer`], the [`FinishCallback`]s handed to handlers and the
//! completion messages of default animations.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use surface_api::{ContainerTransaction, Transaction};

use crate::animation::{AnimationJob, FadeAnimation};
use crate::authority::{PlayerRegistrar, SurfaceComposer, TransitionAuthority};
use crate::bridge::{control_channel, ControlMessage, TransitionPlayer};
use crate::config::TransitionsConfig;
use crate::error::TransitionError;
use crate::events::TransitionEvent;
use crate::executor::AnimationExecutor;
use crate::handler::{FinishCallback, TransitionHandler};
use crate::ids::{AnimationId, AnimationIdAllocator, HandlerId, TransitionToken};
use crate::info::{TransitionInfo, TransitionType, TriggerTask};
use crate::ordering::{default_fade_targets, setup_start_state};
use crate::registry::HandlerRegistry;
use crate::table::{ActiveTransition, ActiveTransitionTable, TransitionState};
use crate::Result;

/// Plays transition animations.
pub struct Transitions {
    config: TransitionsConfig,
    authority: Box<dyn TransitionAuthority>,
    composer: Arc<dyn SurfaceComposer>,
    executor: Arc<dyn AnimationExecutor>,
    handlers: HandlerRegistry,
    active: ActiveTransitionTable,
    animation_ids: AnimationIdAllocator,
    generations: u64,
    sender: UnboundedSender<ControlMessage>,
    receiver: UnboundedReceiver<ControlMessage>,
    events: Vec<TransitionEvent>,
}

impl std::fmt::Debug for Transitions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transitions")
            .field("config", &self.config)
            .field("handlers", &self.handlers)
            .field("active", &self.active.tokens())
            .finish()
    }
}

impl Transitions {
    pub fn new(
        config: TransitionsConfig,
        authority: impl TransitionAuthority + 'static,
        composer: Arc<dyn SurfaceComposer>,
        executor: Arc<dyn AnimationExecutor>,
    ) -> Self {
        let (sender, receiver) = control_channel();
        Self {
            config,
            authority: Box::new(authority),
            composer,
            executor,
            handlers: HandlerRegistry::new(),
            active: ActiveTransitionTable::new(),
            animation_ids: AnimationIdAllocator::new(),
            generations: 0,
            sender,
            receiver,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &TransitionsConfig {
        &self.config
    }

    /// A handle for delivering authority events from any thread.
    pub fn player(&self) -> TransitionPlayer {
        TransitionPlayer::new(self.sender.clone())
    }

    /// Hand the player to the authority's organizer. Does nothing when shell
    /// transitions are disabled; returns whether it registered.
    pub fn register(&self, registrar: &mut dyn PlayerRegistrar) -> bool {
        if !self.config.enabled {
            debug!("shell transitions disabled, player not registered");
            return false;
        }
        registrar.register_transition_player(self.player());
        true
    }

    /// Add a handler candidate. Handlers added later are consulted first.
    pub fn add_handler(&mut self, handler: impl TransitionHandler + 'static) -> HandlerId {
        let id = self.handlers.add(Box::new(handler));
        debug!(handler = %id, name = self.handlers.name_of(id), "handler added");
        id
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    // ========== Queries ==========

    pub fn is_active(&self, token: TransitionToken) -> bool {
        self.active.contains(token)
    }

    pub fn state_of(&self, token: TransitionToken) -> Option<TransitionState> {
        self.active.get(token).map(|a| a.state)
    }

    pub fn active(&self, token: TransitionToken) -> Option<&ActiveTransition> {
        self.active.get(token)
    }

    pub fn active_tokens(&self) -> Vec<TransitionToken> {
        self.active.tokens()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Take the lifecycle events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<TransitionEvent> {
        std::mem::take(&mut self.events)
    }

    // ========== Starting ==========

    /// The authority asks to start a transition of `kind` under the placeholder `token`.
    ///
    /// Handlers negotiate first; the claiming handler's container transaction goes out
    /// with the start, and the token the authority returns becomes the active one.
    pub fn request_start_transition(
        &mut self,
        kind: TransitionType,
        token: TransitionToken,
        trigger: Option<TriggerTask>,
    ) -> Result<TransitionToken> {
        debug!(%kind, %token, "transition requested");
        if self.active.contains(token) {
            return Err(TransitionError::DuplicateStart { token });
        }
        let (assigned, wct) = match self
            .handlers
            .negotiate_request(kind, token, trigger.as_ref())
        {
            Some((id, wct)) => (Some(id), Some(wct)),
            None => (None, None),
        };
        let started = self.authority.start_transition(kind, Some(token), wct);
        self.track(started, kind, assigned)?;
        Ok(started)
    }

    /// Start a self-initiated transition owned by `handler` (if any), bypassing
    /// request negotiation.
    pub fn start_transition(
        &mut self,
        kind: TransitionType,
        wct: ContainerTransaction,
        handler: Option<HandlerId>,
    ) -> Result<TransitionToken> {
        if let Some(id) = handler {
            if !self.handlers.contains(id) {
                return Err(TransitionError::UnknownHandler { id });
            }
        }
        let started = self.authority.start_transition(kind, None, Some(wct));
        debug!(%kind, token = %started, "transition started directly");
        self.track(started, kind, handler)?;
        Ok(started)
    }

    fn track(
        &mut self,
        token: TransitionToken,
        kind: TransitionType,
        assigned: Option<HandlerId>,
    ) -> Result<()> {
        self.generations += 1;
        let record = ActiveTransition::new(kind, assigned).with_generation(self.generations);
        self.active.insert(token, record)?;
        self.events.push(TransitionEvent::Started {
            token,
            kind,
            assigned,
        });
        Ok(())
    }

    // ========== Ready ==========

    /// The authority reports `token` ready with its participants and start transaction.
    pub fn on_transition_ready(
        &mut self,
        token: TransitionToken,
        info: TransitionInfo,
        mut transaction: Transaction,
    ) -> Result<()> {
        debug!(%token, %info, "transition ready");
        let (assigned, generation) = {
            let active = self.active.expect_mut(token)?;
            if active.state != TransitionState::PendingRequest {
                return Err(TransitionError::DuplicateReady { token });
            }
            (active.assigned, active.generation)
        };
        self.advance(token, TransitionState::ReadyDispatching)?;

        if !info.has_valid_root() {
            // Nothing to animate: housekeeping only.
            self.composer.apply(transaction);
            return self.on_finish(token);
        }

        setup_start_state(&info, &mut transaction);

        let sender = self.sender.clone();
        let owner = self.handlers.dispatch_ready(
            assigned,
            token,
            &info,
            &mut transaction,
            |id| FinishCallback::new(token, id, generation, sender.clone()),
        );

        if let Some(owner) = owner {
            if !transaction.is_empty() {
                self.composer.apply(transaction);
            }
            self.active.expect_mut(token)?.owner = Some(owner);
            self.events.push(TransitionEvent::Dispatched {
                token,
                owner: Some(owner),
                default_animations: 0,
            });
            return self.advance(token, TransitionState::Animating);
        }

        // No handler took it: default fades.
        self.composer.apply(transaction);
        let targets = default_fade_targets(&info);
        let ids: Vec<AnimationId> = targets.iter().map(|_| self.animation_ids.alloc()).collect();
        self.active.expect_mut(token)?.animations = Some(ids.clone());
        self.events.push(TransitionEvent::Dispatched {
            token,
            owner: None,
            default_animations: ids.len(),
        });
        self.advance(token, TransitionState::Animating)?;

        let duration = self.config.fade_duration();
        for ((surface, show), id) in targets.into_iter().zip(ids) {
            trace!(%token, %surface, show, animation = %id, "starting default fade");
            let job = AnimationJob::new(
                id,
                token,
                FadeAnimation::new(surface, show, duration),
                self.composer.clone(),
                self.sender.clone(),
            );
            self.executor.execute(job);
        }

        self.on_finish(token)
    }

    // ========== Finishing ==========

    /// Finish `token` unless default animations are still running. Only reached from
    /// ready handling and completion messages.
    pub(crate) fn on_finish(&mut self, token: TransitionToken) -> Result<()> {
        let active = self.active.get(token).ok_or_else(|| self.active.unknown(token))?;
        if !matches!(
            active.state,
            TransitionState::ReadyDispatching | TransitionState::Animating
        ) {
            warn!(%token, state = active.state.name(), "finish before the transition was dispatched");
            return Ok(());
        }
        if active.has_outstanding_animations() {
            return Ok(());
        }
        self.advance(token, TransitionState::Finished)?;
        debug!(%token, "transition animations finished, notifying authority");
        self.active.remove(token);
        self.events.push(TransitionEvent::Finished { token });
        self.authority.finish_transition(token);
        Ok(())
    }

    fn on_handler_finished(
        &mut self,
        token: TransitionToken,
        handler: HandlerId,
        generation: u64,
    ) -> Result<()> {
        match self.active.get(token) {
            Some(active) if active.owner == Some(handler) && active.generation == generation => {
                self.on_finish(token)
            }
            Some(active) if active.generation != generation => {
                warn!(%token, %handler, generation, current = active.generation, "stale finish from an earlier use of the token");
                Ok(())
            }
            Some(active) => {
                warn!(%token, %handler, owner = ?active.owner, "finish from a handler that does not own the transition");
                Ok(())
            }
            None => {
                warn!(%token, %handler, "finish for a transition that is not active");
                Ok(())
            }
        }
    }

    fn on_animation_finished(&mut self, token: TransitionToken, animation: AnimationId) -> Result<()> {
        let active = self.active.expect_mut(token)?;
        if !active.remove_animation(animation) {
            warn!(%token, %animation, "completion for an untracked animation");
            return Ok(());
        }
        self.on_finish(token)
    }

    fn advance(&mut self, token: TransitionToken, to: TransitionState) -> Result<()> {
        let active = self.active.expect_mut(token)?;
        let from = active.state;
        if !from.can_advance_to(to) {
            return Err(TransitionError::IllegalStateChange { token, from, to });
        }
        active.state = to;
        trace!(%token, from = from.name(), to = to.name(), "state changed");
        self.events
            .push(TransitionEvent::StateChanged { token, from, to });
        Ok(())
    }

    // ========== Control sequence ==========

    /// Process one message from the control channel.
    pub fn process(&mut self, msg: ControlMessage) -> Result<ControlFlow<()>> {
        match msg {
            ControlMessage::Ready {
                token,
                info,
                transaction,
            } => self.on_transition_ready(token, info, transaction)?,
            ControlMessage::RequestStart {
                kind,
                token,
                trigger,
            } => {
                self.request_start_transition(kind, token, trigger)?;
            }
            ControlMessage::HandlerFinished {
                token,
                handler,
                generation,
            } => self.on_handler_finished(token, handler, generation)?,
            ControlMessage::AnimationFinished { token, animation } => {
                self.on_animation_finished(token, animation)?
            }
            ControlMessage::Shutdown => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Process every message queued right now. Returns how many were handled; stops
    /// early at a shutdown message or the first error.
    pub fn drain(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(msg) = self.receiver.try_recv() {
            handled += 1;
            if self.process(msg)?.is_break() {
                break;
            }
        }
        Ok(handled)
    }

    /// Await and process messages until a shutdown message or the first error.
    pub async fn run(&mut self) -> Result<()> {
        while let Some(msg) = self.receiver.recv().await {
            if self.process(msg)?.is_break() {
                debug!("transition control loop shut down");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueuedExecutor;
    use crate::info::{Change, TransitionMode};
    use parking_lot::Mutex;
    use surface_api::SurfaceId;

    #[derive(Default, Clone)]
    struct Authority {
        next: u64,
        finished: Arc<Mutex<Vec<TransitionToken>>>,
    }

    impl TransitionAuthority for Authority {
        fn start_transition(
            &mut self,
            _kind: TransitionType,
            token: Option<TransitionToken>,
            _wct: Option<ContainerTransaction>,
        ) -> TransitionToken {
            token.unwrap_or_else(|| {
                self.next += 1;
                TransitionToken(100 + self.next)
            })
        }

        fn finish_transition(&mut self, token: TransitionToken) {
            self.finished.lock().push(token);
        }
    }

    #[derive(Default)]
    struct Composer {
        applied: Mutex<Vec<Transaction>>,
    }

    impl SurfaceComposer for Composer {
        fn apply(&self, t: Transaction) {
            self.applied.lock().push(t);
        }
    }

    struct Keeper {
        accept: bool,
        kept: Arc<Mutex<Vec<FinishCallback>>>,
    }

    impl TransitionHandler for Keeper {
        fn start_animation(
            &mut self,
            _token: TransitionToken,
            _info: &TransitionInfo,
            _start: &mut Transaction,
            finish: FinishCallback,
        ) -> bool {
            if self.accept {
                self.kept.lock().push(finish);
            }
            self.accept
        }
    }

    struct Harness {
        transitions: Transitions,
        finished: Arc<Mutex<Vec<TransitionToken>>>,
        composer: Arc<Composer>,
        executor: Arc<QueuedExecutor>,
    }

    fn harness() -> Harness {
        let authority = Authority::default();
        let finished = authority.finished.clone();
        let composer = Arc::new(Composer::default());
        let executor = Arc::new(QueuedExecutor::new());
        let transitions = Transitions::new(
            TransitionsConfig::default(),
            authority,
            composer.clone(),
            executor.clone(),
        );
        Harness {
            transitions,
            finished,
            composer,
            executor,
        }
    }

    fn open_info() -> TransitionInfo {
        TransitionInfo::new(TransitionType::Open, Some(SurfaceId(1)))
            .with_change(Change::new(SurfaceId(10), TransitionMode::Open))
    }

    #[test]
    fn ready_for_unknown_token_is_rejected() {
        let mut h = harness();
        let err = h
            .transitions
            .on_transition_ready(TransitionToken(9), open_info(), Transaction::new())
            .unwrap_err();
        assert!(matches!(err, TransitionError::UnknownTransition { .. }));
        assert!(h.finished.lock().is_empty());
    }

    #[test]
    fn second_ready_is_rejected() {
        let mut h = harness();
        let kept = Arc::new(Mutex::new(Vec::new()));
        h.transitions.add_handler(Keeper {
            accept: true,
            kept: kept.clone(),
        });
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(1), None)
            .unwrap();
        h.transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap();
        let err = h
            .transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap_err();
        assert_eq!(err, TransitionError::DuplicateReady { token });
    }

    #[test]
    fn invalid_root_finishes_without_dispatch() {
        let mut h = harness();
        let kept = Arc::new(Mutex::new(Vec::new()));
        h.transitions.add_handler(Keeper {
            accept: true,
            kept: kept.clone(),
        });
        let token = h
            .transitions
            .request_start_transition(TransitionType::Close, TransitionToken(3), None)
            .unwrap();
        let mut t = Transaction::new();
        t.hide(SurfaceId(4));
        h.transitions
            .on_transition_ready(token, TransitionInfo::new(TransitionType::Close, None), t)
            .unwrap();

        assert!(kept.lock().is_empty());
        assert_eq!(*h.finished.lock(), vec![token]);
        assert!(!h.transitions.is_active(token));
        assert_eq!(h.composer.applied.lock().len(), 1);
        let states: Vec<_> = h
            .transitions
            .take_events()
            .into_iter()
            .filter_map(|e| match e {
                TransitionEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![TransitionState::ReadyDispatching, TransitionState::Finished]
        );
    }

    #[test]
    fn handler_finish_is_idempotent() {
        let mut h = harness();
        let kept = Arc::new(Mutex::new(Vec::new()));
        h.transitions.add_handler(Keeper {
            accept: true,
            kept: kept.clone(),
        });
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(5), None)
            .unwrap();
        h.transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap();
        assert_eq!(h.transitions.state_of(token), Some(TransitionState::Animating));

        let callback = kept.lock().pop().unwrap();
        callback.finish();
        h.transitions.drain().unwrap();
        assert_eq!(*h.finished.lock(), vec![token]);

        // A stale finish for the same token is ignored.
        h.transitions
            .process(ControlMessage::HandlerFinished {
                token,
                handler: HandlerId(0),
                generation: 1,
            })
            .unwrap();
        assert_eq!(h.finished.lock().len(), 1);
    }

    #[test]
    fn finish_before_ready_is_ignored() {
        let mut h = harness();
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(1), None)
            .unwrap();
        h.transitions.on_finish(token).unwrap();
        assert!(h.finished.lock().is_empty());
        assert_eq!(
            h.transitions.state_of(token),
            Some(TransitionState::PendingRequest)
        );

        // Ready still goes through normally afterwards.
        h.transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap();
        assert!(h.executor.finish_next());
        h.transitions.drain().unwrap();
        assert_eq!(*h.finished.lock(), vec![token]);
    }

    #[test]
    fn out_of_order_state_change_is_an_error() {
        let mut h = harness();
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(2), None)
            .unwrap();
        let err = h
            .transitions
            .advance(token, TransitionState::Finished)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalStateChange {
                token,
                from: TransitionState::PendingRequest,
                to: TransitionState::Finished,
            }
        );
        assert_eq!(
            h.transitions.state_of(token),
            Some(TransitionState::PendingRequest)
        );
    }

    /// Keeps every callback it is offered and answers from a script.
    struct Hoarder {
        answers: Vec<bool>,
        kept: Arc<Mutex<Vec<FinishCallback>>>,
    }

    impl TransitionHandler for Hoarder {
        fn start_animation(
            &mut self,
            _token: TransitionToken,
            _info: &TransitionInfo,
            _start: &mut Transaction,
            finish: FinishCallback,
        ) -> bool {
            self.kept.lock().push(finish);
            if self.answers.is_empty() {
                false
            } else {
                self.answers.remove(0)
            }
        }
    }

    #[test]
    fn callback_from_an_earlier_use_of_the_token_is_ignored() {
        let mut h = harness();
        let kept = Arc::new(Mutex::new(Vec::new()));
        h.transitions.add_handler(Hoarder {
            answers: vec![false, true],
            kept: kept.clone(),
        });

        // First use: the handler declines but keeps its callback.
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(1), None)
            .unwrap();
        h.transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap();
        assert!(h.executor.finish_next());
        h.transitions.drain().unwrap();
        assert_eq!(*h.finished.lock(), vec![token]);

        // Second use of the same token: the handler accepts.
        let again = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(1), None)
            .unwrap();
        assert_eq!(again, token);
        h.transitions
            .on_transition_ready(token, open_info(), Transaction::new())
            .unwrap();
        assert_eq!(h.transitions.state_of(token), Some(TransitionState::Animating));

        let (stale, current) = {
            let mut kept = kept.lock();
            assert_eq!(kept.len(), 2);
            let current = kept.pop().unwrap();
            (kept.pop().unwrap(), current)
        };
        stale.finish();
        h.transitions.drain().unwrap();
        assert!(h.transitions.is_active(token));
        assert_eq!(h.finished.lock().len(), 1);

        current.finish();
        h.transitions.drain().unwrap();
        assert!(!h.transitions.is_active(token));
        assert_eq!(*h.finished.lock(), vec![token, token]);
    }

    #[test]
    fn default_animation_finishes_after_last_fade() {
        let mut h = harness();
        let token = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(7), None)
            .unwrap();
        let info = open_info().with_change(Change::new(SurfaceId(11), TransitionMode::Open));
        h.transitions
            .on_transition_ready(token, info, Transaction::new())
            .unwrap();
        assert_eq!(h.executor.pending(), 2);
        assert_eq!(h.transitions.state_of(token), Some(TransitionState::Animating));

        assert!(h.executor.finish_next());
        h.transitions.drain().unwrap();
        assert!(h.finished.lock().is_empty());

        assert!(h.executor.finish_next());
        h.transitions.drain().unwrap();
        assert_eq!(*h.finished.lock(), vec![token]);
    }

    #[test]
    fn no_fade_targets_finishes_immediately() {
        let mut h = harness();
        let token = h
            .transitions
            .request_start_transition(TransitionType::Change, TransitionToken(8), None)
            .unwrap();
        let info = TransitionInfo::new(TransitionType::Change, Some(SurfaceId(1)))
            .with_change(Change::new(SurfaceId(10), TransitionMode::Change));
        h.transitions
            .on_transition_ready(token, info, Transaction::new())
            .unwrap();
        assert_eq!(h.executor.pending(), 0);
        assert_eq!(*h.finished.lock(), vec![token]);
    }

    #[test]
    fn start_transition_rejects_unknown_handler() {
        let mut h = harness();
        let err = h
            .transitions
            .start_transition(
                TransitionType::Open,
                ContainerTransaction::default(),
                Some(HandlerId(4)),
            )
            .unwrap_err();
        assert_eq!(err, TransitionError::UnknownHandler { id: HandlerId(4) });
        assert_eq!(h.transitions.active_count(), 0);
    }

    #[test]
    fn duplicate_request_is_rejected() {
        let mut h = harness();
        h.transitions
            .request_start_transition(TransitionType::Open, TransitionToken(2), None)
            .unwrap();
        let err = h
            .transitions
            .request_start_transition(TransitionType::Open, TransitionToken(2), None)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::DuplicateStart {
                token: TransitionToken(2)
            }
        );
    }

    #[derive(Default)]
    struct Registrar(Vec<TransitionPlayer>);

    impl PlayerRegistrar for Registrar {
        fn register_transition_player(&mut self, player: TransitionPlayer) {
            self.0.push(player);
        }
    }

    #[test]
    fn register_respects_enabled_flag() {
        let h = harness();
        let mut registrar = Registrar::default();
        assert!(!h.transitions.register(&mut registrar));
        assert!(registrar.0.is_empty());

        let config = TransitionsConfig {
            enabled: true,
            ..TransitionsConfig::default()
        };
        let enabled = Transitions::new(
            config,
            Authority::default(),
            Arc::new(Composer::default()),
            Arc::new(QueuedExecutor::new()),
        );
        assert!(enabled.register(&mut registrar));
        assert_eq!(registrar.0.len(), 1);
    }

    #[test]
    fn shutdown_stops_drain() {
        let mut h = harness();
        let player = h.transitions.player();
        player.shutdown().unwrap();
        player
            .request_start_transition(TransitionType::Open, TransitionToken(1), None)
            .unwrap();
        assert_eq!(h.transitions.drain().unwrap(), 1);
        assert_eq!(h.transitions.active_count(), 0);
        assert_eq!(h.transitions.drain().unwrap(), 1);
        assert_eq!(h.transitions.active_count(), 1);
    }
}
