use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use shell_transitions::{
    FinishCallback, TransitionAuthority, TransitionHandler, TransitionInfo, TransitionToken,
    TransitionType, TriggerTask,
};
use surface_api::{ContainerTransaction, Transaction};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    transitions: HashMap<String, String>,
    configs: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod transitions {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.transitions.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.transitions, "transition", name)?;
        read_to_string(rel)
    }

    pub fn load(name: &str) -> Result<TransitionInfo> {
        let rel = lookup(&MANIFEST.transitions, "transition", name)?;
        super::load_json(rel)
    }
}

pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.configs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        read_to_string(rel)
    }
}

/// Calls observed by [`FakeAuthority`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorityCall {
    Start {
        kind: TransitionType,
        token: Option<TransitionToken>,
        wct: Option<ContainerTransaction>,
    },
    Finish(TransitionToken),
}

/// Authority double: hands back the requested token (or a fresh one) and records
/// every call in a shared log.
#[derive(Debug, Clone, Default)]
pub struct FakeAuthority {
    next_token: u64,
    remap: bool,
    log: Arc<Mutex<Vec<AuthorityCall>>>,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self {
            next_token: 1000,
            remap: false,
            log: Arc::default(),
        }
    }

    /// Ignore requested placeholders and always issue a fresh token.
    pub fn remapping(mut self) -> Self {
        self.remap = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<AuthorityCall>>> {
        self.log.clone()
    }
}

impl TransitionAuthority for FakeAuthority {
    fn start_transition(
        &mut self,
        kind: TransitionType,
        token: Option<TransitionToken>,
        wct: Option<ContainerTransaction>,
    ) -> TransitionToken {
        self.log.lock().push(AuthorityCall::Start { kind, token, wct });
        match token {
            Some(token) if !self.remap => token,
            _ => {
                self.next_token += 1;
                TransitionToken(self.next_token)
            }
        }
    }

    fn finish_transition(&mut self, token: TransitionToken) {
        self.log.lock().push(AuthorityCall::Finish(token));
    }
}

/// Tokens passed to `finish_transition`, in order.
pub fn finished_tokens(log: &Mutex<Vec<AuthorityCall>>) -> Vec<TransitionToken> {
    log.lock()
        .iter()
        .filter_map(|call| match call {
            AuthorityCall::Finish(token) => Some(*token),
            _ => None,
        })
        .collect()
}

/// Composer double that keeps every applied transaction.
#[derive(Debug, Default)]
pub struct RecordingComposer {
    applied: Mutex<Vec<Transaction>>,
}

impl RecordingComposer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn applied(&self) -> Vec<Transaction> {
        self.applied.lock().clone()
    }

    /// All applied operations flattened into one transaction, in apply order.
    pub fn merged(&self) -> Transaction {
        let mut out = Transaction::new();
        for t in self.applied.lock().iter() {
            out.merge(t.clone());
        }
        out
    }
}

impl shell_transitions::SurfaceComposer for RecordingComposer {
    fn apply(&self, transaction: Transaction) {
        self.applied.lock().push(transaction);
    }
}

/// What a [`ScriptedHandler`] saw.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerCall {
    Request(TransitionToken),
    Offer(TransitionToken),
}

/// Handler double with fixed answers. Accepted finish callbacks are parked so the
/// test decides when each animation ends.
pub struct ScriptedHandler {
    name: String,
    accepts: bool,
    claims: Option<ContainerTransaction>,
    take_start: bool,
    calls: Arc<Mutex<Vec<HandlerCall>>>,
    parked: Arc<Mutex<Vec<FinishCallback>>>,
}

/// Test-side view of a [`ScriptedHandler`] after it moved into the orchestrator.
#[derive(Clone)]
pub struct HandlerTap {
    calls: Arc<Mutex<Vec<HandlerCall>>>,
    parked: Arc<Mutex<Vec<FinishCallback>>>,
}

impl HandlerTap {
    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().clone()
    }

    pub fn offers(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, HandlerCall::Offer(_)))
            .count()
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().len()
    }

    /// Fire the oldest parked finish callback.
    pub fn finish_one(&self) -> Option<TransitionToken> {
        let mut parked = self.parked.lock();
        if parked.is_empty() {
            return None;
        }
        let callback = parked.remove(0);
        let token = callback.token();
        callback.finish();
        Some(token)
    }

    /// Hand the oldest parked callback to the caller, e.g. to finish from another thread.
    pub fn take_callback(&self) -> Option<FinishCallback> {
        let mut parked = self.parked.lock();
        (!parked.is_empty()).then(|| parked.remove(0))
    }
}

impl ScriptedHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepts: false,
            claims: None,
            take_start: false,
            calls: Arc::default(),
            parked: Arc::default(),
        }
    }

    pub fn accepting(mut self) -> Self {
        self.accepts = true;
        self
    }

    /// Claim every request with `wct`.
    pub fn claiming(mut self, wct: ContainerTransaction) -> Self {
        self.claims = Some(wct);
        self
    }

    /// Take the start transaction on acceptance instead of leaving it to the orchestrator.
    pub fn taking_start(mut self) -> Self {
        self.take_start = true;
        self
    }

    pub fn tap(&self) -> HandlerTap {
        HandlerTap {
            calls: self.calls.clone(),
            parked: self.parked.clone(),
        }
    }
}

impl TransitionHandler for ScriptedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_animation(
        &mut self,
        token: TransitionToken,
        _info: &TransitionInfo,
        start: &mut Transaction,
        finish: FinishCallback,
    ) -> bool {
        self.calls.lock().push(HandlerCall::Offer(token));
        if !self.accepts {
            return false;
        }
        if self.take_start {
            start.take();
        }
        self.parked.lock().push(finish);
        true
    }

    fn handle_request(
        &mut self,
        _kind: TransitionType,
        token: TransitionToken,
        _trigger: Option<&TriggerTask>,
    ) -> Option<ContainerTransaction> {
        self.calls.lock().push(HandlerCall::Request(token));
        self.claims.clone()
    }
}
