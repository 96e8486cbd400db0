#![allow(dead_code)]
//! Shell transitions: a client-side player for window transitions.
//!
//! The window-management authority starts transitions and reports them ready with a
//! description of every participating surface. [`Transitions`] tracks each
//! transition by token, prepares the start state (z-order, visibility, alpha,
//! position), offers the transition to registered [`TransitionHandler`]s and falls
//! back to a short alpha fade when none accepts. Once the owning handler or every
//! default animation has finished, the authority is told the transition is done.
//!
//! Everything stateful runs on one control sequence. Remote calls enter through a
//! [`TransitionPlayer`] and are processed by [`Transitions::drain`] or
//! [`Transitions::run`].

pub mod animation;
pub mod authority;
pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod handler;
pub mod ids;
pub mod info;
pub mod ordering;
pub mod registry;
pub mod table;
pub mod transitions;

pub use animation::{AnimationJob, FadeAnimation};
pub use authority::{PlayerRegistrar, SurfaceComposer, TransitionAuthority};
pub use bridge::{ControlMessage, TransitionPlayer};
pub use config::TransitionsConfig;
pub use error::TransitionError;
pub use events::TransitionEvent;
pub use executor::{AnimationExecutor, QueuedExecutor, TokioExecutor};
pub use handler::{FinishCallback, TransitionHandler};
pub use ids::{AnimationId, HandlerId, TransitionToken};
pub use info::{Change, ChangeFlags, TransitionInfo, TransitionMode, TransitionType, TriggerTask};
pub use ordering::{default_fade_targets, setup_start_state, start_state};
pub use registry::HandlerRegistry;
pub use table::{ActiveTransition, TransitionState};
pub use transitions::Transitions;

pub type Result<T> = core::result::Result<T, TransitionError>;
