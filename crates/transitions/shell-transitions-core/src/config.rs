//! Configuration for the transition orchestrator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TransitionError;

/// Environment variable toggling shell transitions (`1|true|0|false`).
pub const ENV_ENABLED: &str = "SHELL_TRANSITIONS_ENABLED";
/// Environment variable overriding the default fade duration in milliseconds.
pub const ENV_FADE_MS: &str = "SHELL_TRANSITIONS_FADE_MS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransitionsConfig {
    /// Whether the transition player registers with the authority at all.
    pub enabled: bool,
    /// Duration of the fallback fade.
    pub default_fade_duration_ms: u64,
    /// Frame pacing for executors that drive animations on a timer.
    pub frame_interval_ms: u64,
}

impl Default for TransitionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            default_fade_duration_ms: 500,
            frame_interval_ms: 16,
        }
    }
}

impl TransitionsConfig {
    pub fn from_json_str(text: &str) -> Result<Self, TransitionError> {
        let cfg: TransitionsConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TransitionError> {
        if self.frame_interval_ms == 0 {
            return Err(TransitionError::Config {
                reason: "frame_interval_ms must be positive".into(),
            });
        }
        Ok(())
    }

    /// Apply `SHELL_TRANSITIONS_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, TransitionError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TransitionError> {
        if let Some(raw) = lookup(ENV_ENABLED) {
            self.enabled = parse_bool(&raw).ok_or_else(|| TransitionError::Config {
                reason: format!("{ENV_ENABLED}: expected boolean, got '{raw}'"),
            })?;
        }
        if let Some(raw) = lookup(ENV_FADE_MS) {
            self.default_fade_duration_ms =
                raw.trim().parse().map_err(|_| TransitionError::Config {
                    reason: format!("{ENV_FADE_MS}: expected milliseconds, got '{raw}'"),
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    #[inline]
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.default_fade_duration_ms)
    }

    #[inline]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
