//! Authorization configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Environment variable selecting the compile strategy.
pub const COMPILE_STRATEGY_VAR: &str = "GATEHOUSE_COMPILE_STRATEGY";
/// Environment variable toggling decision audit logs.
pub const AUDIT_DECISIONS_VAR: &str = "GATEHOUSE_AUDIT_DECISIONS";
/// Environment variable making partial compilations count as failures.
pub const FAIL_ON_PARTIAL_VAR: &str = "GATEHOUSE_FAIL_ON_PARTIAL";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// How a full compilation reaches the live store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStrategy {
    /// Compile into a scratch store and swap it in when done.
    ///
    /// Concurrent decisions see either the previous or the new permission
    /// set, never an empty one.
    #[default]
    Staged,

    /// Clear the live store and compile into it directly.
    ///
    /// Decisions made during the rebuild may deny access that will be
    /// granted once it finishes.
    InPlace,
}

impl CompileStrategy {
    /// Get the configuration name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompileStrategy::Staged => "staged",
            CompileStrategy::InPlace => "in_place",
        }
    }

    /// Parse a configuration name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "staged" => Some(CompileStrategy::Staged),
            "in_place" | "inplace" => Some(CompileStrategy::InPlace),
            _ => None,
        }
    }
}

impl fmt::Display for CompileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler and engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// How `compile_all` replaces the live store.
    pub compile_strategy: CompileStrategy,

    /// Log decisions on `gatehouse::audit` at `info`. When off they are
    /// still logged, at `debug`.
    pub audit_decisions: bool,

    /// Treat partially compiled components as failures in
    /// [`CompilationReport::into_result`](crate::report::CompilationReport::into_result).
    pub fail_on_partial: bool,
}

impl Default for AuthzConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            compile_strategy: CompileStrategy::Staged,
            audit_decisions: true,
            fail_on_partial: false,
        }
    }
}

impl AuthzConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GATEHOUSE_COMPILE_STRATEGY`: `staged` or `in_place` (default: staged)
    /// - `GATEHOUSE_AUDIT_DECISIONS`: log decisions at info rather than debug (default: true)
    /// - `GATEHOUSE_FAIL_ON_PARTIAL`: partial compilations are failures (default: false)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            compile_strategy: lookup(COMPILE_STRATEGY_VAR)
                .and_then(|raw| {
                    let parsed = CompileStrategy::parse(&raw);
                    if parsed.is_none() {
                        warn_fallback(COMPILE_STRATEGY_VAR, &raw, default.compile_strategy.as_str());
                    }
                    parsed
                })
                .unwrap_or(default.compile_strategy),
            audit_decisions: lookup(AUDIT_DECISIONS_VAR)
                .and_then(|raw| parse_flag(AUDIT_DECISIONS_VAR, &raw, default.audit_decisions))
                .unwrap_or(default.audit_decisions),
            fail_on_partial: lookup(FAIL_ON_PARTIAL_VAR)
                .and_then(|raw| parse_flag(FAIL_ON_PARTIAL_VAR, &raw, default.fail_on_partial))
                .unwrap_or(default.fail_on_partial),
        }
    }

    /// Set the compile strategy.
    pub fn with_compile_strategy(mut self, strategy: CompileStrategy) -> Self {
        self.compile_strategy = strategy;
        self
    }

    /// Choose between `info` (true) and `debug` (false) decision audit lines.
    pub fn with_audit_decisions(mut self, enabled: bool) -> Self {
        self.audit_decisions = enabled;
        self
    }

    /// Toggle strict handling of partial compilations.
    pub fn with_fail_on_partial(mut self, enabled: bool) -> Self {
        self.fail_on_partial = enabled;
        self
    }

    /// Validate that the configuration is acceptable for production.
    ///
    /// Production deployments must keep the decision audit trail at `info` and must not
    /// expose an empty store while recompiling.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if !self.audit_decisions {
            return Err(ConfigError::InvalidValue {
                key: AUDIT_DECISIONS_VAR.to_string(),
                message: "decision audit lines must be logged at info in production".to_string(),
            });
        }
        if self.compile_strategy == CompileStrategy::InPlace {
            return Err(ConfigError::InvalidValue {
                key: COMPILE_STRATEGY_VAR.to_string(),
                message: "in_place compilation briefly denies all requests".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str, default: bool) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn_fallback(key, raw, if default { "true" } else { "false" });
            None
        }
    }
}

fn warn_fallback(key: &str, raw: &str, default: &str) {
    tracing::warn!(key = key, value = raw, default = default, "Invalid configuration value, using default");
}
