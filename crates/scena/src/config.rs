//! Configuration types for the Scena pipeline.
//!
//! This module provides configuration structures controlling session
//! budgets, validation layers, transition thresholds, and richness
//! thresholds. All types implement [`serde::Deserialize`] for loading
//! from external sources (the CLI loads them from TOML).
//!
//! # Example
//!
//! ```
//! # use scena::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.session().stage_budget().is_none());
//! assert!(config.validation().options.type_check);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{richness::RichnessConfig, transitions::TransitionPolicy, validate::ValidationOptions};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session and checkpoint settings.
    session: SessionConfig,

    /// Validation layer settings.
    validation: ValidationConfig,

    /// Transition analysis thresholds.
    transitions: TransitionPolicy,

    /// Richness scoring thresholds.
    richness: RichnessConfig,
}

impl AppConfig {
    /// Returns the session configuration.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Returns the validation configuration.
    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Returns the transition policy.
    pub fn transitions(&self) -> &TransitionPolicy {
        &self.transitions
    }

    /// Returns the richness thresholds.
    pub fn richness(&self) -> &RichnessConfig {
        &self.richness
    }

    /// Replace the per-invocation stage budget.
    pub fn with_stage_budget(mut self, budget: Option<Duration>) -> Self {
        self.session.stage_budget_ms = budget.map(|d| d.as_millis() as u64);
        self
    }

    /// Enable or disable strict validation (critical diagnostics become
    /// errors).
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.validation.strict = strict;
        self
    }
}

/// Session and checkpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wall-clock budget per invocation, in milliseconds. `None` runs to
    /// completion.
    pub stage_budget_ms: Option<u64>,

    /// Age in hours after which a checkpoint is considered stale and
    /// eligible for the bulk sweep.
    pub checkpoint_ttl_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stage_budget_ms: None,
            checkpoint_ttl_hours: 24,
        }
    }
}

impl SessionConfig {
    /// The per-invocation wall-clock budget.
    pub fn stage_budget(&self) -> Option<Duration> {
        self.stage_budget_ms.map(Duration::from_millis)
    }

    /// The checkpoint staleness cutoff.
    pub fn checkpoint_ttl(&self) -> Duration {
        Duration::from_secs(self.checkpoint_ttl_hours * 3600)
    }
}

/// Validation layer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Which optional layers run.
    #[serde(flatten)]
    pub options: ValidationOptions,

    /// Treat critical diagnostics as errors instead of reported results.
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.session().stage_budget().is_none());
        assert_eq!(config.session().checkpoint_ttl(), Duration::from_secs(86400));
        assert!(config.validation().options.type_check);
        assert!(!config.validation().strict);
        assert_eq!(config.transitions().recommended_overlap, 15);
        assert_eq!(config.richness().augment_threshold, 40);
    }

    #[test]
    fn test_builder_overrides() {
        let config = AppConfig::default()
            .with_stage_budget(Some(Duration::ZERO))
            .with_strict_validation(true);
        assert_eq!(config.session().stage_budget(), Some(Duration::ZERO));
        assert!(config.validation().strict);
    }
}
