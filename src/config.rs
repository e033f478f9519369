//! Configuration loaded from `labflow.toml`.
//!
//! [`LabflowConfig`] holds the instrument limits, the deck layout and recovery
//! policy overrides. Values missing from the file use sensible defaults.
//! The `LABFLOW_MAX_VOLUME_UL` environment variable takes precedence over the
//! file for the volume limit.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deck::DeckState;
use crate::error::{LabflowError, Result};
use crate::lifecycle::JobManager;
use crate::policy::RecoveryPolicy;
use crate::preflight::DEFAULT_MAX_VOLUME_UL;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "labflow.toml";

/// Environment variable overriding [`LabflowConfig::max_volume_ul`].
pub const MAX_VOLUME_ENV: &str = "LABFLOW_MAX_VOLUME_UL";

/// Top-level configuration loaded from `labflow.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabflowConfig {
    /// Largest volume (µL) a single aspirate or dispense may move.
    #[serde(default = "default_max_volume_ul")]
    pub max_volume_ul: f64,

    /// Labware labels present on the deck.
    #[serde(default)]
    pub deck: Vec<String>,

    /// Per-error-kind recovery overrides; unlisted kinds abort.
    #[serde(default)]
    pub recovery: RecoveryPolicy,
}

fn default_max_volume_ul() -> f64 {
    DEFAULT_MAX_VOLUME_UL
}

impl Default for LabflowConfig {
    fn default() -> Self {
        Self {
            max_volume_ul: default_max_volume_ul(),
            deck: Vec::new(),
            recovery: RecoveryPolicy::default(),
        }
    }
}

impl LabflowConfig {
    /// Load `labflow.toml` from the working directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from `path`. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<LabflowConfig>(&contents)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env_override(std::env::var(MAX_VOLUME_ENV).ok())?;
        config.check()?;
        Ok(config)
    }

    fn apply_env_override(&mut self, value: Option<String>) -> Result<()> {
        if let Some(raw) = value
            && !raw.trim().is_empty()
        {
            self.max_volume_ul = raw.trim().parse().map_err(|_| {
                LabflowError::Config(format!("{MAX_VOLUME_ENV} is not a number: {raw}"))
            })?;
        }
        Ok(())
    }

    /// Override the volume limit, e.g. from the command line. The new value
    /// must pass the same check as the file.
    pub fn set_max_volume(&mut self, max_volume_ul: f64) -> Result<()> {
        let previous = std::mem::replace(&mut self.max_volume_ul, max_volume_ul);
        if let Err(err) = self.check() {
            self.max_volume_ul = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Reject limits that would disable or break volume validation.
    pub fn check(&self) -> Result<()> {
        if !(self.max_volume_ul.is_finite() && self.max_volume_ul > 0.0) {
            return Err(LabflowError::Config(format!(
                "max_volume_ul must be a positive number, got {}",
                self.max_volume_ul
            )));
        }
        Ok(())
    }

    pub fn deck_state(&self) -> DeckState {
        DeckState::with_labware(self.deck.iter().cloned())
    }

    /// A job manager wired with this configuration.
    pub fn manager(&self) -> JobManager {
        JobManager::new(self.deck_state())
            .with_max_volume(self.max_volume_ul)
            .with_policy(self.recovery.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RecoveryAction;
    use crate::preflight::ErrorKind;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = LabflowConfig::default();
        assert_eq!(config.max_volume_ul, 1000.0);
        assert!(config.deck.is_empty());
        assert_eq!(config.recovery, RecoveryPolicy::default());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            deck = ["S1", "D1"]

            [recovery]
            tip_not_available = "require_user"
        "#;
        let config: LabflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deck, vec!["S1", "D1"]);
        assert_eq!(config.max_volume_ul, 1000.0);
        assert_eq!(
            config.recovery.action_for(ErrorKind::TipNotAvailable),
            RecoveryAction::RequireUser
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_volume_ul = 250.0\ndeck = [\"P1\"]").unwrap();

        let config = LabflowConfig::load_from(file.path()).unwrap();
        let manager = config.manager();
        assert!(manager.deck().contains("P1"));
        if std::env::var(MAX_VOLUME_ENV).is_err() {
            assert_eq!(manager.max_volume_ul(), 250.0);
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LabflowConfig::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(config.deck.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_volume_ul = \"lots\"").unwrap();
        assert!(matches!(
            LabflowConfig::load_from(file.path()),
            Err(LabflowError::Toml(_))
        ));
    }

    #[test]
    fn env_override_wins() {
        let mut config = LabflowConfig::default();
        config.apply_env_override(Some("500".into())).unwrap();
        assert_eq!(config.max_volume_ul, 500.0);

        config.apply_env_override(Some("  ".into())).unwrap();
        assert_eq!(config.max_volume_ul, 500.0);

        assert!(config.apply_env_override(Some("many".into())).is_err());
    }

    #[test]
    fn non_positive_limit_is_rejected() {
        let config = LabflowConfig {
            max_volume_ul: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.check(), Err(LabflowError::Config(_))));
    }

    #[test]
    fn max_volume_override_is_checked() {
        let mut config = LabflowConfig::default();
        config.set_max_volume(250.0).unwrap();
        assert_eq!(config.max_volume_ul, 250.0);

        for bad in [f64::INFINITY, f64::NAN, 0.0, -1.0] {
            assert!(
                matches!(config.set_max_volume(bad), Err(LabflowError::Config(_))),
                "limit {bad}"
            );
            assert_eq!(config.max_volume_ul, 250.0);
        }
    }
}
