//! Fairqueue configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler options
    pub scheduler: SchedulerConfig,

    /// Service classes, registered in the order listed
    pub classes: Vec<ClassConfig>,
}

/// One service class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Class identifier used when submitting
    pub id: String,

    /// Relative share of service; must be positive
    pub weight: f64,
}

impl ClassConfig {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self { id: id.into(), weight }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// Rejects non-positive weights and duplicate class ids so that startup
    /// fails with a clear message instead of a registration error.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !crate::scheduler::is_valid_weight(class.weight) {
                return Err(eyre::eyre!(
                    "Class '{}' has invalid weight {}: must be positive and finite",
                    class.id,
                    class.weight
                ));
            }
            if !seen.insert(class.id.as_str()) {
                return Err(eyre::eyre!("Class '{}' is defined more than once", class.id));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise the first readable file among
    /// [`Config::default_locations`] wins, falling back to defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        Self::load_with_fallbacks(config_path, &Self::default_locations())
    }

    /// Project-local `.fairqueue.yml`, then `~/.config/fairqueue/fairqueue.yml`
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(".fairqueue.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("fairqueue").join("fairqueue.yml"));
        }
        locations
    }

    fn load_with_fallbacks(config_path: Option<&PathBuf>, locations: &[PathBuf]) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for location in locations.iter().filter(|l| l.exists()) {
            match Self::load_from_file(location) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {:#}", location.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ShutdownPolicy;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.classes.is_empty());
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Drain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
scheduler:
  shutdown-policy: fail
  stop-timeout-ms: 1000

classes:
  - id: gold
    weight: 4.0
  - id: silver
    weight: 2
  - id: bronze
    weight: 1.0
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Fail);
        assert_eq!(config.scheduler.stop_timeout_ms, 1000);
        assert_eq!(
            config.classes,
            vec![
                ClassConfig::new("gold", 4.0),
                ClassConfig::new("silver", 2.0),
                ClassConfig::new("bronze", 1.0),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
classes:
  - id: api
    weight: 2.0
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.classes.len(), 1);
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Drain);
        assert_eq!(config.scheduler.stop_timeout_ms, 5_000);
    }

    #[test]
    fn test_validate_rejects_bad_classes() {
        let config = Config {
            classes: vec![ClassConfig::new("gold", 0.0)],
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("gold"));

        let config = Config {
            classes: vec![ClassConfig::new("gold", 1.0), ClassConfig::new("gold", 2.0)],
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "classes:\n  - id: video\n    weight: 3.0").unwrap();

        let path = file.path().to_path_buf();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.classes, vec![ClassConfig::new("video", 3.0)]);
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let missing = PathBuf::from("/nonexistent/fairqueue.yml");
        assert!(Config::load(Some(&missing)).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "classes:\n  - id: video\n    weight: -3.0").unwrap();
        let path = file.path().to_path_buf();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid weight"));
    }

    #[test]
    fn test_default_locations() {
        let locations = Config::default_locations();

        assert_eq!(locations[0], PathBuf::from(".fairqueue.yml"));
        if let Some(user) = locations.get(1) {
            assert!(user.ends_with("fairqueue/fairqueue.yml"));
        }
    }

    #[test]
    fn test_fallback_prefers_first_location() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = dir.path().join(".fairqueue.yml");
        let user = dir.path().join("fairqueue.yml");
        fs::write(&local, "classes:\n  - id: local\n    weight: 1.0\n").unwrap();
        fs::write(&user, "classes:\n  - id: user\n    weight: 1.0\n").unwrap();

        let config = Config::load_with_fallbacks(None, &[local, user]).unwrap();
        assert_eq!(config.classes, vec![ClassConfig::new("local", 1.0)]);
    }

    #[test]
    fn test_fallback_skips_missing_and_invalid_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.yml");
        let broken = dir.path().join(".fairqueue.yml");
        let user = dir.path().join("fairqueue.yml");
        fs::write(&broken, "classes:\n  - id: local\n    weight: 0\n").unwrap();
        fs::write(&user, "classes:\n  - id: user\n    weight: 2.0\n").unwrap();

        let config = Config::load_with_fallbacks(None, &[missing, broken, user]).unwrap();
        assert_eq!(config.classes, vec![ClassConfig::new("user", 2.0)]);
    }

    #[test]
    fn test_fallback_uses_defaults_when_nothing_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_with_fallbacks(None, &[dir.path().join(".fairqueue.yml")]).unwrap();

        assert!(config.classes.is_empty());
        assert_eq!(config.scheduler.shutdown_policy, ShutdownPolicy::Drain);
    }

    #[test]
    fn test_validate_rejects_weight_with_unbounded_cost() {
        let config = Config {
            classes: vec![ClassConfig::new("tiny", 1e-300)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
