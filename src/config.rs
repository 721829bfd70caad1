//! Configuration System
//!
//! Layered configuration: merge-policy defaults, then the global file,
//! then workspace files, then `TREEGLASS__SECTION__KEY` environment
//! variables. Tests included.

use crate::error::AgentError;
use crate::logging::LoggingConfig;
use crate::session::SessionOptions;
use crate::walker::{default_filters, ComponentFilter, WalkerOptions};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod environment;
    pub mod global_file;
    pub mod workspace_file;
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeglassConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub errors: ErrorAggregationConfig,

    /// Component filters installed on every new walker.
    #[serde(default = "default_filters")]
    pub filters: Vec<ComponentFilter>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TreeglassConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            registry: RegistryConfig::default(),
            errors: ErrorAggregationConfig::default(),
            filters: default_filters(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Delay before the bridge re-flushes after a successful send.
    #[serde(default = "default_batch_duration_ms")]
    pub batch_duration_ms: u64,
}

fn default_batch_duration_ms() -> u64 {
    crate::bridge::DEFAULT_BATCH_DURATION_MS
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            batch_duration_ms: default_batch_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Grace delay before an unmounted node's id is reclaimed.
    #[serde(default = "default_untrack_delay_ms")]
    pub untrack_delay_ms: u64,
}

fn default_untrack_delay_ms() -> u64 {
    crate::registry::DEFAULT_UNTRACK_DELAY_MS
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            untrack_delay_ms: default_untrack_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAggregationConfig {
    #[serde(default = "default_aggregation_delay_ms")]
    pub aggregation_delay_ms: u64,
}

fn default_aggregation_delay_ms() -> u64 {
    1000
}

impl Default for ErrorAggregationConfig {
    fn default() -> Self {
        Self {
            aggregation_delay_ms: default_aggregation_delay_ms(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Bridge(String),
    Registry(String),
    Errors(String),
    Filter(usize, String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Bridge(msg) => write!(f, "Bridge: {}", msg),
            ValidationError::Registry(msg) => write!(f, "Registry: {}", msg),
            ValidationError::Errors(msg) => write!(f, "Errors: {}", msg),
            ValidationError::Filter(index, msg) => write!(f, "Filter #{}: {}", index, msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl TreeglassConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.bridge.batch_duration_ms == 0 {
            errors.push(ValidationError::Bridge(
                "batch_duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.registry.untrack_delay_ms == 0 {
            errors.push(ValidationError::Registry(
                "untrack_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.errors.aggregation_delay_ms == 0 {
            errors.push(ValidationError::Errors(
                "aggregation_delay_ms must be greater than zero".to_string(),
            ));
        }
        for (index, filter) in self.filters.iter().enumerate() {
            if let Err(e) = filter.validate() {
                errors.push(ValidationError::Filter(index, e.to_string()));
            }
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<&TreeglassConfig> for SessionOptions {
    fn from(config: &TreeglassConfig) -> Self {
        SessionOptions {
            batch_duration_ms: config.bridge.batch_duration_ms,
            walker: WalkerOptions {
                untrack_delay_ms: config.registry.untrack_delay_ms,
                aggregation_delay_ms: config.errors.aggregation_delay_ms,
            },
            filters: config.filters.clone(),
        }
    }
}

/// Loads `TreeglassConfig` from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    pub fn load(workspace_root: &Path) -> Result<TreeglassConfig, AgentError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder);
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root);
        let builder = sources::environment::add_to_builder(builder);

        let config: TreeglassConfig = builder.build()?.try_deserialize()?;
        debug!(workspace_root = %workspace_root.display(), "configuration loaded");
        Ok(config)
    }

    /// Load configuration from a single file, defaults underneath.
    pub fn load_from_file(path: &Path) -> Result<TreeglassConfig, AgentError> {
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load and validate, folding validation failures into one error.
    pub fn load_validated(workspace_root: &Path) -> Result<TreeglassConfig, AgentError> {
        let config = Self::load(workspace_root)?;
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            AgentError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        Ok(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }

    /// Only defaults, no files or environment.
    pub fn defaults() -> Result<TreeglassConfig, AgentError> {
        Ok(Config::builder().build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // HOME and TREEGLASS_* are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct HomeGuard(Option<String>);

    impl HomeGuard {
        fn set(home: &Path) -> Self {
            let original = std::env::var("HOME").ok();
            std::env::set_var("HOME", home);
            HomeGuard(original)
        }
    }

    impl Drop for HomeGuard {
        fn drop(&mut self) {
            match &self.0 {
                Some(home) => std::env::set_var("HOME", home),
                None => std::env::remove_var("HOME"),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = TreeglassConfig::default();
        assert_eq!(config.bridge.batch_duration_ms, 100);
        assert_eq!(config.registry.untrack_delay_ms, 1000);
        assert_eq!(config.errors.aggregation_delay_ms, 1000);
        assert_eq!(config.filters, default_filters());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_empty_sources() {
        assert_eq!(ConfigLoader::defaults().unwrap(), TreeglassConfig::default());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = TreeglassConfig::default();
        config.bridge.batch_duration_ms = 0;
        config.filters.push(ComponentFilter::DisplayName {
            value: "(".to_string(),
            is_enabled: true,
        });
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[1], ValidationError::Filter(1, _)));
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("treeglass.toml");
        std::fs::write(
            &config_file,
            r#"
[bridge]
batch_duration_ms = 50

[[filters]]
type = "display_name"
value = "^Internal"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        assert_eq!(config.bridge.batch_duration_ms, 50);
        assert_eq!(config.registry.untrack_delay_ms, 1000);
        assert_eq!(
            config.filters,
            vec![ComponentFilter::DisplayName {
                value: "^Internal".to_string(),
                is_enabled: true,
            }]
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_workspace_config_overrides_global_config() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let global_dir = home.join(".config").join("treeglass");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[bridge]\nbatch_duration_ms = 25\n[registry]\nuntrack_delay_ms = 300\n",
        )
        .unwrap();
        let _home = HomeGuard::set(&home);

        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            "[bridge]\nbatch_duration_ms = 75\n",
        )
        .unwrap();

        assert_eq!(
            ConfigLoader::global_config_path().unwrap(),
            global_dir.join("config.toml")
        );
        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.bridge.batch_duration_ms, 75);
        assert_eq!(config.registry.untrack_delay_ms, 300);
    }

    #[test]
    fn test_environment_overrides_files() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let _home = HomeGuard::set(temp_dir.path());
        std::env::set_var("TREEGLASS__ERRORS__AGGREGATION_DELAY_MS", "250");

        let result = ConfigLoader::load(temp_dir.path());
        std::env::remove_var("TREEGLASS__ERRORS__AGGREGATION_DELAY_MS");

        let config = result.unwrap();
        assert_eq!(config.errors.aggregation_delay_ms, 250);
        assert_eq!(config.bridge.batch_duration_ms, 100);
    }

    #[test]
    fn test_env_specific_workspace_file() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let _home = HomeGuard::set(temp_dir.path());
        let config_dir = temp_dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[bridge]\nbatch_duration_ms = 10\n")
            .unwrap();
        std::fs::write(config_dir.join("ci.toml"), "[bridge]\nbatch_duration_ms = 20\n").unwrap();
        std::env::set_var("TREEGLASS_ENV", "ci");

        let result = ConfigLoader::load(temp_dir.path());
        std::env::remove_var("TREEGLASS_ENV");

        assert_eq!(result.unwrap().bridge.batch_duration_ms, 20);
    }

    #[test]
    fn test_session_options_from_config() {
        let mut config = TreeglassConfig::default();
        config.registry.untrack_delay_ms = 42;
        let options = SessionOptions::from(&config);
        assert_eq!(options.batch_duration_ms, 100);
        assert_eq!(options.walker.untrack_delay_ms, 42);
        assert_eq!(options.filters, default_filters());
    }
}
