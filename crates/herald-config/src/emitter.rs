//! Emitter configuration

use crate::bindings::ListenerDeclarations;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Offset added to the observer count for registrations without a priority.
pub const BASE_PRIORITY: i64 = 100;

/// How an emission that resolved to several event names is dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Dispatch resolved names one after another, in resolution order
    #[default]
    Sequential,

    /// Dispatch resolved names concurrently (requires the `parallel` feature
    /// of herald-core). Stop and error short-circuiting only applies within
    /// a single event name under this policy.
    Parallel,
}

impl DispatchPolicy {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

/// Wildcard resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WildcardConfig {
    /// Marker character that turns a token into a pattern
    pub marker: char,

    /// Match registered names case-insensitively
    pub case_insensitive: bool,
}

impl Default for WildcardConfig {
    fn default() -> Self {
        Self {
            marker: '*',
            case_insensitive: true,
        }
    }
}

/// Configuration for an emitter instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Priority offset for unprioritized observers (lower = earlier)
    pub base_priority: i64,

    /// Dispatch policy for multi-event emissions
    pub dispatch: DispatchPolicy,

    /// Wildcard resolution settings
    pub wildcard: WildcardConfig,

    /// Separator between event names in a multi-event emission
    pub separator: String,

    /// Declarative listener bindings, keyed by listener name
    pub listeners: ListenerDeclarations,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            base_priority: BASE_PRIORITY,
            dispatch: DispatchPolicy::default(),
            wildcard: WildcardConfig::default(),
            separator: " ".to_string(),
            listeners: ListenerDeclarations::default(),
        }
    }
}

impl EmitterConfig {
    /// Parse and validate a config from TOML source
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            dispatch = config.dispatch.as_str(),
            listeners = config.listeners.len(),
            "Loaded emitter config"
        );
        Ok(config)
    }

    /// Set the base priority
    pub fn with_base_priority(mut self, base_priority: i64) -> Self {
        self.base_priority = base_priority;
        self
    }

    /// Set the dispatch policy
    pub fn with_dispatch(mut self, dispatch: DispatchPolicy) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the multi-event separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set wildcard case sensitivity
    pub fn with_case_insensitive_wildcards(mut self, enabled: bool) -> Self {
        self.wildcard.case_insensitive = enabled;
        self
    }

    /// Check semantic constraints serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.separator.is_empty() {
            return Err(ConfigError::Invalid(
                "separator must not be empty".to_string(),
            ));
        }

        if self.separator.contains(self.wildcard.marker) {
            return Err(ConfigError::Invalid(format!(
                "wildcard marker '{}' must not appear in separator {:?}",
                self.wildcard.marker, self.separator
            )));
        }

        for (listener, events) in self.listeners.iter() {
            for (event, decl) in events {
                if event.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "listener '{}' declares a binding with an empty event name",
                        listener
                    )));
                }
                if decl.specs().iter().any(|spec| spec.method.is_empty()) {
                    return Err(ConfigError::Invalid(format!(
                        "listener '{}' declares an empty method for event '{}'",
                        listener, event
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_emitter_config_default() {
        let config = EmitterConfig::default();

        assert_eq!(config.base_priority, 100);
        assert_eq!(config.dispatch, DispatchPolicy::Sequential);
        assert_eq!(config.wildcard.marker, '*');
        assert!(config.wildcard.case_insensitive);
        assert_eq!(config.separator, " ");
        assert!(config.listeners.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_emitter_config_empty_toml_uses_defaults() {
        let config = EmitterConfig::from_toml_str("").unwrap();
        assert_eq!(config, EmitterConfig::default());
    }

    #[test]
    fn test_emitter_config_partial_toml() {
        let config = EmitterConfig::from_toml_str(
            r#"
base_priority = 10
dispatch = "parallel"

[wildcard]
case_insensitive = false
"#,
        )
        .unwrap();

        assert_eq!(config.base_priority, 10);
        assert_eq!(config.dispatch, DispatchPolicy::Parallel);
        // Unset wildcard fields keep their defaults
        assert_eq!(config.wildcard.marker, '*');
        assert!(!config.wildcard.case_insensitive);
    }

    #[test]
    fn test_emitter_config_rejects_unknown_dispatch() {
        let result = EmitterConfig::from_toml_str(r#"dispatch = "eventually""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_emitter_config_rejects_empty_separator() {
        let result = EmitterConfig::from_toml_str(r#"separator = """#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_emitter_config_rejects_marker_in_separator() {
        let config = EmitterConfig::default().with_separator("*");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wildcard marker"));
    }

    #[test]
    fn test_emitter_config_builder() {
        let config = EmitterConfig::default()
            .with_base_priority(0)
            .with_dispatch(DispatchPolicy::Parallel)
            .with_separator(",")
            .with_case_insensitive_wildcards(false);

        assert_eq!(config.base_priority, 0);
        assert_eq!(config.dispatch, DispatchPolicy::Parallel);
        assert_eq!(config.separator, ",");
        assert!(!config.wildcard.case_insensitive);
    }

    #[test]
    fn test_emitter_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_priority = 200

[listeners.audit]
"app.start" = "on_start"
"#
        )
        .unwrap();

        let config = EmitterConfig::load(file.path()).unwrap();
        assert_eq!(config.base_priority, 200);
        assert_eq!(config.listeners.len(), 1);
    }

    #[test]
    fn test_emitter_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        match EmitterConfig::load(&missing) {
            Err(ConfigError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_policy_as_str() {
        assert_eq!(DispatchPolicy::Sequential.as_str(), "sequential");
        assert_eq!(DispatchPolicy::Parallel.as_str(), "parallel");
    }
}
