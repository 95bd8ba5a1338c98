//! Generator configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which abstract methods count as mutator candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Name starts with the prefix and at least one parameter.
    /// A single parameter must also match the property named by the method.
    #[default]
    Prefixed,
    /// Any abstract method with at least one parameter, matched by parameter names
    Generalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub policy: FilterPolicy,
    pub prefix: String,
    pub override_annotation: String,
    /// Types every value type is assignable to
    pub universal_supertypes: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::Prefixed,
            prefix: "with".to_string(),
            override_annotation: "java.lang.Override".to_string(),
            universal_supertypes: vec!["java.lang.Object".to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("mutator prefix must not be empty when the policy is `prefixed`")]
    EmptyPrefix,
}

impl GeneratorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_policy(mut self, policy: FilterPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy == FilterPolicy::Prefixed && self.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        Ok(())
    }

    /// Matches a configured type written fully qualified or by simple name
    pub fn is_universal_supertype(&self, name: &str) -> bool {
        self.universal_supertypes
            .iter()
            .any(|t| t == name || t.rsplit('.').next() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GeneratorConfig::from_toml_str("").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert!(config.is_universal_supertype("java.lang.Object"));
    }

    #[test]
    fn test_universal_supertype_by_simple_name() {
        let config = GeneratorConfig::default();
        assert!(config.is_universal_supertype("Object"));
        assert!(!config.is_universal_supertype("lang.Object"));
        assert!(!config.is_universal_supertype("Objects"));
    }

    #[test]
    fn test_partial_config() {
        let config = GeneratorConfig::from_toml_str("policy = \"generalized\"\nprefix = \"copyWith\"\n").unwrap();
        assert_eq!(config.policy, FilterPolicy::Generalized);
        assert_eq!(config.prefix, "copyWith");
        assert_eq!(config.override_annotation, "java.lang.Override");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            GeneratorConfig::from_toml_str("polcy = \"prefixed\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_prefix_rejected_for_prefixed_policy() {
        assert!(matches!(
            GeneratorConfig::from_toml_str("prefix = \"\"\n"),
            Err(ConfigError::EmptyPrefix)
        ));
        assert!(GeneratorConfig::from_toml_str("policy = \"generalized\"\nprefix = \"\"\n").is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("withgen.toml");
        std::fs::write(&path, "universal_supertypes = []\n").unwrap();
        let config = GeneratorConfig::load(&path).unwrap();
        assert!(!config.is_universal_supertype("java.lang.Object"));

        let missing = GeneratorConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
