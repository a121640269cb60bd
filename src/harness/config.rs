//! Configuration for harness runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialect::{DialectDescriptor, DialectRegistry};
use crate::error::ConfigError;

/// Default compile/load timeout in seconds.
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;

/// Default test timeout in seconds.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 60;

/// Number of verdicts kept verbatim for display.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// Configuration for evaluating candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Wall-clock limit for the compile/load stage.
    pub compile_timeout_secs: u64,
    /// Wall-clock limit for the test stage.
    pub test_timeout_secs: u64,
    /// Number of evaluations allowed in flight at once.
    pub parallel: usize,
    /// Verdicts retained verbatim in the aggregate.
    pub sample_limit: usize,
    /// Errors shown in the human-readable summary.
    pub error_listing_limit: usize,
    /// Captured diagnostics longer than this are truncated.
    pub max_error_chars: usize,
    /// Run the lexical S-expression check before invoking a toolchain.
    pub precheck: bool,
    /// Directory for temporary sources (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
    /// Extra or overriding dialect descriptors.
    pub dialects: Vec<DialectDescriptor>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compile_timeout_secs: DEFAULT_COMPILE_TIMEOUT_SECS,
            test_timeout_secs: DEFAULT_TEST_TIMEOUT_SECS,
            parallel: 1,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            error_listing_limit: 5,
            max_error_chars: 10_000,
            precheck: false,
            temp_dir: None,
            dialects: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a YAML file.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and every configured descriptor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compile_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "compile_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.test_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "test_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.parallel == 0 {
            return Err(ConfigError::Validation(
                "parallel must be at least 1".to_string(),
            ));
        }
        for descriptor in &self.dialects {
            descriptor.validate()?;
        }
        Ok(())
    }

    /// Sets the compile timeout in seconds.
    pub fn with_compile_timeout_secs(mut self, secs: u64) -> Self {
        self.compile_timeout_secs = secs;
        self
    }

    /// Sets the test timeout in seconds.
    pub fn with_test_timeout_secs(mut self, secs: u64) -> Self {
        self.test_timeout_secs = secs;
        self
    }

    /// Sets the number of concurrent evaluations.
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets how many verdicts are kept for display.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Enables or disables the lexical pre-check.
    pub fn with_precheck(mut self, enabled: bool) -> Self {
        self.precheck = enabled;
        self
    }

    /// Sets the directory for temporary sources.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Adds a dialect descriptor.
    pub fn with_dialect(mut self, descriptor: DialectDescriptor) -> Self {
        self.dialects.push(descriptor);
        self
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    /// Built-in registry extended with the configured descriptors.
    pub fn registry(&self) -> Result<DialectRegistry, ConfigError> {
        let mut registry = DialectRegistry::builtin();
        for descriptor in &self.dialects {
            registry = registry.with_descriptor(descriptor.clone())?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.compile_timeout(), Duration::from_secs(30));
        assert_eq!(config.test_timeout(), Duration::from_secs(60));
        assert_eq!(config.parallel, 1);
        assert_eq!(config.sample_limit, 10);
        assert!(!config.precheck);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = HarnessConfig::default()
            .with_compile_timeout_secs(5)
            .with_test_timeout_secs(2)
            .with_parallel(4)
            .with_precheck(true)
            .with_dialect(DialectDescriptor::new("rkt", &["racket"], &["raco", "test"], ".rkt"));

        assert_eq!(config.compile_timeout_secs, 5);
        assert_eq!(config.test_timeout(), Duration::from_secs(2));
        assert_eq!(config.parallel, 4);
        assert!(config.precheck);
        assert!(config.registry().unwrap().contains("rkt"));
    }

    #[test]
    fn test_zero_timeout_kept_and_rejected() {
        let config = HarnessConfig::default().with_compile_timeout_secs(0);
        assert_eq!(config.compile_timeout_secs, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = HarnessConfig::default();
        config.parallel = 0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.test_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_yaml_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harness.yaml");
        std::fs::write(
            &path,
            "compile_timeout_secs: 10\nparallel: 2\ndialects:\n  - tag: rkt\n    compile: [racket]\n    test: [raco, test]\n    extension: .rkt\n",
        )
        .unwrap();

        let config = HarnessConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.compile_timeout_secs, 10);
        assert_eq!(config.test_timeout_secs, DEFAULT_TEST_TIMEOUT_SECS);
        assert_eq!(config.parallel, 2);
        assert_eq!(config.dialects.len(), 1);
        assert_eq!(config.registry().unwrap().len(), 6);
    }

    #[test]
    fn test_from_yaml_file_invalid_dialect() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harness.yaml");
        std::fs::write(
            &path,
            "dialects:\n  - tag: bad\n    compile: []\n    test: [t]\n    extension: .b\n",
        )
        .unwrap();

        let err = HarnessConfig::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Dialect(_)));
    }

    #[test]
    fn test_from_yaml_file_missing() {
        let err = HarnessConfig::from_yaml_file(Path::new("/nonexistent/harness.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
