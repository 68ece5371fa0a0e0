//! Configuration management for specwalk.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `specwalk.toml` file
//! 3. User config `~/.config/specwalk/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::kind::TestKind;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How test processes are spawned and judged.
    pub runner: RunnerConfig,

    /// Which files are eligible for indexing.
    pub discovery: DiscoveryConfig,

    /// Per-kind suffix, command and declaration identifiers.
    pub kinds: KindsConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./specwalk.toml` (project local)
    /// 2. `~/.config/specwalk/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(PROJECT_CONFIG_FILE).exists() {
            return Self::from_file(PROJECT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Self::default().with_overrides(env_var)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.with_overrides(env_var)
    }

    /// Apply `SPECWALK_*` overrides read through `lookup`, then validate.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(program) = lookup("SPECWALK_RUNNER_PROGRAM") {
            self.runner.program = program;
        }
        if let Some(marker) = lookup("SPECWALK_SUCCESS_MARKER") {
            self.runner.success_marker = marker;
        }
        if let Some(interval) = lookup("SPECWALK_POLL_INTERVAL_MS") {
            if let Ok(n) = interval.parse() {
                self.runner.poll_interval_ms = n;
            }
        }
        if let Some(window) = lookup("SPECWALK_DEBOUNCE_MS") {
            if let Ok(n) = window.parse() {
                self.discovery.debounce_ms = n;
            }
        }
        if let Some(dir) = lookup("SPECWALK_TEST_DIR") {
            self.discovery.test_dir = dir;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings that would make discovery or execution meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.program.trim().is_empty() {
            return Err(ConfigError::Invalid("runner.program must not be empty".to_string()));
        }
        if self.runner.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("runner.poll_interval_ms must be positive".to_string()));
        }
        if self.discovery.test_dir.is_empty() || self.discovery.test_dir.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "discovery.test_dir must be a single path segment, got '{}'",
                self.discovery.test_dir
            )));
        }
        for kind in TestKind::ALL {
            let entry = self.kinds.get(kind);
            if entry.identifiers.is_empty() {
                return Err(ConfigError::Invalid(format!("kinds.{kind}.identifiers is empty")));
            }
            if entry.suffix.is_empty() {
                return Err(ConfigError::Invalid(format!("kinds.{kind}.suffix is empty")));
            }
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Test process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Executable every kind command is passed to.
    pub program: String,

    /// Flag requesting colorized output from the test command.
    pub color_flag: String,

    /// Flag followed by a test name to narrow a function run.
    pub filter_flag: String,

    /// Environment variable set to `1` in every child process.
    pub color_env: String,

    /// Diagnostic-stream line prefix that latches a run as passed.
    pub success_marker: String,

    /// Message reported with an errored verdict.
    pub failure_message: String,

    /// Interval between terminal-state checks (in milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RUNNER_PROGRAM.to_string(),
            color_flag: DEFAULT_COLOR_FLAG.to_string(),
            filter_flag: DEFAULT_FILTER_FLAG.to_string(),
            color_env: DEFAULT_COLOR_ENV.to_string(),
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl RunnerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Path segment under which kind directories live.
    pub test_dir: String,

    /// File extensions to index (without leading dot).
    pub extensions: Vec<String>,

    /// Window in which repeated change events for one document are dropped.
    pub debounce_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            test_dir: DEFAULT_TEST_DIR.to_string(),
            extensions: DEFAULT_TEST_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl DiscoveryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Settings for a single test kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Filename tag: files must end in `-{suffix}.{ext}`.
    pub suffix: String,

    /// Script name handed to the runner program.
    pub command: String,

    /// Call identifiers recognized as test or suite declarations.
    pub identifiers: Vec<String>,
}

impl KindConfig {
    fn new(suffix: &str, command: &str, identifiers: &[&str]) -> Self {
        Self {
            suffix: suffix.to_string(),
            command: command.to_string(),
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether `name` is a declaration call for this kind.
    pub fn recognizes(&self, name: &str) -> bool {
        self.identifiers.iter().any(|i| i == name)
    }
}

/// The kind table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KindsConfig {
    pub comp: KindConfig,
    pub ecomp: KindConfig,
    pub spec: KindConfig,
}

impl Default for KindsConfig {
    fn default() -> Self {
        Self {
            comp: KindConfig::new(DEFAULT_COMP_SUFFIX, DEFAULT_COMP_COMMAND, DEFAULT_COMP_IDENTIFIERS),
            ecomp: KindConfig::new(
                DEFAULT_ECOMP_SUFFIX,
                DEFAULT_ECOMP_COMMAND,
                DEFAULT_ECOMP_IDENTIFIERS,
            ),
            spec: KindConfig::new(DEFAULT_SPEC_SUFFIX, DEFAULT_SPEC_COMMAND, DEFAULT_SPEC_IDENTIFIERS),
        }
    }
}

impl KindsConfig {
    pub fn get(&self, kind: TestKind) -> &KindConfig {
        match kind {
            TestKind::Comp => &self.comp,
            TestKind::Ecomp => &self.ecomp,
            TestKind::Spec => &self.spec,
        }
    }

    pub fn get_mut(&mut self, kind: TestKind) -> &mut KindConfig {
        match kind {
            TestKind::Comp => &mut self.comp,
            TestKind::Ecomp => &mut self.ecomp,
            TestKind::Spec => &mut self.spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runner.program, DEFAULT_RUNNER_PROGRAM);
        assert_eq!(config.runner.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.discovery.test_dir, DEFAULT_TEST_DIR);
        assert_eq!(config.kinds.get(TestKind::Ecomp).suffix, "comp");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[runner]"));
        assert!(toml_str.contains("[discovery]"));
        assert!(toml_str.contains("[kinds.spec]"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.runner.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_nested_test_dir() {
        let mut config = Config::default();
        config.discovery.test_dir = "tests/unit".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recognizes() {
        let kinds = KindsConfig::default();
        assert!(kinds.get(TestKind::Spec).recognizes("it"));
        assert!(!kinds.get(TestKind::Spec).recognizes("ctest"));
        assert!(kinds.get(TestKind::Comp).recognizes("fctest"));
        assert!(!kinds.get(TestKind::Ecomp).recognizes("fctest"));
    }
}
