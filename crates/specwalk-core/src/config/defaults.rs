//! Default values for specwalk configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Runner Defaults
// ============================================================================

/// Package-manager executable every test command is dispatched through.
pub const DEFAULT_RUNNER_PROGRAM: &str = "yarn";

/// Flag asking the test command for colorized output.
pub const DEFAULT_COLOR_FLAG: &str = "--color";

/// Flag that narrows a run down to tests matching a name.
pub const DEFAULT_FILTER_FLAG: &str = "-t";

/// Environment variable set to `1` to force colors in child processes.
pub const DEFAULT_COLOR_ENV: &str = "FORCE_COLOR";

/// Line prefix on the diagnostic stream that marks a successful run.
pub const DEFAULT_SUCCESS_MARKER: &str = "PASS";

/// Message attached to an errored verdict.
pub const DEFAULT_FAILURE_MESSAGE: &str = "failed";

/// Interval between terminal-state checks while a batch runs (1 second).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Path segment that roots every test tree.
pub const DEFAULT_TEST_DIR: &str = "test";

/// Source file extensions eligible for indexing.
pub const DEFAULT_TEST_EXTENSIONS: &[&str] = &["ts"];

/// Re-indexing the same document within this window is suppressed (1 second).
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

// ============================================================================
// Kind Defaults
// ============================================================================

pub const DEFAULT_COMP_SUFFIX: &str = "comp";
pub const DEFAULT_COMP_COMMAND: &str = "ctest";
pub const DEFAULT_COMP_IDENTIFIERS: &[&str] = &["fctest", "ctest", "describe", "csuite"];

pub const DEFAULT_ECOMP_SUFFIX: &str = "comp";
pub const DEFAULT_ECOMP_COMMAND: &str = "etest";
pub const DEFAULT_ECOMP_IDENTIFIERS: &[&str] = &["ctest", "describe", "csuite"];

pub const DEFAULT_SPEC_SUFFIX: &str = "spec";
pub const DEFAULT_SPEC_COMMAND: &str = "test";
pub const DEFAULT_SPEC_IDENTIFIERS: &[&str] = &["it", "describe"];

// ============================================================================
// Files
// ============================================================================

/// Project-local configuration file name.
pub const PROJECT_CONFIG_FILE: &str = "specwalk.toml";

/// Directory under the user config dir holding `config.toml`.
pub const USER_CONFIG_DIR: &str = "specwalk";

/// Changelog file updated by `specwalk bump`.
pub const DEFAULT_CHANGELOG_FILE: &str = "CHANGELOG.md";
