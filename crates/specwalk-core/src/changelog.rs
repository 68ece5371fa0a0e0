//! Changelog release bumping.
//!
//! A release turns the pending `## [Unreleased]` section into a dated version
//! section and commits the result:
//!
//! ```text
//! ## [Unreleased]            ## [Unreleased]
//!                      =>
//! - fixed things             ## [1.2.4] - 2024-05-02
//!
//! ## [1.2.3] - 2024-04-01    - fixed things
//!                            ...
//! ```

use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use thiserror::Error;

/// Changelog errors.
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("one parameter must be passed major|minor|patch")]
    InvalidBump,

    #[error("failed to find last published version")]
    MissingUnreleased,

    #[error("wrong version format: {0}")]
    VersionFormat(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git commit failed: {0}")]
    Commit(String),

    #[error("Invalid header pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Which version component to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl Bump {
    /// Parse from the full argument list, which must hold exactly one value.
    pub fn from_args<I, S>(args: I) -> Result<Self, ChangelogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(arg), None) => arg.as_ref().parse(),
            _ => Err(ChangelogError::InvalidBump),
        }
    }
}

impl FromStr for Bump {
    type Err = ChangelogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Bump::Major),
            "minor" => Ok(Bump::Minor),
            "patch" => Ok(Bump::Patch),
            _ => Err(ChangelogError::InvalidBump),
        }
    }
}

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Increment one component, resetting the lower ones.
    pub fn bump(self, bump: Bump) -> Result<Self, ChangelogError> {
        let next = |n: u64| {
            n.checked_add(1)
                .ok_or_else(|| ChangelogError::VersionFormat(self.to_string()))
        };
        Ok(match bump {
            Bump::Major => Version::new(next(self.major)?, 0, 0),
            Bump::Minor => Version::new(self.major, next(self.minor)?, 0),
            Bump::Patch => Version::new(self.major, self.minor, next(self.patch)?),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Result of [`bump_changelog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpedChangelog {
    pub content: String,
    pub version: Version,
}

/// Insert a new version header below the first Unreleased line.
///
/// The new version is `bump` applied to the first published version header
/// found in the file, or to `0.0.0` when nothing was published yet.
pub fn bump_changelog(content: &str, bump: Bump, today: NaiveDate) -> Result<BumpedChangelog, ChangelogError> {
    let unreleased = Regex::new(r"## \[Unreleased\]")?;
    let published = Regex::new(r"## \[(\d+)\.(\d+)\.(\d+)\]")?;

    let lines: Vec<&str> = content.split('\n').collect();
    let unreleased_at = lines
        .iter()
        .position(|line| unreleased.is_match(line))
        .ok_or(ChangelogError::MissingUnreleased)?;

    let previous = match lines.iter().find_map(|line| published.captures(line)) {
        Some(caps) => {
            let part = |i: usize| -> Result<u64, ChangelogError> {
                caps[i]
                    .parse()
                    .map_err(|_| ChangelogError::VersionFormat(caps[0].to_string()))
            };
            Version::new(part(1)?, part(2)?, part(3)?)
        }
        None => Version::default(),
    };
    let version = previous.bump(bump)?;
    let header = format!("## [{}] - {}", version, today.format("%Y-%m-%d"));

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    out.extend_from_slice(&lines[..=unreleased_at]);
    out.push("");
    out.push(&header);
    out.extend_from_slice(&lines[unreleased_at + 1..]);

    Ok(BumpedChangelog {
        content: out.join("\n"),
        version,
    })
}

/// Commit all tracked changes in `dir` as the release of `version`.
pub fn commit_changelog(dir: &Path, version: &Version) -> Result<(), ChangelogError> {
    let message = format!("CHANGELOG new version {}", version);
    let output = Command::new("git")
        .args(["commit", "-a", "-m", &message])
        .current_dir(dir)
        .output()
        .map_err(|source| ChangelogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        return Err(ChangelogError::Commit(detail.trim().to_string()));
    }
    Ok(())
}

/// Bump the changelog file in place and return the new version.
pub fn update_changelog_file(path: &Path, bump: Bump, today: NaiveDate) -> Result<Version, ChangelogError> {
    let io_error = |source| ChangelogError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(io_error)?;
    let bumped = bump_changelog(&content, bump, today)?;
    std::fs::write(path, bumped.content).map_err(io_error)?;
    tracing::info!(version = %bumped.version, path = %path.display(), "changelog bumped");
    Ok(bumped.version)
}
