//! Workspace and file location conventions.
//!
//! A file is a test file when its path looks like
//!
//! ```text
//! <workspace>/.../<component>/test/<kind>/.../<name>-<suffix>.<ext>
//! ```
//!
//! where `test` is the configured test directory, `<kind>` one of the known
//! kinds, and `<suffix>` the kind's filename tag from the kind table.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::config::Config;
use crate::kind::TestKind;
use crate::registry::{Service, TestFile};

/// A workspace folder open in the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Workspace {
    pub name: String,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Workspace named after its root directory.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { name, root }
    }
}

/// An open document as reported by the editor host.
#[derive(Debug, Clone)]
pub struct Document {
    pub location: Url,
    pub text: String,
    pub workspace: Workspace,
}

impl Document {
    pub fn new(location: Url, text: impl Into<String>, workspace: Workspace) -> Self {
        Self {
            location,
            text: text.into(),
            workspace,
        }
    }

    /// Document for a local file path.
    pub fn from_path(path: &Path, text: impl Into<String>, workspace: Workspace) -> Option<Self> {
        let location = Url::from_file_path(path).ok()?;
        Some(Self::new(location, text, workspace))
    }
}

/// A test file location split into its registry entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub service: Service,
    pub file: TestFile,
}

/// Classify a document location.
///
/// Returns `None` for anything that is not a local test file by convention.
pub fn classify(location: &Url, workspace: &Workspace, config: &Config) -> Option<Located> {
    if location.scheme() != "file" {
        return None;
    }
    let path = location.to_file_path().ok()?;
    classify_path(&path, workspace, config)
}

/// Same as [`classify`] for a local path.
pub fn classify_path(path: &Path, workspace: &Workspace, config: &Config) -> Option<Located> {
    let segments: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    let file_name = *segments.last()?;

    // the kind directory must be followed by at least the file itself
    let (test_index, kind) = segments[..segments.len() - 1]
        .windows(2)
        .enumerate()
        .find_map(|(i, pair)| {
            (pair[0] == config.discovery.test_dir)
                .then(|| pair[1].parse::<TestKind>().ok())
                .flatten()
                .map(|kind| (i, kind))
        })?;

    if !has_test_suffix(file_name, &config.kinds.get(kind).suffix, &config.discovery.extensions) {
        return None;
    }

    let service_name = if test_index == 0 {
        workspace.name.clone()
    } else {
        segments[test_index - 1].to_string()
    };
    let root = kind_dir(path, &config.discovery.test_dir, kind)?;

    Some(Located {
        service: Service {
            name: service_name,
            kind,
            root,
            workspace: workspace.clone(),
        },
        file: TestFile {
            path: path.to_path_buf(),
            kind,
            workspace: workspace.clone(),
        },
    })
}

fn has_test_suffix(file_name: &str, suffix: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        let tail = format!("-{}.{}", suffix, ext);
        file_name.len() > tail.len() && file_name.ends_with(&tail)
    })
}

/// `<...>/<test_dir>/<kind>` prefix of `path`.
fn kind_dir(path: &Path, test_dir: &str, kind: TestKind) -> Option<PathBuf> {
    let mut prefix = PathBuf::new();
    let mut previous_was_test = false;
    for component in path.components() {
        prefix.push(component);
        if let Component::Normal(segment) = component {
            if previous_was_test && segment == kind.as_str() {
                return Some(prefix);
            }
            previous_was_test = segment == test_dir;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        Workspace::from_root("/repo")
    }

    fn located(path: &str) -> Option<Located> {
        classify_path(Path::new(path), &workspace(), &Config::default())
    }

    #[test]
    fn test_spec_file() {
        let located = located("/repo/services/billing/test/spec/invoice-spec.ts").unwrap();
        assert_eq!(located.service.name, "billing");
        assert_eq!(located.service.kind, TestKind::Spec);
        assert_eq!(located.service.root, PathBuf::from("/repo/services/billing/test/spec"));
        assert_eq!(located.file.kind, TestKind::Spec);
        assert_eq!(located.service.key().to_string(), "/billing-spec");
    }

    #[test]
    fn test_ecomp_shares_comp_suffix() {
        let located = located("/repo/billing/test/ecomp/flows/checkout-comp.ts").unwrap();
        assert_eq!(located.file.kind, TestKind::Ecomp);
        assert_eq!(located.service.root, PathBuf::from("/repo/billing/test/ecomp"));
        assert!(self::located("/repo/billing/test/ecomp/checkout-ecomp.ts").is_none());
    }

    #[test]
    fn test_rejects_non_conforming_paths() {
        assert!(located("/repo/billing/test/spec/invoice.ts").is_none());
        assert!(located("/repo/billing/test/spec/invoice-comp.ts").is_none());
        assert!(located("/repo/billing/test/unit/invoice-spec.ts").is_none());
        assert!(located("/repo/billing/tests/spec/invoice-spec.ts").is_none());
        assert!(located("/repo/billing/test/spec/invoice-spec.js").is_none());
        assert!(located("/repo/billing/test/spec").is_none());
        assert!(located("/repo/billing/test/spec/-spec.ts").is_none());
    }

    #[test]
    fn test_test_dir_at_workspace_root_uses_workspace_name() {
        let located = located("/test/spec/foo-spec.ts").unwrap();
        assert_eq!(located.service.name, "repo");
    }

    #[test]
    fn test_non_file_scheme_is_ignored() {
        let url = Url::parse("untitled:/repo/billing/test/spec/a-spec.ts").unwrap();
        assert!(classify(&url, &workspace(), &Config::default()).is_none());

        let url = Url::parse("file:///repo/billing/test/spec/a-spec.ts").unwrap();
        assert!(classify(&url, &workspace(), &Config::default()).is_some());
    }

    #[test]
    fn test_relative_path_inside_workspace() {
        let located = located("/repo/billing/test/spec/a-spec.ts").unwrap();
        assert_eq!(located.file.relative_path(), PathBuf::from("billing/test/spec/a-spec.ts"));
    }
}
