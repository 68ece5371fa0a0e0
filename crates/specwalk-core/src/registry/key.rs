//! Structured entity identities.
//!
//! A key is an ordered list of typed segments compared as a value, so a test
//! name containing `/` can never collide with a nested declaration. The
//! slash-joined form produced by `Display` is only used for presentation.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::kind::TestKind;

/// Identity of a registry entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    /// `/{name}-{kind}`
    Service { name: String, kind: TestKind },
    /// Canonical file location.
    File { path: PathBuf },
    /// File location followed by the declared names from the outermost suite
    /// down to the entity itself. Never empty.
    Function { file: PathBuf, names: Vec<String> },
}

impl EntityKey {
    pub fn service(name: impl Into<String>, kind: TestKind) -> Self {
        EntityKey::Service { name: name.into(), kind }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        EntityKey::File { path: path.into() }
    }

    /// Key of a declaration named `name` directly inside this entity.
    ///
    /// Services never own declarations, so they have no children keys.
    pub fn child(&self, name: &str) -> Option<EntityKey> {
        match self {
            EntityKey::Service { .. } => None,
            EntityKey::File { path } => Some(EntityKey::Function {
                file: path.clone(),
                names: vec![name.to_string()],
            }),
            EntityKey::Function { file, names } => {
                let mut names = names.clone();
                names.push(name.to_string());
                Some(EntityKey::Function { file: file.clone(), names })
            }
        }
    }

    /// Key reached by descending through `names` from this entity.
    pub fn descend<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Option<EntityKey> {
        let mut key = self.clone();
        for name in names {
            key = key.child(name)?;
        }
        Some(key)
    }

    /// Key of the enclosing declaration or file.
    ///
    /// Every step drops one name, so walking parents always ends at a file.
    pub fn parent(&self) -> Option<EntityKey> {
        match self {
            EntityKey::Service { .. } | EntityKey::File { .. } => None,
            EntityKey::Function { file, names } if names.len() == 1 => Some(EntityKey::file(file.clone())),
            EntityKey::Function { file, names } => Some(EntityKey::Function {
                file: file.clone(),
                names: names[..names.len() - 1].to_vec(),
            }),
        }
    }

    /// The file this key lives in, if any.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            EntityKey::Service { .. } => None,
            EntityKey::File { path } => Some(path),
            EntityKey::Function { file, .. } => Some(file),
        }
    }

    /// Short label: service name, file name or declared name.
    pub fn label(&self) -> String {
        match self {
            EntityKey::Service { name, .. } => name.clone(),
            EntityKey::File { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            EntityKey::Function { names, .. } => names.last().cloned().unwrap_or_default(),
        }
    }

    /// Nesting depth below the file (0 for services and files).
    pub fn depth(&self) -> usize {
        match self {
            EntityKey::Function { names, .. } => names.len(),
            _ => 0,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, EntityKey::Function { .. })
    }
}

fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Service { name, kind } => write!(f, "/{}-{}", name, kind),
            EntityKey::File { path } => f.write_str(&file_uri(path)),
            EntityKey::Function { file, names } => write!(f, "{}/{}", file_uri(file), names.join("/")),
        }
    }
}

impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
