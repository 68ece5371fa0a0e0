//! Registry entities: services, files and declared test functions.

use serde::Serialize;
use std::path::PathBuf;

use super::key::EntityKey;
use crate::indexer::Position;
use crate::kind::TestKind;
use crate::workspace::Workspace;

/// A discoverable test-related object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Service(Service),
    File(TestFile),
    Function(TestFunction),
}

impl Entity {
    /// Human-readable name shown in trees.
    pub fn label(&self) -> String {
        match self {
            Entity::Service(service) => service.name.clone(),
            Entity::File(file) => file.key().label(),
            Entity::Function(function) => function.name.clone(),
        }
    }

    /// Declaration position, for functions only.
    pub fn position(&self) -> Option<Position> {
        match self {
            Entity::Function(function) => Some(function.position),
            Entity::Service(_) | Entity::File(_) => None,
        }
    }
}

/// Grouping of all files of one kind below a component's test directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub name: String,
    pub kind: TestKind,
    /// `<component>/<test_dir>/<kind>` directory.
    pub root: PathBuf,
    pub workspace: Workspace,
}

impl Service {
    pub fn key(&self) -> EntityKey {
        EntityKey::service(self.name.clone(), self.kind)
    }
}

/// One source file containing declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestFile {
    pub path: PathBuf,
    pub kind: TestKind,
    pub workspace: Workspace,
}

impl TestFile {
    pub fn key(&self) -> EntityKey {
        EntityKey::file(self.path.clone())
    }

    /// Path relative to the workspace root, or the absolute path when the
    /// file lives outside it.
    pub fn relative_path(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.workspace.root)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| self.path.clone())
    }
}

/// A test or suite declaration discovered inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestFunction {
    pub name: String,
    pub position: Position,
}
