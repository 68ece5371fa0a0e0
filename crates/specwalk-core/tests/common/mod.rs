#![allow(dead_code)]

use std::path::PathBuf;

use specwalk_core::{Config, EntityKey, TestExplorer, TestKind, Workspace};
use tempfile::TempDir;

pub const NESTED_SPEC: &str = "describe(\"outer\", () => {\n    it(\"works\", () => {});\n});\n";

/// A scanned scratch workspace whose test command is a shell script.
pub struct Fixture {
    pub dir: TempDir,
    pub root: PathBuf,
    pub config: Config,
    pub explorer: TestExplorer,
}

impl Fixture {
    pub fn service(&self) -> EntityKey {
        EntityKey::service("billing", TestKind::Spec)
    }

    pub fn file(&self) -> EntityKey {
        EntityKey::file(self.root.join("billing/test/spec/foo-spec.ts"))
    }

    pub fn function(&self) -> EntityKey {
        self.file().descend(["outer", "works"]).unwrap()
    }
}

/// Workspace `repo` with one spec file and `run.sh` as the command of every kind.
pub fn fixture(script: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repo");
    std::fs::create_dir_all(root.join("billing/test/spec")).unwrap();
    std::fs::write(root.join("billing/test/spec/foo-spec.ts"), NESTED_SPEC).unwrap();
    std::fs::write(root.join("run.sh"), script).unwrap();

    let mut config = Config::default();
    config.runner.program = "sh".to_string();
    config.runner.poll_interval_ms = 20;
    for kind in TestKind::ALL {
        config.kinds.get_mut(kind).command = "run.sh".to_string();
    }

    let mut explorer = TestExplorer::new(config.clone());
    explorer.scan_workspace(&Workspace::from_root(&root)).unwrap();

    Fixture {
        dir,
        root,
        config,
        explorer,
    }
}
