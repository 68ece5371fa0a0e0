//! Command implementations.

pub mod bump;
pub mod list;
pub mod run;

use color_eyre::eyre::WrapErr;
use specwalk_core::{Config, EntityKey, TestExplorer, Workspace};
use std::path::Path;

/// Index every test file of the workspace at `dir`.
pub fn discover(config: Config, dir: &Path) -> color_eyre::Result<(TestExplorer, Workspace)> {
    let root = dir
        .canonicalize()
        .wrap_err_with(|| format!("workspace not found: {}", dir.display()))?;
    let workspace = Workspace::from_root(root);

    let mut explorer = TestExplorer::new(config);
    explorer.scan_workspace(&workspace)?;
    Ok((explorer, workspace))
}

/// Human-readable name of an entity for terminal output.
pub fn describe(key: &EntityKey, workspace: &Workspace) -> String {
    match key {
        EntityKey::Service { name, kind } => format!("{} ({})", name, kind),
        EntityKey::File { path } => relative(path, workspace),
        EntityKey::Function { file, names } => {
            format!("{} > {}", relative(file, workspace), names.join(" > "))
        }
    }
}

fn relative(path: &Path, workspace: &Workspace) -> String {
    path.strip_prefix(&workspace.root)
        .unwrap_or(path)
        .display()
        .to_string()
}
