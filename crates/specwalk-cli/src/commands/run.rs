use specwalk_core::registry::{Entity, EntityKey, Registry};
use specwalk_core::{cancel_pair, Config, RunCoordinator, RunLog, RunReporter, Workspace};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::discover;
use crate::reporter::ConsoleReporter;

pub struct RunOptions {
    pub filter: Option<String>,
    pub print: bool,
    pub paths: Vec<PathBuf>,
}

pub async fn execute(config: Config, dir: &Path, options: RunOptions) -> color_eyre::Result<ExitCode> {
    let (explorer, workspace) = discover(config.clone(), dir)?;
    let registry = explorer.registry();

    let paths: Vec<PathBuf> = options
        .paths
        .iter()
        .map(|p| absolute(p, &workspace))
        .collect();
    let keys = select(registry, options.filter.as_deref(), &paths);
    if keys.is_empty() {
        println!("No tests selected");
        return Ok(ExitCode::SUCCESS);
    }

    let log = Arc::new(RunLog::new());
    let reporter: Arc<dyn RunReporter> = if options.print {
        Arc::clone(&log) as Arc<dyn RunReporter>
    } else {
        Arc::new(ConsoleReporter::new(Arc::clone(&log), workspace.clone(), keys.len()))
    };
    let coordinator = RunCoordinator::new(config, reporter)?;

    if options.print {
        for key in &keys {
            let plan = coordinator.executor().plan(registry, key)?;
            println!("{}", plan.command_line());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (source, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            source.cancel();
        }
    });

    let outcome = coordinator.run_batch(registry, &keys, &token).await;
    let summary = log.summary();
    println!(
        "{} passed, {} errored, {} skipped{}",
        summary.passed,
        summary.errored,
        summary.skipped,
        if outcome.cancelled { " (cancelled)" } else { "" }
    );

    if summary.errored > 0 || outcome.cancelled {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn absolute(path: &Path, workspace: &Workspace) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.root.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

/// Pick what to run.
///
/// - `filter`: every declaration whose name contains the text
/// - `paths`: whole services living under a path, otherwise the files under it
/// - neither: every service
fn select(registry: &Registry, filter: Option<&str>, paths: &[PathBuf]) -> Vec<EntityKey> {
    let in_scope = |path: &Path| paths.is_empty() || paths.iter().any(|p| path.starts_with(p));

    if let Some(text) = filter {
        return registry
            .walk()
            .into_iter()
            .filter_map(|(_, key)| match (key, registry.entity(key)) {
                (EntityKey::Function { file, .. }, Some(Entity::Function(function)))
                    if function.name.contains(text) && in_scope(file.as_path()) =>
                {
                    Some(key.clone())
                }
                _ => None,
            })
            .collect();
    }

    let mut keys = Vec::new();
    for service_key in registry.roots() {
        let Some(Entity::Service(service)) = registry.entity(service_key) else {
            continue;
        };
        if in_scope(service.root.as_path()) {
            keys.push(service_key.clone());
            continue;
        }
        keys.extend(
            registry
                .children(service_key)
                .into_iter()
                .filter(|file| file.file_path().map(in_scope).unwrap_or(false))
                .cloned(),
        );
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use specwalk_core::{TestExplorer, TestKind};
    use tempfile::TempDir;

    const SPEC: &str = "describe(\"invoice\", () => {\n  it(\"totals\", () => {});\n  it(\"rounds\", () => {});\n});\n";

    fn scanned() -> (TempDir, TestExplorer, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        for (rel, body) in [
            ("billing/test/spec/invoice-spec.ts", SPEC),
            ("billing/test/spec/tax-spec.ts", "it(\"vat totals\", () => {});\n"),
            ("billing/test/comp/flow-comp.ts", "ctest(\"flow\", () => {});\n"),
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        let root = root.canonicalize().unwrap();
        let mut explorer = TestExplorer::new(Config::default());
        explorer.scan_workspace(&Workspace::from_root(&root)).unwrap();
        (dir, explorer, root)
    }

    #[test]
    fn test_defaults_to_every_service() {
        let (_dir, explorer, _root) = scanned();
        let keys = select(explorer.registry(), None, &[]);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&EntityKey::service("billing", TestKind::Comp)));
    }

    #[test]
    fn test_paths_select_services_or_files() {
        let (_dir, explorer, root) = scanned();

        let keys = select(explorer.registry(), None, &[root.join("billing/test/spec")]);
        assert_eq!(keys, vec![EntityKey::service("billing", TestKind::Spec)]);

        let file = root.join("billing/test/spec/tax-spec.ts");
        let keys = select(explorer.registry(), None, &[file.clone()]);
        assert_eq!(keys, vec![EntityKey::file(file)]);
    }

    #[test]
    fn test_filter_selects_declarations() {
        let (_dir, explorer, _root) = scanned();
        let keys = select(explorer.registry(), Some("totals"), &[]);
        let mut labels: Vec<String> = keys.iter().map(|k| k.label()).collect();
        labels.sort();
        assert_eq!(labels, vec!["totals", "vat totals"]);
    }
}
