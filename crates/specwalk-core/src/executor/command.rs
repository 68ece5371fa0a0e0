//! Command derivation for runnable entities.

use std::path::{Path, PathBuf};

use super::ExecutorError;
use crate::config::Config;
use crate::kind::TestKind;
use crate::registry::{Entity, EntityKey, Registry, Service, TestFile};

/// What a run targets, resolved from the registry.
#[derive(Debug, Clone, Copy)]
pub enum RunTarget<'r> {
    Service(&'r Service),
    File(&'r TestFile),
    Function { file: &'r TestFile, name: &'r str },
}

impl<'r> RunTarget<'r> {
    pub fn resolve(registry: &'r Registry, key: &EntityKey) -> Result<Self, ExecutorError> {
        let entity = registry
            .entity(key)
            .ok_or_else(|| ExecutorError::UnknownEntity(key.to_string()))?;
        match entity {
            Entity::Service(service) => Ok(RunTarget::Service(service)),
            Entity::File(file) => Ok(RunTarget::File(file)),
            Entity::Function(function) => {
                let file = registry
                    .owning_file(key)
                    .ok_or_else(|| ExecutorError::NoOwningFile(key.to_string()))?;
                Ok(RunTarget::Function {
                    file,
                    name: &function.name,
                })
            }
        }
    }

    pub fn kind(&self) -> TestKind {
        match self {
            RunTarget::Service(service) => service.kind,
            RunTarget::File(file) | RunTarget::Function { file, .. } => file.kind,
        }
    }

    fn workspace_root(&self) -> &'r Path {
        match *self {
            RunTarget::Service(service) => &service.workspace.root,
            RunTarget::File(file) | RunTarget::Function { file, .. } => &file.workspace.root,
        }
    }
}

/// A fully derived process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl CommandPlan {
    /// Derive the invocation for `target`.
    ///
    /// - service: `<program> <command> <color> <service root>`
    /// - file: `<program> <command> <color> <relative file path>`
    /// - function: `<program> <command> <color> <filter> <name> <relative file path>`
    pub fn for_target(target: &RunTarget<'_>, config: &Config) -> Self {
        let runner = &config.runner;
        let mut args = vec![
            config.kinds.get(target.kind()).command.clone(),
            runner.color_flag.clone(),
        ];

        match target {
            RunTarget::Service(service) => args.push(service.root.display().to_string()),
            RunTarget::File(file) => args.push(file.relative_path().display().to_string()),
            RunTarget::Function { file, name } => {
                args.push(runner.filter_flag.clone());
                args.push(name.to_string());
                args.push(file.relative_path().display().to_string());
            }
        }

        Self {
            program: runner.program.clone(),
            args,
            cwd: target.workspace_root().to_path_buf(),
            env: vec![(runner.color_env.clone(), "1".to_string())],
        }
    }

    /// Shell-style rendering for display and copy-paste.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).current_dir(&self.cwd);
        for (name, value) in &self.env {
            command.env(name, value);
        }
        command
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{Position, TestNode};
    use crate::workspace::{classify_path, Workspace};

    fn registry() -> (Registry, EntityKey) {
        let config = Config::default();
        let workspace = Workspace::from_root("/repo");
        let located = classify_path(
            Path::new("/repo/billing/test/ecomp/flows/checkout-comp.ts"),
            &workspace,
            &config,
        )
        .unwrap();

        let mut registry = Registry::new();
        let nodes = vec![
            TestNode {
                name: "checkout".to_string(),
                position: Position::new(0, 20),
                parents: vec![],
            },
            TestNode {
                name: "pays in full".to_string(),
                position: Position::new(1, 20),
                parents: vec!["checkout".to_string()],
            },
        ];
        registry.reconcile(&located.service, &located.file, nodes).unwrap();
        (registry, located.file.key())
    }

    fn plan(registry: &Registry, key: &EntityKey) -> CommandPlan {
        let target = RunTarget::resolve(registry, key).unwrap();
        CommandPlan::for_target(&target, &Config::default())
    }

    #[test]
    fn test_service_plan_uses_root() {
        let (registry, _) = registry();
        let plan = plan(&registry, &EntityKey::service("billing", TestKind::Ecomp));
        assert_eq!(plan.program, "yarn");
        assert_eq!(plan.args, vec!["etest", "--color", "/repo/billing/test/ecomp"]);
        assert_eq!(plan.cwd, PathBuf::from("/repo"));
        assert_eq!(plan.env, vec![("FORCE_COLOR".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_file_plan_is_workspace_relative() {
        let (registry, file) = registry();
        let plan = plan(&registry, &file);
        assert_eq!(plan.args, vec!["etest", "--color", "billing/test/ecomp/flows/checkout-comp.ts"]);
    }

    #[test]
    fn test_function_plan_filters_by_name() {
        let (registry, file) = registry();
        let key = file.descend(["checkout", "pays in full"]).unwrap();
        let plan = plan(&registry, &key);
        assert_eq!(
            plan.args,
            vec!["etest", "--color", "-t", "pays in full", "billing/test/ecomp/flows/checkout-comp.ts"]
        );
        assert_eq!(
            plan.command_line(),
            "yarn etest --color -t 'pays in full' billing/test/ecomp/flows/checkout-comp.ts"
        );
    }

    #[test]
    fn test_unknown_entity() {
        let (registry, file) = registry();
        let key = file.child("missing").unwrap();
        assert!(matches!(
            RunTarget::resolve(&registry, &key),
            Err(ExecutorError::UnknownEntity(_))
        ));
    }
}
