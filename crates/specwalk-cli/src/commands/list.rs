use serde::Serialize;
use specwalk_core::registry::{Entity, EntityKey, Registry};
use specwalk_core::{Config, Position};
use std::path::Path;
use std::process::ExitCode;

use super::discover;

#[derive(Debug, Serialize)]
struct ListedNode {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ListedNode>,
}

fn listed(registry: &Registry, key: &EntityKey) -> Option<ListedNode> {
    let entity = registry.entity(key)?;
    let kind = match entity {
        Entity::Service(_) => "service",
        Entity::File(_) => "file",
        Entity::Function(_) => "function",
    };
    Some(ListedNode {
        id: key.to_string(),
        kind,
        label: entity.label(),
        position: entity.position(),
        children: registry
            .children(key)
            .into_iter()
            .filter_map(|child| listed(registry, child))
            .collect(),
    })
}

pub fn execute(config: Config, dir: &Path, json: bool) -> color_eyre::Result<ExitCode> {
    let (explorer, workspace) = discover(config, dir)?;
    let registry = explorer.registry();

    if json {
        let tree: Vec<ListedNode> = registry
            .roots()
            .iter()
            .filter_map(|key| listed(registry, key))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(ExitCode::SUCCESS);
    }

    if registry.is_empty() {
        println!("No tests found in {}", workspace.root.display());
        return Ok(ExitCode::SUCCESS);
    }

    for (depth, key) in registry.walk() {
        let indent = "  ".repeat(depth);
        match registry.entity(key) {
            Some(Entity::Function(function)) => println!(
                "{}{}  {}:{}",
                indent,
                function.name,
                function.position.line + 1,
                function.position.character + 1
            ),
            Some(Entity::File(file)) => println!("{}{}", indent, file.relative_path().display()),
            Some(Entity::Service(service)) => println!("{}{} ({})", indent, service.name, service.kind),
            None => {}
        }
    }
    Ok(ExitCode::SUCCESS)
}
