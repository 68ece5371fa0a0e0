//! Hierarchical registry of discovered tests.
//!
//! The registry is the single owner of entity lifetime. It keeps one record
//! per [`EntityKey`] together with the parent link and child list, so lookups
//! by identity and tree traversal use the same structure.
//!
//! ## Shape
//!
//! ```text
//! Service  /billing-spec
//! └── File  file:///repo/billing/test/spec/invoice-spec.ts
//!     └── Function  .../invoice-spec.ts/totals
//!         └── Function  .../invoice-spec.ts/totals/rounds down
//! ```
//!
//! Every mutation is also appended to an edit journal that a host drains with
//! [`Registry::take_edits`] to mirror the tree in its own UI.

mod entity;
mod error;
mod key;

pub use entity::{Entity, Service, TestFile, TestFunction};
pub use error::RegistryError;
pub use key::EntityKey;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::executor::RunState;
use crate::indexer::{Position, TestNode};

/// A registered entity plus its place in the tree.
#[derive(Debug, Clone)]
pub struct Record {
    pub entity: Entity,
    /// `None` for services.
    pub parent: Option<EntityKey>,
    /// Sibling order index; for functions this is declaration order.
    pub order: usize,
    /// Last run state reported for this entity.
    pub state: Option<RunState>,
    children: Vec<EntityKey>,
}

impl Record {
    fn new(entity: Entity, parent: Option<EntityKey>, order: usize) -> Self {
        Self {
            entity,
            parent,
            order,
            state: None,
            children: Vec::new(),
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// A tree mutation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEdit {
    Create { key: EntityKey, label: String },
    /// `parent` is `None` for top-level (service) nodes.
    AddChild { parent: Option<EntityKey>, child: EntityKey },
    Delete { key: EntityKey },
    SetRange { key: EntityKey, position: Position },
}

/// Outcome of reconciling one file against a fresh parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Registry of services, files and declared tests.
#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<EntityKey, Record>,
    roots: Vec<EntityKey>,
    next_order: HashMap<PathBuf, usize>,
    edits: Vec<TreeEdit>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `service`, creating the service on first use.
    ///
    /// Idempotent: an already registered file is returned unchanged.
    pub fn register_file(&mut self, service: &Service, file: &TestFile) -> EntityKey {
        let file_key = file.key();
        if self.records.contains_key(&file_key) {
            return file_key;
        }

        let service_key = service.key();
        match self.records.get_mut(&service_key) {
            Some(record) => record.entity = Entity::Service(service.clone()),
            None => {
                let order = self.roots.len();
                self.records.insert(
                    service_key.clone(),
                    Record::new(Entity::Service(service.clone()), None, order),
                );
                self.roots.push(service_key.clone());
                self.edits.push(TreeEdit::Create {
                    key: service_key.clone(),
                    label: service.name.clone(),
                });
                self.edits.push(TreeEdit::AddChild {
                    parent: None,
                    child: service_key.clone(),
                });
                tracing::debug!(service = %service_key, "registered service");
            }
        }

        let order = self.records.get(&service_key).map(Record::child_count).unwrap_or_default();
        self.records.insert(
            file_key.clone(),
            Record::new(Entity::File(file.clone()), Some(service_key.clone()), order),
        );
        self.attach(&service_key, &file_key);
        self.edits.push(TreeEdit::Create {
            key: file_key.clone(),
            label: file_key.label(),
        });
        self.edits.push(TreeEdit::AddChild {
            parent: Some(service_key),
            child: file_key.clone(),
        });
        tracing::debug!(file = %file_key, "registered file");

        file_key
    }

    /// Register a declaration directly inside `parent`.
    ///
    /// A known identity is updated in place (name, position, order) and moved
    /// under `parent` if it hangs elsewhere, keeping its recorded run state.
    ///
    /// # Errors
    ///
    /// Fails when `parent` is not registered or cannot own declarations.
    pub fn register_node(&mut self, node: &TestNode, parent: &EntityKey) -> Result<EntityKey, RegistryError> {
        self.upsert_function(node, parent).map(|(key, _)| key)
    }

    fn upsert_function(&mut self, node: &TestNode, parent: &EntityKey) -> Result<(EntityKey, bool), RegistryError> {
        if !self.records.contains_key(parent) {
            return Err(RegistryError::MissingParent {
                parent: parent.to_string(),
                name: node.name.clone(),
            });
        }
        let key = parent.child(&node.name).ok_or_else(|| RegistryError::InvalidParent {
            parent: parent.to_string(),
            name: node.name.clone(),
        })?;

        let order = match key.file_path() {
            Some(path) => {
                let counter = self.next_order.entry(path.to_path_buf()).or_insert(0);
                *counter += 1;
                *counter - 1
            }
            None => 0,
        };
        let function = Entity::Function(TestFunction {
            name: node.name.clone(),
            position: node.position,
        });

        let Some(record) = self.records.get_mut(&key) else {
            self.records.insert(key.clone(), Record::new(function, Some(parent.clone()), order));
            self.attach(parent, &key);
            self.edits.push(TreeEdit::Create {
                key: key.clone(),
                label: node.name.clone(),
            });
            self.edits.push(TreeEdit::SetRange {
                key: key.clone(),
                position: node.position,
            });
            self.edits.push(TreeEdit::AddChild {
                parent: Some(parent.clone()),
                child: key.clone(),
            });
            return Ok((key, true));
        };

        let moved_range = record.entity.position() != Some(node.position);
        record.entity = function;
        record.order = order;
        let previous_parent = match &record.parent {
            Some(current) if current == parent => None,
            _ => record.parent.replace(parent.clone()),
        };

        if moved_range {
            self.edits.push(TreeEdit::SetRange {
                key: key.clone(),
                position: node.position,
            });
        }
        if let Some(previous) = previous_parent {
            self.detach(&previous, &key);
            self.attach(parent, &key);
            self.edits.push(TreeEdit::AddChild {
                parent: Some(parent.clone()),
                child: key.clone(),
            });
            tracing::debug!(key = %key, from = %previous, "re-parented declaration");
        }
        Ok((key, false))
    }

    /// Bring a file's subtree in line with a fresh parse.
    ///
    /// Registers the file (and service) if needed, upserts every node in
    /// order and removes declarations that no longer appear.
    #[tracing::instrument(skip_all, fields(file = %file.path.display()))]
    pub fn reconcile(
        &mut self,
        service: &Service,
        file: &TestFile,
        nodes: impl IntoIterator<Item = TestNode>,
    ) -> Result<ReconcileSummary, RegistryError> {
        let file_key = self.register_file(service, file);
        self.next_order.insert(file.path.clone(), 0);

        let mut summary = ReconcileSummary::default();
        let mut seen = HashSet::new();
        for node in nodes {
            let parent = file_key
                .descend(node.parents.iter().map(String::as_str))
                .ok_or_else(|| RegistryError::InvalidParent {
                    parent: file_key.to_string(),
                    name: node.name.clone(),
                })?;
            let (key, created) = self.upsert_function(&node, &parent)?;
            if created {
                summary.added += 1;
            } else {
                summary.updated += 1;
            }
            seen.insert(key);
        }

        let stale: Vec<EntityKey> = self
            .descendants(&file_key)
            .into_iter()
            .filter(|key| !seen.contains(key))
            .collect();
        for key in &stale {
            // a stale parent already took its stale children with it
            if self.records.contains_key(key) {
                summary.removed += self.remove_subtree(key);
            }
        }

        tracing::debug!(
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            "reconciled file"
        );
        Ok(summary)
    }

    /// Remove a file with all its declarations, and its service when that
    /// was the service's last file. Returns the number of removed entities.
    pub fn remove_file(&mut self, file_key: &EntityKey) -> usize {
        let service_key = match self.records.get(file_key) {
            Some(Record {
                entity: Entity::File(_),
                parent,
                ..
            }) => parent.clone(),
            _ => return 0,
        };

        let mut removed = self.remove_subtree(file_key);
        if let Some(path) = file_key.file_path() {
            self.next_order.remove(path);
        }

        if let Some(service_key) = service_key {
            let empty = self
                .records
                .get(&service_key)
                .map(|r| r.children.is_empty())
                .unwrap_or(false);
            if empty {
                self.records.remove(&service_key);
                self.roots.retain(|k| k != &service_key);
                self.edits.push(TreeEdit::Delete { key: service_key });
                removed += 1;
            }
        }

        tracing::debug!(file = %file_key, removed, "removed file");
        removed
    }

    /// Remove `key` and everything below it, children before parents.
    fn remove_subtree(&mut self, key: &EntityKey) -> usize {
        let mut doomed = vec![key.clone()];
        doomed.extend(self.descendants(key));

        if let Some(parent) = self.records.get(key).and_then(|r| r.parent.clone()) {
            self.detach(&parent, key);
        }

        let mut removed = 0;
        for key in doomed.into_iter().rev() {
            if self.records.remove(&key).is_some() {
                self.edits.push(TreeEdit::Delete { key });
                removed += 1;
            }
        }
        removed
    }

    fn attach(&mut self, parent: &EntityKey, child: &EntityKey) {
        if let Some(record) = self.records.get_mut(parent) {
            if !record.children.contains(child) {
                record.children.push(child.clone());
            }
        }
    }

    fn detach(&mut self, parent: &EntityKey, child: &EntityKey) {
        if let Some(record) = self.records.get_mut(parent) {
            record.children.retain(|k| k != child);
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn entity(&self, key: &EntityKey) -> Option<&Entity> {
        self.records.get(key).map(|r| &r.entity)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Services in registration order.
    pub fn roots(&self) -> &[EntityKey] {
        &self.roots
    }

    /// Direct children of `key`, in sibling order.
    pub fn children(&self, key: &EntityKey) -> Vec<&EntityKey> {
        let Some(record) = self.records.get(key) else {
            return Vec::new();
        };
        let mut children: Vec<&EntityKey> = record.children.iter().collect();
        children.sort_by_key(|k| self.records.get(*k).map(|r| r.order).unwrap_or(usize::MAX));
        children
    }

    /// Everything below `key` in pre-order, `key` excluded.
    pub fn descendants(&self, key: &EntityKey) -> Vec<EntityKey> {
        let mut out = Vec::new();
        let mut stack: Vec<&EntityKey> = self.children(key).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// The whole tree in pre-order with nesting depth.
    pub fn walk(&self) -> Vec<(usize, &EntityKey)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &EntityKey)> = self.roots.iter().rev().map(|k| (0, k)).collect();
        while let Some((depth, key)) = stack.pop() {
            out.push((depth, key));
            stack.extend(self.children(key).into_iter().rev().map(|k| (depth + 1, k)));
        }
        out
    }

    /// File a declaration belongs to, found by walking parent links.
    pub fn owning_file(&self, key: &EntityKey) -> Option<&TestFile> {
        let mut current = key;
        // parent links shorten the key, so depth + 1 steps always suffice
        for _ in 0..=key.depth() {
            let record = self.records.get(current)?;
            match &record.entity {
                Entity::File(file) => return Some(file),
                Entity::Function(_) => current = record.parent.as_ref()?,
                Entity::Service(_) => return None,
            }
        }
        None
    }

    /// Record the latest run state of an entity. Unknown keys are ignored.
    pub fn set_state(&mut self, key: &EntityKey, state: RunState) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.state = Some(state);
                true
            }
            None => false,
        }
    }

    /// Drain the pending tree edits.
    pub fn take_edits(&mut self) -> Vec<TreeEdit> {
        std::mem::take(&mut self.edits)
    }
}
