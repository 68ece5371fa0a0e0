//! Editor document events and workspace scanning.

use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::indexer::SyntaxTreeIndexer;
use crate::registry::{EntityKey, ReconcileSummary, Registry, RegistryError};
use crate::workspace::{classify, classify_path, Document, Located, Workspace};

/// Explorer errors.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Totals of a workspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub declarations: usize,
    /// Eligible files that could not be read.
    pub skipped: usize,
}

/// Keeps the registry in line with the documents the editor reports.
pub struct TestExplorer {
    config: Config,
    indexer: SyntaxTreeIndexer,
    registry: Registry,
    last_indexed: HashMap<Url, Instant>,
}

impl TestExplorer {
    pub fn new(config: Config) -> Self {
        Self {
            indexer: SyntaxTreeIndexer::new(config.kinds.clone()),
            config,
            registry: Registry::new(),
            last_indexed: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Index a newly opened document. Non-test documents are ignored.
    pub fn open_document(&mut self, doc: &Document) -> Result<Option<ReconcileSummary>, ExplorerError> {
        self.index_document(doc, Instant::now())
    }

    /// Re-index a changed document unless it was indexed within the debounce
    /// window before `now`.
    pub fn change_document(
        &mut self,
        doc: &Document,
        now: Instant,
    ) -> Result<Option<ReconcileSummary>, ExplorerError> {
        let window = self.config.discovery.debounce();
        if let Some(last) = self.last_indexed.get(&doc.location) {
            if now.saturating_duration_since(*last) < window {
                tracing::trace!(location = %doc.location, "change debounced");
                return Ok(None);
            }
        }
        self.index_document(doc, now)
    }

    /// Drop everything registered for a closed document.
    pub fn close_document(&mut self, location: &Url) -> usize {
        self.last_indexed.remove(location);
        match location.to_file_path() {
            Ok(path) => self.registry.remove_file(&EntityKey::file(path)),
            Err(()) => 0,
        }
    }

    fn index_document(&mut self, doc: &Document, now: Instant) -> Result<Option<ReconcileSummary>, ExplorerError> {
        let Some(located) = classify(&doc.location, &doc.workspace, &self.config) else {
            return Ok(None);
        };
        self.last_indexed.insert(doc.location.clone(), now);
        self.reconcile(&located, &doc.text).map(Some)
    }

    fn reconcile(&mut self, located: &Located, text: &str) -> Result<ReconcileSummary, ExplorerError> {
        let file = self.indexer.index_file(text, located.file.kind);
        let summary = self
            .registry
            .reconcile(&located.service, &located.file, file.declarations())?;
        Ok(summary)
    }

    /// Index every test file below the workspace root, honouring ignore files.
    #[tracing::instrument(skip_all, fields(root = %workspace.root.display()))]
    pub fn scan_workspace(&mut self, workspace: &Workspace) -> Result<ScanSummary, ExplorerError> {
        let mut summary = ScanSummary::default();
        let walker = WalkBuilder::new(&workspace.root)
            .hidden(true)
            .git_ignore(true)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(located) = classify_path(path, workspace, &self.config) else {
                continue;
            };
            let text = match read_source(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping test file: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };
            let result = self.reconcile(&located, &text)?;
            summary.files += 1;
            summary.declarations += result.added + result.updated;
        }

        tracing::info!(files = summary.files, declarations = summary.declarations, "workspace scanned");
        Ok(summary)
    }
}

fn read_source(path: &Path) -> Result<String, ExplorerError> {
    std::fs::read_to_string(path).map_err(|source| ExplorerError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn doc(text: &str) -> Document {
        Document::from_path(
            Path::new("/repo/billing/test/spec/a-spec.ts"),
            text,
            Workspace::from_root("/repo"),
        )
        .unwrap()
    }

    #[test]
    fn test_change_is_debounced_per_document() {
        let mut explorer = TestExplorer::new(Config::default());
        let start = Instant::now();

        let first = explorer.change_document(&doc(r#"it("a", () => {});"#), start).unwrap();
        assert_eq!(first.map(|s| s.added), Some(1));

        let soon = start + Duration::from_millis(300);
        let second = explorer.change_document(&doc(r#"it("b", () => {});"#), soon).unwrap();
        assert!(second.is_none());

        let later = start + Duration::from_millis(1000);
        let third = explorer.change_document(&doc(r#"it("b", () => {});"#), later).unwrap();
        assert_eq!(third.map(|s| (s.added, s.removed)), Some((1, 1)));
    }

    #[test]
    fn test_non_test_documents_are_ignored() {
        let mut explorer = TestExplorer::new(Config::default());
        let doc = Document::from_path(
            Path::new("/repo/billing/src/invoice.ts"),
            r#"it("a", () => {});"#,
            Workspace::from_root("/repo"),
        )
        .unwrap();
        assert!(explorer.open_document(&doc).unwrap().is_none());
        assert!(explorer.registry().is_empty());
    }
}
