//! Test declaration discovery.
//!
//! A file is parsed with the TypeScript grammar and walked depth-first for
//! calls such as `describe("name", () => { ... })`. Only direct statements of
//! the file and of each matched body are scanned, so the walk mirrors how
//! suites nest in source.
//!
//! ## Declaration shape
//!
//! - callee: a bare identifier from the kind's allow-list
//! - two arguments: `(name, body)`
//! - three arguments: `(name, options, body)`, the middle one is ignored
//! - `name` must be a string literal and `body` a function literal
//!
//! Anything else is skipped silently. Files being edited are expected to be
//! transiently invalid, so indexing never fails.

mod lines;
mod treesitter;

pub use lines::{LineIndex, Position};

use serde::Serialize;
use tree_sitter::{Node, Tree};

use crate::config::{KindConfig, KindsConfig};
use crate::kind::TestKind;
use treesitter::{is_function_literal, string_literal_value, TreeSitterParser};

/// A declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestNode {
    /// Declared name (the cooked string literal).
    pub name: String,
    /// Start of the body function literal.
    ///
    /// Leading whitespace and comments before the literal are excluded, so
    /// `describe("x", () => {})` points at the `(` of the arrow function.
    pub position: Position,
    /// Names of the enclosing declarations, outermost first.
    pub parents: Vec<String>,
}

impl TestNode {
    pub fn depth(&self) -> usize {
        self.parents.len()
    }
}

/// Extracts test declarations from source text.
pub struct SyntaxTreeIndexer {
    parser: TreeSitterParser,
    kinds: KindsConfig,
}

impl SyntaxTreeIndexer {
    pub fn new(kinds: KindsConfig) -> Self {
        Self {
            parser: TreeSitterParser::typescript(),
            kinds,
        }
    }

    pub fn kinds(&self) -> &KindsConfig {
        &self.kinds
    }

    /// Parse `text` for declarations recognized by `kind`.
    ///
    /// The returned file owns the syntax tree; iterate it with
    /// [`IndexedFile::declarations`].
    #[tracing::instrument(skip_all, fields(kind = %kind, source_len = text.len()))]
    pub fn index_file(&self, text: &str, kind: TestKind) -> IndexedFile {
        let tree = match self.parser.parse_tree(text) {
            Ok(tree) => {
                if tree.root_node().has_error() {
                    tracing::debug!("source has syntax errors, indexing what parses");
                }
                Some(tree)
            }
            Err(e) => {
                tracing::warn!("failed to parse test file: {}", e);
                None
            }
        };

        IndexedFile {
            source: text.to_string(),
            lines: LineIndex::new(text),
            kind: self.kinds.get(kind).clone(),
            tree,
        }
    }
}

/// A parsed file ready to be walked.
pub struct IndexedFile {
    source: String,
    lines: LineIndex,
    kind: KindConfig,
    tree: Option<Tree>,
}

impl IndexedFile {
    /// Lazy depth-first sequence of declarations in source order.
    ///
    /// Each call starts a fresh walk. Nesting depth is bounded by an explicit
    /// work-list rather than the call stack.
    pub fn declarations(&self) -> Declarations<'_> {
        let mut declarations = Declarations {
            file: self,
            pending: Vec::new(),
        };
        if let Some(tree) = &self.tree {
            declarations.push_scope(tree.root_node(), &[]);
        }
        declarations
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn is_declaration_call<'t>(&self, statement: &Node<'t>) -> Option<Node<'t>> {
        if statement.kind() != "expression_statement" {
            return None;
        }
        let call = statement.named_child(0)?;
        if call.kind() != "call_expression" {
            return None;
        }
        let callee = call.child_by_field_name("function")?;
        if callee.kind() != "identifier" {
            return None;
        }
        let name = TreeSitterParser::node_text(&callee, &self.source);
        self.kind.recognizes(name).then_some(call)
    }

    /// Split a matched call into its declared name and body literal.
    fn declaration<'t>(&self, call: &Node<'t>) -> Option<(String, Node<'t>)> {
        let arguments = call.child_by_field_name("arguments")?;
        if arguments.kind() != "arguments" {
            return None;
        }

        let args = TreeSitterParser::named_children(&arguments);
        let (name, body) = match args.as_slice() {
            [name, body] | [name, _, body] => (*name, *body),
            _ => return None,
        };
        if !is_function_literal(&body) {
            return None;
        }
        let name = string_literal_value(&name, &self.source)?;
        Some((name, body))
    }
}

/// Iterator returned by [`IndexedFile::declarations`].
pub struct Declarations<'a> {
    file: &'a IndexedFile,
    pending: Vec<(Node<'a>, Vec<String>)>,
}

impl<'a> Declarations<'a> {
    /// Queue the declaration calls among the direct statements of `scope`.
    fn push_scope(&mut self, scope: Node<'a>, parents: &[String]) {
        let calls: Vec<Node<'a>> = TreeSitterParser::named_children(&scope)
            .iter()
            .filter_map(|statement| self.file.is_declaration_call(statement))
            .collect();

        // reversed so the first declaration is popped first
        for call in calls.into_iter().rev() {
            self.pending.push((call, parents.to_vec()));
        }
    }
}

impl Iterator for Declarations<'_> {
    type Item = TestNode;

    fn next(&mut self) -> Option<TestNode> {
        while let Some((call, parents)) = self.pending.pop() {
            let Some((name, body)) = self.file.declaration(&call) else {
                continue;
            };

            let position = self.file.lines.position(&self.file.source, body.start_byte());

            if let Some(block) = body
                .child_by_field_name("body")
                .filter(|b| b.kind() == "statement_block")
            {
                let mut inner = parents.clone();
                inner.push(name.clone());
                self.push_scope(block, &inner);
            }

            return Some(TestNode { name, position, parents });
        }
        None
    }
}
