//! Tree-sitter helpers for the TypeScript grammar.

use tree_sitter::{Language, Node, Parser as TSParser, Tree};

/// Thin wrapper holding the grammar every test file is parsed with.
pub struct TreeSitterParser {
    language: Language,
}

impl TreeSitterParser {
    /// Parser for the TypeScript grammar.
    pub fn typescript() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }

    /// Parse source code into a tree-sitter tree.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| format!("Failed to set language: {}", e))?;

        parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    /// Named children, skipping comments.
    pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        let children = node
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        children
    }
}

/// Whether `node` is a function literal usable as a test body.
pub fn is_function_literal(node: &Node) -> bool {
    matches!(node.kind(), "arrow_function" | "function_expression" | "function")
}

/// Cooked value of a plain string literal (`'...'` or `"..."`).
///
/// Returns `None` for anything else, template strings included.
pub fn string_literal_value(node: &Node, content: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }

    let mut value = String::new();
    for part in TreeSitterParser::named_children(node) {
        let text = TreeSitterParser::node_text(&part, content);
        match part.kind() {
            "string_fragment" => value.push_str(text),
            "escape_sequence" => unescape_into(text, &mut value),
            _ => {}
        }
    }
    Some(value)
}

fn unescape_into(sequence: &str, out: &mut String) {
    let body = sequence.strip_prefix('\\').unwrap_or(sequence);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return;
    };

    match first {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        'v' => out.push('\u{b}'),
        '0' if body.len() == 1 => out.push('\0'),
        // line continuation
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => {}
        'x' | 'u' => {
            let hex = chars.as_str().trim_start_matches('{').trim_end_matches('}');
            match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                Some(c) => out.push(c),
                None => out.push_str(body),
            }
        }
        _ => out.push_str(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_string(source: &str) -> Option<String> {
        let parser = TreeSitterParser::typescript();
        let tree = parser.parse_tree(source).unwrap();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "string" {
                return string_literal_value(&node, source);
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }

    #[test]
    fn test_plain_strings() {
        assert_eq!(first_string(r#"f("hello world");"#).as_deref(), Some("hello world"));
        assert_eq!(first_string("f('single');").as_deref(), Some("single"));
        assert_eq!(first_string("f('');").as_deref(), Some(""));
    }

    #[test]
    fn test_escapes_are_cooked() {
        assert_eq!(first_string(r#"f("a\"b");"#).as_deref(), Some("a\"b"));
        assert_eq!(first_string(r#"f('it\'s');"#).as_deref(), Some("it's"));
        assert_eq!(first_string(r#"f("A\x42");"#).as_deref(), Some("AB"));
    }
}
