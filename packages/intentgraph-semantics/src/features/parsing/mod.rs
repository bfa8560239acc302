//! Language-aware parsing on top of tree-sitter
//!
//! Produces a navigable syntax tree plus extracted [`SymbolPayload`]
//! records. Grammar errors are not fatal: tree-sitter always returns a
//! best-effort tree and extraction keeps whatever it recognizes.

pub mod languages;
pub mod symbols;

use intentgraph_store::{Span, SymbolPayload};
use once_cell::sync::Lazy;
use tree_sitter::{Node, Tree};

use crate::error::{Result, SemanticError};
use crate::shared::Language;

static TYPESCRIPT: Lazy<tree_sitter::Language> =
    Lazy::new(tree_sitter_typescript::language_typescript);
static TSX: Lazy<tree_sitter::Language> = Lazy::new(tree_sitter_typescript::language_tsx);

/// A parsed source file: extracted symbols plus the navigable tree
pub struct ParsedFile {
    pub symbols: Vec<SymbolPayload>,
    pub tree: Tree,
    pub source: String,
}

impl ParsedFile {
    /// Every node of one of the given types, in document order.
    pub fn find_nodes_of_type<'t>(&'t self, kinds: &[&str]) -> Vec<Node<'t>> {
        find_descendants_of_kind(self.tree.root_node(), kinds)
    }

    pub fn node_content(&self, node: &Node<'_>) -> &str {
        node_text(node, &self.source)
    }
}

/// Parse bytes as one of the code languages. Non-code languages have no
/// syntax tree and are refused here; the change detector reads them with
/// flat structural readers instead.
pub fn parse(lang: Language, bytes: &[u8]) -> Result<ParsedFile> {
    if !lang.is_code() {
        return Err(SemanticError::parse(format!(
            "no syntax tree for '{}' input",
            lang.as_str()
        )));
    }
    let source = String::from_utf8_lossy(bytes).into_owned();

    let grammar: &tree_sitter::Language = match lang {
        Language::Ts | Language::Js => &TYPESCRIPT,
        Language::Tsx | Language::Jsx => &TSX,
        _ => unreachable!("is_code() filtered non-code languages"),
    };

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| SemanticError::parse(format!("grammar rejected: {}", e)))?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| SemanticError::parse("parser produced no tree"))?;

    let symbols = symbols::extract_symbols(&tree, &source);
    Ok(ParsedFile {
        symbols,
        tree,
        source,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Node traversal utilities
// ═══════════════════════════════════════════════════════════════════════════

/// Find all descendants matching one of `kinds`, in document order.
pub fn find_descendants_of_kind<'t>(root: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut result = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        if kinds.contains(&current.kind()) {
            result.push(current);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    result
}

/// Find a direct child node by kind
pub fn find_child_by_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

/// Extract text content from a node
pub fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Convert a tree-sitter node to a 0-based (row, col) span
pub fn node_span(node: &Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        start.row as u32,
        start.column as u32,
        end.row as u32,
        end.column as u32,
    )
}

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::languages::node_kinds;
    use super::*;

    #[test]
    fn test_parse_js_function() {
        let parsed = parse(Language::Js, b"function login(u){return u;}").unwrap();
        let fns = parsed.find_nodes_of_type(&[node_kinds::FUNCTION_DECLARATION]);
        assert_eq!(fns.len(), 1);
        assert_eq!(parsed.node_content(&fns[0]), "function login(u){return u;}");
    }

    #[test]
    fn test_parse_tsx() {
        let src = b"const App = () => <div>hi</div>;";
        let parsed = parse(Language::Jsx, src).unwrap();
        assert!(!parsed
            .find_nodes_of_type(&[node_kinds::ARROW_FUNCTION])
            .is_empty());
    }

    #[test]
    fn test_invalid_syntax_still_yields_tree() {
        let parsed = parse(Language::Js, b"function ( {{{").unwrap();
        assert!(parsed.tree.root_node().has_error());
    }

    #[test]
    fn test_non_code_language_refused() {
        assert!(parse(Language::Json, b"{}").is_err());
    }

    #[test]
    fn test_node_span_is_zero_based() {
        let parsed = parse(Language::Js, b"let x = 1;\nfunction f() {}").unwrap();
        let fns = parsed.find_nodes_of_type(&[node_kinds::FUNCTION_DECLARATION]);
        let span = node_span(&fns[0]);
        assert_eq!(span.start.row(), 1);
        assert_eq!(span.start.col(), 0);
    }

    #[test]
    fn test_document_order() {
        let parsed = parse(Language::Js, b"let a = 1;\nlet b = 2;\nlet c = 3;").unwrap();
        let nums = parsed.find_nodes_of_type(&[node_kinds::NUMBER]);
        let texts: Vec<&str> = nums.iter().map(|n| parsed.node_content(n)).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  (u,\n   t)  "), "(u, t)");
        assert_eq!(collapse_ws("a b"), "a b");
    }
}
