//! Symbol extraction
//!
//! Walks the top level of a parsed tree (plus class bodies and export
//! wrappers) and yields `SymbolPayload` records. Methods are fully
//! qualified through their enclosing classes, e.g. `User.greet`. Function
//! bodies are not descended into.

use intentgraph_store::{SymbolKind, SymbolPayload};
use tree_sitter::{Node, Tree};

use super::languages::{is_function_value, node_kinds};
use super::{collapse_ws, find_child_by_kind, node_span, node_text};

/// Extract all recognizable symbols from a parsed tree.
pub fn extract_symbols(tree: &Tree, source: &str) -> Vec<SymbolPayload> {
    let mut out = Vec::new();
    let mut class_stack = Vec::new();
    let root = tree.root_node();
    for i in 0..root.child_count() {
        if let Some(child) = root.child(i) {
            visit(&child, source, &mut class_stack, &mut out);
        }
    }
    out
}

fn visit(
    node: &Node<'_>,
    source: &str,
    class_stack: &mut Vec<String>,
    out: &mut Vec<SymbolPayload>,
) {
    match node.kind() {
        node_kinds::EXPORT_STATEMENT => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    visit(&child, source, class_stack, out);
                }
            }
        }
        node_kinds::CLASS_DECLARATION => visit_class(node, source, class_stack, out),
        node_kinds::FUNCTION_DECLARATION | node_kinds::GENERATOR_FUNCTION_DECLARATION => {
            if let Some(name) = field_text(node, "name", source) {
                out.push(SymbolPayload {
                    fq_name: qualify(class_stack, &name),
                    kind: SymbolKind::Function,
                    signature: params_signature(node, source),
                    range: node_span(node),
                });
            }
        }
        node_kinds::METHOD_DEFINITION => {
            if let Some(name) = field_text(node, "name", source) {
                out.push(SymbolPayload {
                    fq_name: qualify(class_stack, &name),
                    kind: SymbolKind::Method,
                    signature: params_signature(node, source),
                    range: node_span(node),
                });
            }
        }
        node_kinds::LEXICAL_DECLARATION | node_kinds::VARIABLE_DECLARATION => {
            let is_const = node
                .child(0)
                .map(|c| c.kind() == "const")
                .unwrap_or(false);
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    if child.kind() == node_kinds::VARIABLE_DECLARATOR {
                        visit_declarator(&child, source, class_stack, is_const, out);
                    }
                }
            }
        }
        _ => {}
    }
}

fn visit_class(
    node: &Node<'_>,
    source: &str,
    class_stack: &mut Vec<String>,
    out: &mut Vec<SymbolPayload>,
) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let body = node.child_by_field_name("body");

    // Header portion of the declaration, e.g. `class User extends Base`
    let header_end = body.map(|b| b.start_byte()).unwrap_or(node.end_byte());
    let header = source.get(node.start_byte()..header_end).unwrap_or("");
    out.push(SymbolPayload {
        fq_name: qualify(class_stack, &name),
        kind: SymbolKind::Class,
        signature: collapse_ws(header),
        range: node_span(node),
    });

    if let Some(body) = body {
        class_stack.push(name);
        for i in 0..body.child_count() {
            if let Some(member) = body.child(i) {
                visit(&member, source, class_stack, out);
            }
        }
        class_stack.pop();
    }
}

fn visit_declarator(
    node: &Node<'_>,
    source: &str,
    class_stack: &[String],
    is_const: bool,
    out: &mut Vec<SymbolPayload>,
) {
    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let value = node.child_by_field_name("value");

    if let Some(value) = value.filter(|v| is_function_value(v.kind())) {
        out.push(SymbolPayload {
            fq_name: qualify(class_stack, &name),
            kind: SymbolKind::Function,
            signature: params_signature(&value, source),
            range: node_span(node),
        });
        return;
    }

    out.push(SymbolPayload {
        fq_name: qualify(class_stack, &name),
        kind: if is_const {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        },
        signature: collapse_ws(node_text(node, source)),
        range: node_span(node),
    });
}

fn qualify(class_stack: &[String], name: &str) -> String {
    if class_stack.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", class_stack.join("."), name)
    }
}

fn field_text(node: &Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(&n, source).to_string())
}

/// Whitespace-collapsed parameter list, or the whole declarator text when a
/// parameter list is absent (single-identifier arrow functions).
fn params_signature(node: &Node<'_>, source: &str) -> String {
    let params = node
        .child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
        .or_else(|| find_child_by_kind(node, node_kinds::FORMAL_PARAMETERS));
    match params {
        Some(p) => collapse_ws(node_text(&p, source)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::parse;
    use crate::shared::Language;

    fn symbols_of(lang: Language, src: &str) -> Vec<SymbolPayload> {
        parse(lang, src.as_bytes()).unwrap().symbols
    }

    #[test]
    fn test_function_declaration() {
        let syms = symbols_of(Language::Js, "function login(u, t) { return u; }");
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].fq_name, "login");
        assert_eq!(syms[0].kind, SymbolKind::Function);
        assert_eq!(syms[0].signature, "(u, t)");
    }

    #[test]
    fn test_class_with_methods_is_qualified() {
        let src = "class User {\n  greet(name) { return name; }\n  leave() {}\n}";
        let syms = symbols_of(Language::Js, src);
        let names: Vec<&str> = syms.iter().map(|s| s.fq_name.as_str()).collect();
        assert_eq!(names, vec!["User", "User.greet", "User.leave"]);
        assert_eq!(syms[1].kind, SymbolKind::Method);
        assert_eq!(syms[1].signature, "(name)");
    }

    #[test]
    fn test_arrow_function_in_const() {
        let syms = symbols_of(Language::Ts, "const add = (a: number, b: number) => a + b;");
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].fq_name, "add");
        assert_eq!(syms[0].kind, SymbolKind::Function);
        assert!(syms[0].signature.contains("a: number"));
    }

    #[test]
    fn test_const_and_let() {
        let syms = symbols_of(Language::Js, "const LIMIT = 10;\nlet count = 0;\nvar old = 1;");
        assert_eq!(syms[0].kind, SymbolKind::Constant);
        assert_eq!(syms[0].fq_name, "LIMIT");
        assert_eq!(syms[1].kind, SymbolKind::Variable);
        assert_eq!(syms[2].kind, SymbolKind::Variable);
    }

    #[test]
    fn test_exported_symbols_are_seen() {
        let src = "export function api() {}\nexport const VERSION = \"1.0\";";
        let syms = symbols_of(Language::Js, src);
        let names: Vec<&str> = syms.iter().map(|s| s.fq_name.as_str()).collect();
        assert!(names.contains(&"api"));
        assert!(names.contains(&"VERSION"));
    }

    #[test]
    fn test_class_signature_is_header() {
        let syms = symbols_of(Language::Js, "class Admin extends User {\n}");
        assert_eq!(syms[0].signature, "class Admin extends User");
        assert_eq!(syms[0].kind, SymbolKind::Class);
    }

    #[test]
    fn test_nested_function_bodies_are_not_descended() {
        let src = "function outer() { function inner() {} }";
        let syms = symbols_of(Language::Js, src);
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].fq_name, "outer");
    }

    #[test]
    fn test_ranges_are_zero_based_rows() {
        let syms = symbols_of(Language::Js, "// banner\nfunction f() {}");
        assert_eq!(syms[0].range.start.row(), 1);
    }
}
