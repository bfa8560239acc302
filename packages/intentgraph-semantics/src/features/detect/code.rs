//! Code change detectors (ts/tsx/js/jsx)
//!
//! Four passes over the two parsed sides, in a fixed order:
//!
//! 1. FunctionChanges — function-bearing constructs keyed by name; names
//!    only present on one side emit FUNCTION_ADDED / FUNCTION_REMOVED.
//! 2. ConditionChanges — condition nodes paired positionally (start rows
//!    within ±2); a changed operator from the fixed vocabulary or a changed
//!    set of numeric literal texts emits CONDITION_CHANGED.
//! 3. ConstantUpdates — number/string literals paired within ±2 rows and
//!    ±10 columns; differing text emits CONSTANT_UPDATED.
//! 4. APISurfaceChanges — same-name functions whose parameter list
//!    substring differs, or a changed set of exported names, emit
//!    API_SURFACE_CHANGED.
//!
//! Pairing is first-fit in (before order, after order) so ties reproduce.

use std::collections::BTreeSet;

use intentgraph_store::{Evidence, Span};
use tree_sitter::Node;

use crate::error::Result;
use crate::features::parsing::languages::{
    is_condition_operator, is_function_value, node_kinds, CONDITION_NODE_KINDS,
    LITERAL_NODE_KINDS,
};
use crate::features::parsing::{
    find_descendants_of_kind, node_span, node_text, parse, ParsedFile,
};
use crate::shared::Language;

use super::{overlapping_symbols, Category, FileSymbols, Finding};

pub fn detect(
    lang: Language,
    before: &[u8],
    after: &[u8],
    symbols: &FileSymbols,
) -> Result<Vec<Finding>> {
    let before = parse(lang, before)?;
    let after = parse(lang, after)?;

    let before_fns = function_table(&before);
    let after_fns = function_table(&after);

    let mut findings = Vec::new();
    function_changes(&before_fns, &after_fns, symbols, &mut findings);
    condition_changes(&before, &after, symbols, &mut findings);
    constant_updates(&before, &after, symbols, &mut findings);
    api_surface_changes(&before, &after, &before_fns, &after_fns, symbols, &mut findings);
    Ok(findings)
}

// ═══════════════════════════════════════════════════════════════════════════
// Function enumeration
// ═══════════════════════════════════════════════════════════════════════════

struct FnEntry {
    name: String,
    /// Raw parameter list substring (not whitespace-collapsed)
    params: String,
    range: Span,
}

/// Enumerate function-bearing constructs keyed by name, in document order.
/// The first occurrence of a name wins.
fn function_table(parsed: &ParsedFile) -> Vec<FnEntry> {
    let mut entries: Vec<FnEntry> = Vec::new();
    let candidates = parsed.find_nodes_of_type(&[
        node_kinds::FUNCTION_DECLARATION,
        node_kinds::GENERATOR_FUNCTION_DECLARATION,
        node_kinds::METHOD_DEFINITION,
        node_kinds::VARIABLE_DECLARATOR,
    ]);
    for node in candidates {
        let Some(entry) = fn_entry(&node, &parsed.source) else {
            continue;
        };
        if !entries.iter().any(|e| e.name == entry.name) {
            entries.push(entry);
        }
    }
    entries
}

fn fn_entry(node: &Node<'_>, source: &str) -> Option<FnEntry> {
    let name = node_text(&node.child_by_field_name("name")?, source).to_string();
    match node.kind() {
        node_kinds::VARIABLE_DECLARATOR => {
            // Only declarators holding a function value count
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value.kind()) {
                return None;
            }
            Some(FnEntry {
                name,
                params: raw_params(&value, source),
                range: node_span(node),
            })
        }
        _ => Some(FnEntry {
            name,
            params: raw_params(node, source),
            range: node_span(node),
        }),
    }
}

fn raw_params(node: &Node<'_>, source: &str) -> String {
    node.child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
        .map(|p| node_text(&p, source).to_string())
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════
// Detectors
// ═══════════════════════════════════════════════════════════════════════════

fn function_changes(
    before: &[FnEntry],
    after: &[FnEntry],
    symbols: &FileSymbols,
    out: &mut Vec<Finding>,
) {
    for entry in after {
        if !before.iter().any(|e| e.name == entry.name) {
            out.push(named_finding(Category::FunctionAdded, entry, symbols));
        }
    }
    for entry in before {
        if !after.iter().any(|e| e.name == entry.name) {
            out.push(named_finding(Category::FunctionRemoved, entry, symbols));
        }
    }
}

fn named_finding(category: Category, entry: &FnEntry, symbols: &FileSymbols) -> Finding {
    let mut ids = vec![format!("name:{}", entry.name)];
    ids.extend(overlapping_symbols(&entry.range, symbols));
    Finding::new(
        category,
        Evidence {
            file_ranges: vec![entry.range],
            symbols: ids,
        },
    )
}

fn condition_changes(
    before: &ParsedFile,
    after: &ParsedFile,
    symbols: &FileSymbols,
    out: &mut Vec<Finding>,
) {
    let before_nodes = before.find_nodes_of_type(CONDITION_NODE_KINDS);
    let after_nodes = after.find_nodes_of_type(CONDITION_NODE_KINDS);
    let mut taken = vec![false; after_nodes.len()];

    for b in &before_nodes {
        let b_row = b.start_position().row as i64;
        let paired = after_nodes.iter().enumerate().find(|(i, a)| {
            !taken[*i] && (a.start_position().row as i64 - b_row).abs() <= 2
        });
        let Some((i, a)) = paired else {
            continue;
        };
        taken[i] = true;

        let b_op = operator_text(b, &before.source);
        let a_op = operator_text(a, &after.source);
        let operator_changed = b_op != a_op
            && (is_condition_operator(&b_op) || is_condition_operator(&a_op));
        let literals_changed =
            number_texts(b, &before.source) != number_texts(a, &after.source);

        if operator_changed || literals_changed {
            let range = node_span(a);
            out.push(Finding::new(
                Category::ConditionChanged,
                Evidence {
                    file_ranges: vec![range],
                    symbols: overlapping_symbols(&range, symbols),
                },
            ));
        }
    }
}

fn operator_text(node: &Node<'_>, source: &str) -> String {
    node.child_by_field_name("operator")
        .map(|op| node_text(&op, source).to_string())
        .unwrap_or_default()
}

fn number_texts(node: &Node<'_>, source: &str) -> BTreeSet<String> {
    find_descendants_of_kind(*node, &[node_kinds::NUMBER])
        .iter()
        .map(|n| node_text(n, source).to_string())
        .collect()
}

fn constant_updates(
    before: &ParsedFile,
    after: &ParsedFile,
    symbols: &FileSymbols,
    out: &mut Vec<Finding>,
) {
    let before_lits = before.find_nodes_of_type(LITERAL_NODE_KINDS);
    let after_lits = after.find_nodes_of_type(LITERAL_NODE_KINDS);
    let mut taken = vec![false; after_lits.len()];

    for b in &before_lits {
        let b_pos = b.start_position();
        let paired = after_lits.iter().enumerate().find(|(i, a)| {
            if taken[*i] || a.kind() != b.kind() {
                return false;
            }
            let a_pos = a.start_position();
            (a_pos.row as i64 - b_pos.row as i64).abs() <= 2
                && (a_pos.column as i64 - b_pos.column as i64).abs() <= 10
        });
        let Some((i, a)) = paired else {
            continue;
        };
        taken[i] = true;

        if node_text(b, &before.source) != node_text(a, &after.source) {
            let range = node_span(a);
            out.push(Finding::new(
                Category::ConstantUpdated,
                Evidence {
                    file_ranges: vec![range],
                    symbols: overlapping_symbols(&range, symbols),
                },
            ));
        }
    }
}

fn api_surface_changes(
    before: &ParsedFile,
    after: &ParsedFile,
    before_fns: &[FnEntry],
    after_fns: &[FnEntry],
    symbols: &FileSymbols,
    out: &mut Vec<Finding>,
) {
    for b in before_fns {
        let Some(a) = after_fns.iter().find(|a| a.name == b.name) else {
            continue;
        };
        if a.params != b.params {
            out.push(Finding::new(
                Category::ApiSurfaceChanged,
                Evidence {
                    file_ranges: vec![a.range],
                    symbols: overlapping_symbols(&a.range, symbols),
                },
            ));
        }
    }

    let before_exports = export_names(before);
    let after_exports = export_names(after);
    if before_exports != after_exports {
        let export_stmt = after
            .find_nodes_of_type(&[node_kinds::EXPORT_STATEMENT])
            .into_iter()
            .next()
            .map(|n| node_span(&n))
            .or_else(|| {
                before
                    .find_nodes_of_type(&[node_kinds::EXPORT_STATEMENT])
                    .into_iter()
                    .next()
                    .map(|n| node_span(&n))
            });
        let file_ranges = export_stmt.map(|s| vec![s]).unwrap_or_default();
        let ids = file_ranges
            .first()
            .map(|r| overlapping_symbols(r, symbols))
            .unwrap_or_default();
        out.push(Finding::new(
            Category::ApiSurfaceChanged,
            Evidence {
                file_ranges,
                symbols: ids,
            },
        ));
    }
}

/// The set of names a file exports, across all export statements.
fn export_names(parsed: &ParsedFile) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in parsed.find_nodes_of_type(&[node_kinds::EXPORT_STATEMENT]) {
        // `export function f…` / `export const a = …` / `export class C…`
        if let Some(decl) = stmt.child_by_field_name("declaration") {
            if let Some(name) = decl.child_by_field_name("name") {
                names.insert(node_text(&name, &parsed.source).to_string());
            }
            for declarator in
                find_descendants_of_kind(decl, &[node_kinds::VARIABLE_DECLARATOR])
            {
                if let Some(name) = declarator.child_by_field_name("name") {
                    names.insert(node_text(&name, &parsed.source).to_string());
                }
            }
        }
        // `export { a, b as c }`
        for spec in find_descendants_of_kind(stmt, &[node_kinds::EXPORT_SPECIFIER]) {
            let exported = spec
                .child_by_field_name("alias")
                .or_else(|| spec.child_by_field_name("name"));
            if let Some(exported) = exported {
                names.insert(node_text(&exported, &parsed.source).to_string());
            }
        }
    }
    names
}
