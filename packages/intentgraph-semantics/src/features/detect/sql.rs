//! SQL schema change detector
//!
//! Extracts `CREATE TABLE` blocks with a paren-balanced scan (column types
//! like `VARCHAR(100)` nest parentheses), collects column definitions, and
//! compares the before/after table sets. Markers land in evidence as
//! `table:<name>` / `column:<table>.<name>` entries.
//!
//! This is a structural comparison, not a SQL parser: anything that is not
//! a CREATE TABLE block is ignored.

use intentgraph_store::Evidence;

use super::{Category, Finding};
use crate::features::parsing::collapse_ws;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    name: String,
    /// Whitespace-collapsed, uppercased definition (type + flags)
    definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Table {
    name: String,
    columns: Vec<Column>,
}

pub fn detect(before: &[u8], after: &[u8]) -> Vec<Finding> {
    let before = parse_tables(&String::from_utf8_lossy(before));
    let after = parse_tables(&String::from_utf8_lossy(after));

    let mut findings = Vec::new();

    for table in &after {
        match before.iter().find(|t| t.name == table.name) {
            None => findings.push(table_finding(Category::SqlTableAdded, &table.name)),
            Some(old) => compare_columns(old, table, &mut findings),
        }
    }
    for table in &before {
        if !after.iter().any(|t| t.name == table.name) {
            findings.push(table_finding(Category::SqlTableRemoved, &table.name));
        }
    }

    findings
}

fn compare_columns(before: &Table, after: &Table, out: &mut Vec<Finding>) {
    for column in &after.columns {
        match before.columns.iter().find(|c| c.name == column.name) {
            None => out.push(column_finding(
                Category::SqlColumnAdded,
                &after.name,
                &column.name,
            )),
            Some(old) if old.definition != column.definition => out.push(column_finding(
                Category::SqlColumnModified,
                &after.name,
                &column.name,
            )),
            Some(_) => {}
        }
    }
    for column in &before.columns {
        if !after.columns.iter().any(|c| c.name == column.name) {
            out.push(column_finding(
                Category::SqlColumnRemoved,
                &before.name,
                &column.name,
            ));
        }
    }
}

fn table_finding(category: Category, table: &str) -> Finding {
    Finding::new(
        category,
        Evidence {
            file_ranges: Vec::new(),
            symbols: vec![format!("table:{}", table)],
        },
    )
}

fn column_finding(category: Category, table: &str, column: &str) -> Finding {
    Finding::new(
        category,
        Evidence {
            file_ranges: Vec::new(),
            symbols: vec![format!("column:{}.{}", table, column)],
        },
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Extraction
// ═══════════════════════════════════════════════════════════════════════════

const TABLE_CONSTRAINT_KEYWORDS: &[&str] = &[
    "PRIMARY",
    "FOREIGN",
    "UNIQUE",
    "CONSTRAINT",
    "CHECK",
    "KEY",
    "INDEX",
];

fn parse_tables(sql: &str) -> Vec<Table> {
    let upper = sql.to_uppercase();
    let mut tables = Vec::new();
    let mut search_from = 0;

    while let Some(found) = upper[search_from..].find("CREATE TABLE") {
        let stmt_start = search_from + found + "CREATE TABLE".len();
        search_from = stmt_start;

        let rest = &sql[stmt_start..];
        let Some((name, body_open)) = table_name_and_paren(rest) else {
            continue;
        };
        let Some(body) = balanced_body(&rest[body_open..]) else {
            continue;
        };
        search_from = stmt_start + body_open + body.len();

        let columns = split_top_level(body)
            .into_iter()
            .filter_map(parse_column)
            .collect();
        tables.push(Table { name, columns });
    }

    tables
}

/// Table name plus the offset of its opening parenthesis, skipping an
/// optional `IF NOT EXISTS`.
fn table_name_and_paren(rest: &str) -> Option<(String, usize)> {
    let paren = rest.find('(')?;
    let mut header = rest[..paren].trim();
    let upper = header.to_uppercase();
    if let Some(stripped) = upper.strip_prefix("IF NOT EXISTS") {
        header = header[header.len() - stripped.len()..].trim();
    }
    let name = header
        .split_whitespace()
        .last()?
        .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']');
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), paren))
}

/// The parenthesized body including both parens, balanced for nested types.
fn balanced_body(from_paren: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in from_paren.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&from_paren[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a `( … )` body at commas that sit at nesting depth one.
fn split_top_level(body: &str) -> Vec<&str> {
    let inner = &body[1..body.len() - 1];
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&inner[start..]);
    items
}

fn parse_column(item: &str) -> Option<Column> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }
    let mut words = item.split_whitespace();
    let first = words.next()?;
    if TABLE_CONSTRAINT_KEYWORDS.contains(&first.to_uppercase().as_str()) {
        return None;
    }
    let name = first
        .trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
        .to_string();
    let definition = collapse_ws(&item[first.len()..]).to_uppercase();
    Some(Column { name, definition })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats_and_markers(findings: &[Finding]) -> Vec<(Category, String)> {
        findings
            .iter()
            .map(|f| (f.category, f.evidence.symbols[0].clone()))
            .collect()
    }

    #[test]
    fn test_column_modified_and_added() {
        let before = b"CREATE TABLE users(id INT, email VARCHAR(100) NOT NULL)";
        let after =
            b"CREATE TABLE users(id INT, email VARCHAR(255) NOT NULL, created_at TIMESTAMP)";
        let findings = detect(before, after);
        let got = cats_and_markers(&findings);
        assert_eq!(findings.len(), 2);
        assert!(got.contains(&(Category::SqlColumnModified, "column:users.email".into())));
        assert!(got.contains(&(Category::SqlColumnAdded, "column:users.created_at".into())));
    }

    #[test]
    fn test_table_added_and_removed() {
        let before = b"CREATE TABLE old_t(id INT);";
        let after = b"CREATE TABLE new_t(id INT);";
        let got = cats_and_markers(&detect(before, after));
        assert!(got.contains(&(Category::SqlTableAdded, "table:new_t".into())));
        assert!(got.contains(&(Category::SqlTableRemoved, "table:old_t".into())));
    }

    #[test]
    fn test_column_removed() {
        let before = b"CREATE TABLE t(id INT, legacy TEXT)";
        let after = b"CREATE TABLE t(id INT)";
        assert_eq!(
            cats_and_markers(&detect(before, after)),
            vec![(Category::SqlColumnRemoved, "column:t.legacy".into())]
        );
    }

    #[test]
    fn test_identical_schema_is_silent() {
        let sql = b"CREATE TABLE t(id INT PRIMARY KEY, name TEXT DEFAULT 'x')";
        assert!(detect(sql, sql).is_empty());
    }

    #[test]
    fn test_whitespace_and_case_are_canonicalized() {
        let before = b"CREATE TABLE t(email   varchar(100)  not null)";
        let after = b"CREATE TABLE t(email VARCHAR(100) NOT NULL)";
        assert!(detect(before, after).is_empty());
    }

    #[test]
    fn test_table_constraints_are_skipped() {
        let before = b"CREATE TABLE t(id INT)";
        let after = b"CREATE TABLE t(id INT, PRIMARY KEY (id), FOREIGN KEY (id) REFERENCES u(id))";
        assert!(detect(before, after).is_empty());
    }

    #[test]
    fn test_nested_parens_in_types() {
        let before = b"CREATE TABLE t(amount DECIMAL(10,2))";
        let after = b"CREATE TABLE t(amount DECIMAL(12,4))";
        assert_eq!(
            cats_and_markers(&detect(before, after)),
            vec![(Category::SqlColumnModified, "column:t.amount".into())]
        );
    }

    #[test]
    fn test_if_not_exists_and_multiple_tables() {
        let sql = b"CREATE TABLE IF NOT EXISTS a(id INT);\nCREATE TABLE b(id INT);";
        let tables = parse_tables(&String::from_utf8_lossy(sql));
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_no_create_table_yields_nothing() {
        assert!(detect(b"SELECT 1;", b"SELECT 2;").is_empty());
    }
}
