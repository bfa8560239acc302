//! Grammar node kinds and predicates
//!
//! Constants match the exact node type names from the tree-sitter-typescript
//! grammar (the TS grammar parses plain js, the TSX grammar parses jsx).

pub mod node_kinds {
    // Declarations
    pub const CLASS_DECLARATION: &str = "class_declaration";
    pub const FUNCTION_DECLARATION: &str = "function_declaration";
    pub const GENERATOR_FUNCTION_DECLARATION: &str = "generator_function_declaration";
    pub const METHOD_DEFINITION: &str = "method_definition";
    pub const LEXICAL_DECLARATION: &str = "lexical_declaration";
    pub const VARIABLE_DECLARATION: &str = "variable_declaration";
    pub const VARIABLE_DECLARATOR: &str = "variable_declarator";

    // Functions as values
    pub const ARROW_FUNCTION: &str = "arrow_function";
    pub const FUNCTION_EXPRESSION: &str = "function_expression";
    pub const GENERATOR_FUNCTION: &str = "generator_function";

    // Structure
    pub const CLASS_BODY: &str = "class_body";
    pub const FORMAL_PARAMETERS: &str = "formal_parameters";
    pub const STATEMENT_BLOCK: &str = "statement_block";

    // Import/export
    pub const EXPORT_STATEMENT: &str = "export_statement";
    pub const EXPORT_SPECIFIER: &str = "export_specifier";

    // Expressions the change detector pairs
    pub const BINARY_EXPRESSION: &str = "binary_expression";
    pub const LOGICAL_EXPRESSION: &str = "logical_expression";
    pub const RELATIONAL_EXPRESSION: &str = "relational_expression";
    pub const NUMBER: &str = "number";
    pub const STRING: &str = "string";
    pub const IDENTIFIER: &str = "identifier";
}

/// Node types that carry a condition the detector compares
pub const CONDITION_NODE_KINDS: &[&str] = &[
    node_kinds::BINARY_EXPRESSION,
    node_kinds::LOGICAL_EXPRESSION,
    node_kinds::RELATIONAL_EXPRESSION,
];

/// Literal node types the constant detector pairs
pub const LITERAL_NODE_KINDS: &[&str] = &[node_kinds::NUMBER, node_kinds::STRING];

/// The fixed operator vocabulary for condition comparison
pub const CONDITION_OPERATORS: &[&str] = &[
    "<", ">", "<=", ">=", "==", "===", "!=", "!==", "&&", "||", "+", "-", "*", "/",
];

/// Check if a node kind is a function-bearing declaration
pub fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        node_kinds::FUNCTION_DECLARATION
            | node_kinds::GENERATOR_FUNCTION_DECLARATION
            | node_kinds::METHOD_DEFINITION
            | node_kinds::ARROW_FUNCTION
            | node_kinds::FUNCTION_EXPRESSION
            | node_kinds::GENERATOR_FUNCTION
    )
}

/// Check if a node kind is a value that makes its declarator a function
pub fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        node_kinds::ARROW_FUNCTION
            | node_kinds::FUNCTION_EXPRESSION
            | node_kinds::GENERATOR_FUNCTION
    )
}

/// Check if an operator belongs to the fixed comparison vocabulary
pub fn is_condition_operator(op: &str) -> bool {
    CONDITION_OPERATORS.contains(&op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_like_predicate() {
        assert!(is_function_like(node_kinds::FUNCTION_DECLARATION));
        assert!(is_function_like(node_kinds::ARROW_FUNCTION));
        assert!(is_function_like(node_kinds::METHOD_DEFINITION));
        assert!(!is_function_like(node_kinds::CLASS_DECLARATION));
    }

    #[test]
    fn test_condition_operator_vocabulary() {
        assert!(is_condition_operator("==="));
        assert!(is_condition_operator("&&"));
        assert!(is_condition_operator("<="));
        assert!(!is_condition_operator("??"));
        assert!(!is_condition_operator("instanceof"));
    }
}
