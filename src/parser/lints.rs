//! Prohibited-pattern scans.

use tree_sitter::Node;

use super::{line_of, named_children, node_text, walk_all};
use crate::graph::types::{PatternHit, ProhibitedPattern};

/// Bare `except:`, `eval`/`exec` calls and console prints anywhere in the
/// tree. Prints are allowed in test code.
pub fn scan_tree(root: Node, source: &[u8], is_test: bool) -> Vec<PatternHit> {
    let mut hits = Vec::new();
    walk_all(root, |node| {
        let pattern = match node.kind() {
            "except_clause" if is_bare_except(node) => Some(ProhibitedPattern::BareExcept),
            "call" => node
                .child_by_field_name("function")
                .filter(|func| func.kind() == "identifier")
                .and_then(|func| match node_text(func, source) {
                    "eval" | "exec" => Some(ProhibitedPattern::DynamicEval),
                    "print" if !is_test => Some(ProhibitedPattern::ConsolePrint),
                    _ => None,
                }),
            "exec_statement" => Some(ProhibitedPattern::DynamicEval),
            "print_statement" if !is_test => Some(ProhibitedPattern::ConsolePrint),
            _ => None,
        };
        if let Some(pattern) = pattern {
            hits.push(PatternHit {
                pattern,
                line: line_of(node),
            });
        }
    });
    hits
}

/// `except:` with no exception filter.
fn is_bare_except(clause: Node) -> bool {
    named_children(clause)
        .iter()
        .all(|child| matches!(child.kind(), "block" | "comment"))
}

/// True when a positional or keyword default is a list, dict or set literal.
pub fn has_mutable_default(parameters: Node) -> bool {
    named_children(parameters).into_iter().any(|param| {
        matches!(param.kind(), "default_parameter" | "typed_default_parameter")
            && param
                .child_by_field_name("value")
                .is_some_and(|value| matches!(value.kind(), "list" | "dictionary" | "set"))
    })
}

/// Lines of module-scope assignment statements.
pub fn module_assignments(root: Node) -> Vec<usize> {
    named_children(root)
        .into_iter()
        .filter(|stmt| stmt.kind() == "expression_statement")
        .filter_map(|stmt| named_children(stmt).into_iter().next())
        .filter(|expr| expr.kind() == "assignment" && expr.child_by_field_name("right").is_some())
        .map(line_of)
        .collect()
}
