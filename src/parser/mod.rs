//! Parser module: tree-sitter parsing and per-file extraction.
//!
//! [`python`] holds the extractor proper. The small helpers below are shared
//! by the extractor, the marker detectors and the call resolver.

pub mod language;
pub mod lints;
pub mod python;
pub mod routes;
pub mod signatures;

pub use language::SourceLanguage;
pub use python::{extract_module, Extraction};
pub use signatures::{MarkerRole, MarkerSignature, NamePattern, SignatureTable};

use tree_sitter::{Node, Tree};

use crate::error::{Result, SymgraphError};

/// Parse `source` and reject trees containing syntax errors.
pub fn parse_source(language: SourceLanguage, source: &str) -> Result<Tree> {
    let mut parser = language.parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SymgraphError::Syntax("parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let message = match first_error(root) {
            Some(node) => {
                let pos = node.start_position();
                format!("syntax error at line {}, column {}", pos.row + 1, pos.column + 1)
            }
            None => "syntax error".to_string(),
        };
        return Err(SymgraphError::Syntax(message));
    }
    Ok(tree)
}

/// First ERROR or MISSING node in document order.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Source text of a node, empty on invalid UTF-8.
pub fn node_text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// 1-indexed line of a node.
pub fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// `a.b.c` for identifier/attribute chains, `None` for anything else.
pub fn dotted_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => {
            let object = dotted_name(node.child_by_field_name("object")?, source)?;
            let attr = node.child_by_field_name("attribute")?;
            Some(format!("{}.{}", object, node_text(attr, source)))
        }
        _ => None,
    }
}

/// Like [`dotted_name`], but keeps the attribute tail when the base is not
/// a name chain (`make().Error` → `Error`). Used for decorator, base class
/// and raised-exception names.
pub fn loose_dotted_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => {
            let attr = node_text(node.child_by_field_name("attribute")?, source);
            match node
                .child_by_field_name("object")
                .and_then(|object| loose_dotted_name(object, source))
            {
                Some(base) => Some(format!("{}.{}", base, attr)),
                None => Some(attr.to_string()),
            }
        }
        _ => None,
    }
}

/// The class or function under a `decorated_definition`, or the node itself.
pub fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

/// Decorator expressions applied to a definition, outermost first.
pub fn decorators(definition: Node) -> Vec<Node> {
    match definition.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => named_children(parent)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| named_children(decorator).into_iter().next())
            .collect(),
        _ => Vec::new(),
    }
}

/// Dotted names of a definition's decorators; calls contribute the callee.
pub fn decorator_names(definition: Node, source: &[u8]) -> Vec<String> {
    decorators(definition)
        .into_iter()
        .filter_map(|expr| {
            let target = if expr.kind() == "call" {
                expr.child_by_field_name("function")?
            } else {
                expr
            };
            loose_dotted_name(target, source)
        })
        .collect()
}

/// Base class names of a `class_definition`.
pub fn base_names(class: Node, source: &[u8]) -> Vec<String> {
    let Some(bases) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };
    named_children(bases)
        .into_iter()
        .filter(|base| base.kind() != "keyword_argument")
        .map(|base| {
            let base = if base.kind() == "subscript" {
                base.child_by_field_name("value").unwrap_or(base)
            } else {
                base
            };
            loose_dotted_name(base, source).unwrap_or_else(|| node_text(base, source).to_string())
        })
        .collect()
}

/// Value of a plain string literal; `None` for f-strings and non-strings.
pub fn string_literal(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    if named_children(node)
        .iter()
        .any(|child| child.kind() == "interpolation")
    {
        return None;
    }
    Some(strip_quotes(node_text(node, source)))
}

/// Strip prefix letters and quotes from a Python string literal.
pub fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    let s = s.trim_start_matches(|c: char| c.is_ascii_alphabetic());

    for quote in ["\"\"\"", "'''"] {
        if s.len() >= 6 && s.starts_with(quote) && s.ends_with(quote) {
            return s[3..s.len() - 3].to_string();
        }
    }
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Pre-order walk that does not enter nodes for which `skip` returns true.
/// The start node itself is always visited.
pub fn walk_pruned<'t, F, S>(start: Node<'t>, skip: S, mut visit: F)
where
    F: FnMut(Node<'t>),
    S: Fn(Node<'t>) -> bool,
{
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        visit(node);
        let mut children = named_children(node);
        children.retain(|child| !skip(*child));
        children.reverse();
        stack.extend(children);
    }
}

/// Pre-order walk over every named node.
pub fn walk_all<'t, F>(start: Node<'t>, visit: F)
where
    F: FnMut(Node<'t>),
{
    walk_pruned(start, |_| false, visit);
}
