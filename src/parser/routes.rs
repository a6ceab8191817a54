//! HTTP route detection on decorated handlers.
//!
//! Detects Flask/FastAPI route decorators:
//!   @app.get("/api/users")
//!   @router.post("/api/items")
//!   @bp.route("/api/users", methods=["GET", "POST"])

use tree_sitter::Node;

use super::signatures::{MarkerRole, SignatureTable};
use super::{decorators, loose_dotted_name, named_children, node_text, string_literal};
use crate::graph::types::{LocalId, Route};

/// Routes declared by the decorators of a function definition.
pub fn extract_routes(
    definition: Node,
    source: &[u8],
    handler: LocalId,
    table: &SignatureTable,
) -> Vec<Route> {
    let mut routes = Vec::new();
    for decorator in decorators(definition) {
        if decorator.kind() != "call" {
            continue;
        }
        for (verb, path) in extract_route_from_call(decorator, source, table) {
            routes.push(Route {
                verb,
                path,
                handler,
            });
        }
    }
    routes
}

/// `(verb, path)` pairs for one decorator call.
fn extract_route_from_call(node: Node, source: &[u8], table: &SignatureTable) -> Vec<(String, String)> {
    let Some(func) = node.child_by_field_name("function") else {
        return Vec::new();
    };
    let Some(args) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let Some(name) = loose_dotted_name(func, source) else {
        return Vec::new();
    };
    let Some(path) = get_first_string_arg(args, source) else {
        return Vec::new();
    };

    match table.route_role(&name) {
        Some(MarkerRole::RouteVerb(verb)) => vec![(verb.to_string(), path)],
        Some(MarkerRole::RouteMethods) => {
            let mut verbs = extract_methods_arg(args, source);
            if verbs.is_empty() {
                verbs.push("GET".to_string());
            }
            verbs.into_iter().map(|verb| (verb, path.clone())).collect()
        }
        _ => Vec::new(),
    }
}

/// The first positional argument, when it is a plain string literal.
fn get_first_string_arg(args: Node, source: &[u8]) -> Option<String> {
    let first = named_children(args)
        .into_iter()
        .find(|child| !matches!(child.kind(), "keyword_argument" | "comment"))?;
    string_literal(first, source)
}

/// Upper-cased verbs from `methods=[...]` (list or tuple), de-duplicated.
fn extract_methods_arg(args: Node, source: &[u8]) -> Vec<String> {
    let mut verbs: Vec<String> = Vec::new();
    for child in named_children(args) {
        if child.kind() != "keyword_argument" {
            continue;
        }
        let is_methods = child
            .child_by_field_name("name")
            .is_some_and(|name| node_text(name, source) == "methods");
        if !is_methods {
            continue;
        }
        let Some(value) = child.child_by_field_name("value") else {
            continue;
        };
        if !matches!(value.kind(), "list" | "tuple") {
            continue;
        }
        for element in named_children(value) {
            if let Some(verb) = string_literal(element, source) {
                let verb = verb.to_uppercase();
                if !verbs.contains(&verb) {
                    verbs.push(verb);
                }
            }
        }
    }
    verbs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_source, unwrap_decorated, SourceLanguage};

    fn routes_of(source: &str) -> Vec<(String, String)> {
        let tree = parse_source(SourceLanguage::Python, source).unwrap();
        let def = unwrap_decorated(tree.root_node().named_child(0).unwrap());
        extract_routes(def, source.as_bytes(), 1, &SignatureTable::python())
            .into_iter()
            .map(|r| (r.verb, r.path))
            .collect()
    }

    #[test]
    fn test_fixed_verb_route() {
        let routes = routes_of("@router.get(\"/users/{id}\")\nasync def get_user(id):\n    pass\n");
        assert_eq!(routes, vec![("GET".to_string(), "/users/{id}".to_string())]);
    }

    #[test]
    fn test_route_with_methods() {
        let routes = routes_of(
            "@bp.route('/items', methods=['get', 'POST', 'GET'])\ndef items():\n    pass\n",
        );
        assert_eq!(
            routes,
            vec![
                ("GET".to_string(), "/items".to_string()),
                ("POST".to_string(), "/items".to_string()),
            ]
        );
    }

    #[test]
    fn test_route_defaults_to_get() {
        let routes = routes_of("@app.route('/health')\ndef health():\n    pass\n");
        assert_eq!(routes, vec![("GET".to_string(), "/health".to_string())]);
    }

    #[test]
    fn test_non_literal_path_is_ignored() {
        assert!(routes_of("@app.get(PREFIX + '/x')\ndef f():\n    pass\n").is_empty());
        assert!(routes_of("@app.get(f'/x/{v}')\ndef f():\n    pass\n").is_empty());
        assert!(routes_of("@client.get('/x')\ndef f():\n    pass\n").is_empty());
    }
}
