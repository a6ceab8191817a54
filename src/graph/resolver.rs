//! Call resolution, the second pass.
//!
//! Every call expression inside a top-level function or a method of a
//! top-level class is resolved against the aggregated [`GlobalIndex`]:
//!
//! 1. bare names hit the file's own symbol table,
//! 2. dotted names get their head expanded through the import aliases,
//! 3. the longest known module prefix is matched,
//! 4. the remainder is tried as `Type.member`, then as a bare member,
//!    falling back to the module pseudo-symbol,
//! 5. the re-export table is consulted at most once.
//!
//! Anything still unresolved produces no edge. Targets of property kind
//! never produce an edge either.

use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

use super::index::GlobalIndex;
use super::types::{Edge, LocalId, Module, ModuleId, SymbolId, SymbolKind};
use crate::parser::{dotted_name, node_text, walk_all};

/// Outcome of matching a dotted name against the module table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direct {
    /// A member of the matched module.
    Member(SymbolId),
    /// A module matched but none of its members did.
    ModuleOnly(ModuleId),
    /// No module prefix matched.
    Missing,
}

impl Direct {
    fn target(self) -> Option<SymbolId> {
        match self {
            Direct::Member(id) => Some(id),
            Direct::ModuleOnly(module) => Some(SymbolId::module(module)),
            Direct::Missing => None,
        }
    }
}

/// Resolves call sites against a read-only global index.
#[derive(Debug, Clone, Copy)]
pub struct CallResolver<'g> {
    index: &'g GlobalIndex,
}

impl<'g> CallResolver<'g> {
    pub fn new(index: &'g GlobalIndex) -> Self {
        Self { index }
    }

    /// All `calls` edges originating in `module`, de-duplicated and sorted.
    pub fn resolve_module(&self, module: &Module, root: Node, source: &[u8]) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        walk_all(root, |node| {
            if node.kind() != "call" {
                return;
            }
            let Some(caller) = caller_of(node, module) else {
                return;
            };
            if let Some(target) = self.resolve_call(module, node, source) {
                edges.insert(Edge::calls(SymbolId::new(module.id, caller), target));
            }
        });
        edges.into_iter().collect()
    }

    /// Target of one call expression, `None` when unresolved or when the
    /// target is a property.
    pub fn resolve_call(&self, module: &Module, call: Node, source: &[u8]) -> Option<SymbolId> {
        let callee = call.child_by_field_name("function")?;
        let target = match callee.kind() {
            "identifier" => module
                .callable(node_text(callee, source))
                .map(|local| SymbolId::new(module.id, local)),
            "attribute" => {
                let dotted = dotted_name(callee, source)?;
                self.resolve_qualified(&expand_alias(&dotted, &module.imports))
            }
            _ => None,
        }?;
        self.callable_target(target)
    }

    /// Resolve a fully-qualified dotted name, following at most one
    /// re-export hop.
    pub fn resolve_qualified(&self, dotted: &str) -> Option<SymbolId> {
        match self.resolve_direct(dotted) {
            Direct::Member(id) => Some(id),
            Direct::ModuleOnly(module) => {
                let hop = self
                    .index
                    .reexport(dotted)
                    .and_then(|origin| self.resolve_direct(origin).target());
                Some(hop.unwrap_or(SymbolId::module(module)))
            }
            Direct::Missing => {
                let origin = self.index.reexport(dotted)?;
                self.resolve_direct(origin).target()
            }
        }
    }

    fn resolve_direct(&self, dotted: &str) -> Direct {
        let Some((module, rest)) = self.index.longest_prefix(dotted) else {
            return Direct::Missing;
        };

        let member = match rest.as_slice() {
            [] => None,
            [name] => module.member(name),
            [ty, member, ..] => module
                .member(&format!("{}.{}", ty, member))
                .or_else(|| module.member(ty)),
        };
        match member {
            Some(local) => Direct::Member(SymbolId::new(module.id, local)),
            None => Direct::ModuleOnly(module.id),
        }
    }

    fn callable_target(&self, target: SymbolId) -> Option<SymbolId> {
        match self.index.symbol(target) {
            Some(symbol) if symbol.kind == SymbolKind::Property => None,
            _ => Some(target),
        }
    }
}

/// Rewrite the head of `dotted` through the import-alias map.
pub fn expand_alias(dotted: &str, imports: &BTreeMap<String, String>) -> String {
    let (head, tail) = match dotted.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (dotted, None),
    };
    match (imports.get(head), tail) {
        (Some(origin), Some(tail)) => format!("{}.{}", origin, tail),
        (Some(origin), None) => origin.clone(),
        (None, _) => dotted.to_string(),
    }
}

/// Local id of the function or method containing `call`.
///
/// Only top-level functions and methods of top-level classes are symbols;
/// calls anywhere else are not attributed. The enclosing definition is
/// matched by position, so a redefined name keeps each body on its own
/// symbol.
pub fn caller_of(call: Node, module: &Module) -> Option<LocalId> {
    let mut current = call.parent();
    let function = loop {
        let node = current?;
        if node.kind() == "function_definition" {
            break node;
        }
        current = node.parent();
    };
    module.definition_at(function.start_byte())
}

/// Module-level `imports` edges from raw import tokens: exact logical name,
/// else the first module sharing the last component's file stem.
pub fn import_edges(module: &Module, index: &GlobalIndex) -> Vec<Edge> {
    let targets: BTreeSet<ModuleId> = module
        .import_tokens
        .iter()
        .filter_map(|token| index.resolve_token(token))
        .map(|target| target.id)
        .filter(|id| *id != module.id)
        .collect();
    targets
        .into_iter()
        .map(|target| Edge::imports(module.id, target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymgraphConfig;
    use crate::graph::index::ModuleIndex;
    use crate::graph::types::{Relation, MODULE_SYMBOL};
    use crate::parser::{extract_module, parse_source, SignatureTable, SourceLanguage};

    /// Run both passes over in-memory files.
    fn resolve(files: &[(&str, &str)]) -> (GlobalIndex, Vec<Edge>) {
        let index = ModuleIndex::new(files.iter().map(|(path, _)| *path));
        let config = SymgraphConfig::default();
        let table = SignatureTable::python();
        let source_of = |path: &str| {
            files
                .iter()
                .find(|(p, _)| *p == path)
                .map(|(_, s)| *s)
                .unwrap()
        };

        let modules = index
            .entries()
            .iter()
            .map(|e| extract_module(e.id, &e.path, source_of(&e.path), &config, &table).module)
            .collect();
        let global = GlobalIndex::new(modules);

        let resolver = CallResolver::new(&global);
        let mut edges = Vec::new();
        for module in global.modules() {
            let source = source_of(&module.path);
            let Ok(tree) = parse_source(SourceLanguage::Python, source) else {
                continue;
            };
            edges.extend(resolver.resolve_module(module, tree.root_node(), source.as_bytes()));
            edges.extend(import_edges(module, &global));
        }
        edges.sort();
        (global, edges)
    }

    fn id(global: &GlobalIndex, logical: &str, member: &str) -> SymbolId {
        let module = global.by_name(logical).unwrap();
        let local = if member.is_empty() {
            MODULE_SYMBOL
        } else {
            module.member(member).unwrap()
        };
        SymbolId::new(module.id, local)
    }

    fn calls(edges: &[Edge]) -> Vec<Edge> {
        edges
            .iter()
            .filter(|e| e.relation == Relation::Calls)
            .copied()
            .collect()
    }

    #[test]
    fn test_local_and_module_calls() {
        let (global, edges) = resolve(&[
            ("a.py", "import b\n\ndef f():\n    helper()\n    b.g()\n\ndef helper():\n    pass\n"),
            ("b.py", "def g():\n    pass\n"),
        ]);
        assert_eq!(
            calls(&edges),
            vec![
                Edge::calls(id(&global, "a", "f"), id(&global, "a", "helper")),
                Edge::calls(id(&global, "a", "f"), id(&global, "b", "g")),
            ]
        );
        assert!(edges.contains(&Edge::imports(1, 2)));
    }

    #[test]
    fn test_alias_expansion_and_methods() {
        let (global, edges) = resolve(&[
            (
                "app/main.py",
                "from app import store as st\n\nclass Handler:\n    def run(self):\n        st.Repo.save()\n        st.missing()\n",
            ),
            ("app/store.py", "class Repo:\n    def save(self):\n        pass\n"),
        ]);
        assert_eq!(
            calls(&edges),
            vec![
                Edge::calls(id(&global, "app.main", "Handler.run"), id(&global, "app.store", "")),
                Edge::calls(id(&global, "app.main", "Handler.run"), id(&global, "app.store", "Repo.save")),
            ]
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let (global, edges) = resolve(&[
            ("pkg/__init__.py", "class Type:\n    def method(self):\n        pass\n"),
            ("pkg/sub.py", "class Type:\n    def method(self):\n        pass\n"),
            ("user.py", "import pkg.sub\n\ndef go():\n    pkg.sub.Type.method()\n"),
        ]);
        assert_eq!(
            calls(&edges),
            vec![Edge::calls(id(&global, "user", "go"), id(&global, "pkg.sub", "Type.method"))]
        );
    }

    #[test]
    fn test_property_targets_emit_nothing() {
        let (_, edges) = resolve(&[
            (
                "service.py",
                "class Service:\n    @property\n    def status(self):\n        return 'ok'\n",
            ),
            (
                "client.py",
                "import service\n\ndef check(svc):\n    svc.status()\n    service.Service.status()\n",
            ),
        ]);
        assert!(calls(&edges).is_empty());
    }

    #[test]
    fn test_reexport_hop_is_single() {
        let (global, edges) = resolve(&[
            ("a/__init__.py", "from b import s as n\n"),
            ("b/__init__.py", "from c import t as s\n"),
            ("c.py", "def t():\n    pass\n"),
            ("main.py", "import a\n\ndef run():\n    a.n()\n"),
        ]);
        assert_eq!(
            calls(&edges),
            vec![Edge::calls(id(&global, "main", "run"), id(&global, "b", ""))]
        );
    }

    #[test]
    fn test_reexport_reaches_origin_symbol() {
        let (global, edges) = resolve(&[
            ("lib/__init__.py", "from lib.core import Engine\n"),
            ("lib/core.py", "class Engine:\n    def start(self):\n        pass\n"),
            ("main.py", "import lib\n\ndef run():\n    lib.Engine()\n"),
        ]);
        assert_eq!(
            calls(&edges),
            vec![Edge::calls(id(&global, "main", "run"), id(&global, "lib.core", "Engine"))]
        );
    }

    #[test]
    fn test_unattributed_calls() {
        let (_, edges) = resolve(&[(
            "m.py",
            "def f():\n    pass\n\nf()\n\ndef outer():\n    def inner():\n        f()\n    return inner\n",
        )]);
        assert!(calls(&edges).is_empty());
    }

    #[test]
    fn test_duplicate_calls_collapse() {
        let (_, edges) = resolve(&[("m.py", "def f():\n    g()\n    g()\n\ndef g():\n    pass\n")]);
        assert_eq!(calls(&edges).len(), 1);
    }

    #[test]
    fn test_unknown_targets_are_dropped() {
        let (_, edges) = resolve(&[(
            "m.py",
            "import requests\n\ndef f(x):\n    requests.get('u')\n    x.method()\n    print('x')\n",
        )]);
        assert!(calls(&edges).is_empty());
    }

    #[test]
    fn test_property_setter_is_not_a_call_target() {
        let (global, edges) = resolve(&[
            (
                "service.py",
                "class Service:\n    @property\n    def status(self):\n        return self._s\n\n    @status.setter\n    def status(self, value):\n        self._s = value\n",
            ),
            ("client.py", "import service\n\ndef poll():\n    service.Service.status()\n"),
        ]);
        assert!(calls(&edges).is_empty());

        let service = global.by_name("service").unwrap();
        assert!(service
            .symbols
            .iter()
            .filter(|s| s.qualified_name == "Service.status")
            .all(|s| s.kind == SymbolKind::Property));
    }

    #[test]
    fn test_redefined_function_owns_its_calls() {
        let (_, edges) = resolve(&[(
            "m.py",
            "def f():\n    pass\n\ndef g():\n    pass\n\ndef f():\n    g()\n\ndef h():\n    f()\n",
        )]);
        assert_eq!(
            calls(&edges),
            vec![
                Edge::calls(SymbolId::new(1, 3), SymbolId::new(1, 2)),
                Edge::calls(SymbolId::new(1, 4), SymbolId::new(1, 3)),
            ]
        );
    }

    #[test]
    fn test_expand_alias() {
        let mut imports = BTreeMap::new();
        imports.insert("np".to_string(), "numpy".to_string());
        assert_eq!(expand_alias("np.array", &imports), "numpy.array");
        assert_eq!(expand_alias("np", &imports), "numpy");
        assert_eq!(expand_alias("os.path.join", &imports), "os.path.join");
    }

    #[test]
    fn test_import_edges_skip_self_and_unknown() {
        let (_, edges) = resolve(&[
            ("pkg/util.py", "import pkg.util\nimport json\n"),
            ("pkg/other.py", "from . import util\nfrom .util import thing\n"),
        ]);
        let imports: Vec<Edge> = edges
            .iter()
            .filter(|e| e.relation == Relation::Imports)
            .copied()
            .collect();
        assert_eq!(imports, vec![Edge::imports(1, 2)]);
    }
}
