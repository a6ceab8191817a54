//! Python extractor, the first pass.
//!
//! Walks one syntax tree and fills one [`Module`]: its symbol table, import
//! aliases, re-exports, markers and prohibited patterns. Nothing here looks
//! at any other file.
//!
//! Symbols are numbered in declaration order at file scope. A class takes
//! the next local id, then its methods follow in body order before the next
//! top-level definition.

use std::collections::BTreeSet;
use tree_sitter::Node;

use super::signatures::SignatureTable;
use super::{
    base_names, decorator_names, line_of, lints, loose_dotted_name, named_children, node_text,
    parse_source, routes, string_literal, strip_quotes, unwrap_decorated, walk_all, walk_pruned,
    SourceLanguage,
};
use crate::config::SymgraphConfig;
use crate::error::ParseFailure;
use crate::graph::types::{
    DataShape, Enumeration, ErrorType, Field, LocalId, ModuleId, Modifier, Module, ModuleStatus,
    ProhibitedPattern, SymbolKind,
};

/// Methods a type must define to count as a descriptor.
const DESCRIPTOR_METHODS: [&str; 3] = ["__get__", "__set__", "__set_name__"];

/// Result of extracting one file.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub module: Module,
    /// Set when the file could not be read or parsed; `module` is then in
    /// its minimal form.
    pub failure: Option<ParseFailure>,
}

impl Extraction {
    pub fn failed(id: ModuleId, path: &str, message: impl std::fmt::Display) -> Self {
        Self {
            module: Module::degraded(id, path, ModuleStatus::Failed),
            failure: Some(ParseFailure::new(path, message)),
        }
    }
}

/// Extract one source file.
pub fn extract_module(
    id: ModuleId,
    path: &str,
    source: &str,
    config: &SymgraphConfig,
    table: &SignatureTable,
) -> Extraction {
    let Some(language) = SourceLanguage::from_path(path) else {
        return Extraction {
            module: Module::degraded(id, path, ModuleStatus::Unsupported),
            failure: None,
        };
    };

    let tree = match parse_source(language, source) {
        Ok(tree) => tree,
        Err(e) => return Extraction::failed(id, path, e),
    };

    let mut extractor = FileExtractor {
        module: Module::new(id, path),
        source: source.as_bytes(),
        table,
        is_test: config.is_test_path(path),
    };
    extractor.run(tree.root_node());

    Extraction {
        module: extractor.module,
        failure: None,
    }
}

struct FileExtractor<'a> {
    module: Module,
    source: &'a [u8],
    table: &'a SignatureTable,
    is_test: bool,
}

impl<'a> FileExtractor<'a> {
    fn run(&mut self, root: Node) {
        self.collect_imports(root);
        self.module
            .prohibited
            .extend(lints::scan_tree(root, self.source, self.is_test));

        for stmt in named_children(root) {
            let definition = unwrap_decorated(stmt);
            match definition.kind() {
                "class_definition" => self.process_class(definition),
                "function_definition" => {
                    self.process_function(definition, None);
                }
                _ => {}
            }
        }

        if self.module.role_tags.contains("svc") {
            for line in lints::module_assignments(root) {
                self.module.flag(ProhibitedPattern::GlobalStateInService, line);
            }
        }

        if self.module.is_index() && !self.module.logical_name.is_empty() {
            self.collect_reexports(root);
        }

        self.module
            .prohibited
            .sort_by_key(|hit| (hit.line, hit.pattern));
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(node, self.source)
    }

    // ─── Imports ────────────────────────────────────────────────

    fn collect_imports(&mut self, root: Node) {
        walk_all(root, |node| match node.kind() {
            "import_statement" => self.plain_import(node),
            "import_from_statement" => self.from_import(node),
            _ => {}
        });
    }

    /// `import a.b` binds `a.b`, `import a.b as x` binds `x`.
    fn plain_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let Some((target, alias)) = self.import_name(name) else {
                continue;
            };
            self.module.import_tokens.insert(target.clone());
            let bound = alias.unwrap_or_else(|| target.clone());
            self.module.imports.insert(bound, target);
        }
    }

    /// `from base import name [as alias]` binds the alias to `base.name`.
    fn from_import(&mut self, node: Node) {
        let base = node
            .child_by_field_name("module_name")
            .map(|module_name| self.import_base(module_name))
            .unwrap_or_default();
        if !base.is_empty() {
            self.module.import_tokens.insert(base.clone());
        }

        if named_children(node)
            .iter()
            .any(|child| child.kind() == "wildcard_import")
        {
            self.module
                .flag(ProhibitedPattern::WildcardImport, line_of(node));
        }

        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let Some((imported, alias)) = self.import_name(name) else {
                continue;
            };
            let target = if base.is_empty() || base.ends_with('.') {
                format!("{}{}", base, imported)
            } else {
                format!("{}.{}", base, imported)
            };
            self.module.imports.insert(alias.unwrap_or(imported), target);
        }
    }

    /// `(dotted name, alias)` of a `dotted_name` or `aliased_import`.
    fn import_name(&self, node: Node) -> Option<(String, Option<String>)> {
        match node.kind() {
            "dotted_name" => Some((squash(self.text(node)), None)),
            "aliased_import" => {
                let name = squash(self.text(node.child_by_field_name("name")?));
                let alias = node
                    .child_by_field_name("alias")
                    .map(|alias| self.text(alias).to_string());
                Some((name, alias))
            }
            _ => None,
        }
    }

    /// Absolute base of a from-import, resolving leading dots against this
    /// module's package.
    fn import_base(&self, module_name: Node) -> String {
        if module_name.kind() != "relative_import" {
            return squash(self.text(module_name));
        }

        let mut level = 0;
        let mut rest = String::new();
        for child in named_children(module_name) {
            match child.kind() {
                "import_prefix" => level = self.text(child).matches('.').count(),
                "dotted_name" => rest = squash(self.text(child)),
                _ => {}
            }
        }
        resolve_relative(
            &self.module.logical_name,
            self.module.is_index(),
            level,
            &rest,
        )
    }

    fn collect_reexports(&mut self, root: Node) {
        let package = self.module.logical_name.clone();

        for (alias, origin) in &self.module.imports {
            self.module
                .reexports
                .insert(format!("{}.{}", package, alias), origin.clone());
        }

        for name in self.public_names(root) {
            let origin = match self.module.imports.get(&name) {
                Some(origin) => origin.clone(),
                None if self.module.member(&name).is_some() => format!("{}.{}", package, name),
                None => continue,
            };
            self.module
                .reexports
                .insert(format!("{}.{}", package, name), origin);
        }
    }

    /// Names listed in a module-level `__all__ = [...]`.
    fn public_names(&self, root: Node) -> Vec<String> {
        let mut names = Vec::new();
        for stmt in named_children(root) {
            if stmt.kind() != "expression_statement" {
                continue;
            }
            let Some(assign) = named_children(stmt).into_iter().next() else {
                continue;
            };
            if assign.kind() != "assignment" {
                continue;
            }
            let is_all = assign
                .child_by_field_name("left")
                .is_some_and(|left| self.text(left) == "__all__");
            let Some(right) = assign.child_by_field_name("right") else {
                continue;
            };
            if !is_all || !matches!(right.kind(), "list" | "tuple") {
                continue;
            }
            names.extend(
                named_children(right)
                    .into_iter()
                    .filter_map(|item| string_literal(item, self.source)),
            );
        }
        names
    }

    // ─── Definitions ────────────────────────────────────────────

    fn process_class(&mut self, class: Node) {
        let Some(name_node) = class.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let local = self.module.push_symbol(SymbolKind::Type, name.clone());
        let body = class.child_by_field_name("body");

        if let Some(symbol) = self.module.symbol_mut(local) {
            symbol.contract = body.and_then(|b| docstring_contract(b, self.source));
        }

        let mut member_names = BTreeSet::new();
        if let Some(body) = body {
            for stmt in named_children(body) {
                let member = unwrap_decorated(stmt);
                if member.kind() != "function_definition" {
                    continue;
                }
                if let Some(member_name) = member.child_by_field_name("name") {
                    member_names.insert(self.text(member_name));
                }
                self.process_function(member, Some(&name));
            }
        }

        if DESCRIPTOR_METHODS.iter().all(|m| member_names.contains(m)) {
            if let Some(symbol) = self.module.symbol_mut(local) {
                symbol.modifiers.insert(Modifier::Descriptor);
            }
            self.module.markers.descriptors.push(local);
        }

        self.detect_class_markers(class, body, local, &name);
    }

    /// Enumeration, error-type and data-shape markers of a class.
    fn detect_class_markers(&mut self, class: Node, body: Option<Node>, local: LocalId, name: &str) {
        let bases = base_names(class, self.source);
        let class_statements: Vec<Node> = body
            .map(|b| {
                named_children(b)
                    .into_iter()
                    .filter(|stmt| stmt.kind() == "expression_statement")
                    .filter_map(|stmt| named_children(stmt).into_iter().next())
                    .filter(|expr| expr.kind() == "assignment")
                    .collect()
            })
            .unwrap_or_default();

        if bases.iter().any(|b| self.table.is_enumeration_base(b)) {
            let keys: Vec<String> = class_statements
                .iter()
                .flat_map(|assign| assignment_targets(*assign))
                .filter(|left| left.kind() == "identifier")
                .map(|left| self.text(left))
                .filter(|key| is_upper(key))
                .map(str::to_string)
                .collect();
            if !keys.is_empty() {
                self.module.markers.enumerations.push(Enumeration {
                    symbol: local,
                    name: name.to_string(),
                    keys,
                });
            }
        }

        if bases.iter().any(|b| self.table.is_error_base(b)) {
            self.module.markers.errors.push(ErrorType {
                symbol: local,
                name: name.to_string(),
                category: "domain".to_string(),
                meaning: "custom exception".to_string(),
            });
        }

        let decorated = decorator_names(class, self.source)
            .iter()
            .any(|d| self.table.is_data_shape_decorator(d));
        let modeled = bases.iter().any(|b| self.table.is_data_shape_base(b));
        if decorated || modeled {
            let fields = class_statements
                .iter()
                .filter_map(|assign| {
                    let left = assign.child_by_field_name("left")?;
                    let ty = assign.child_by_field_name("type")?;
                    if left.kind() != "identifier" {
                        return None;
                    }
                    let ty = squash_spaces(self.text(ty));
                    Some(Field {
                        name: self.text(left).to_string(),
                        ty: if ty.is_empty() { "Any".to_string() } else { ty },
                    })
                })
                .collect();
            self.module.markers.data_shapes.push(DataShape {
                symbol: local,
                name: name.to_string(),
                fields,
            });
        }
    }

    fn process_function(&mut self, def: Node, owner: Option<&str>) -> Option<LocalId> {
        let name = self.text(def.child_by_field_name("name")?);
        let qualified = match owner {
            Some(class) => format!("{}.{}", class, name),
            None => name.to_string(),
        };

        let mut modifiers: BTreeSet<Modifier> = decorator_names(def, self.source)
            .iter()
            .filter_map(|d| self.table.modifier(d))
            .collect();
        if def.child(0).is_some_and(|first| first.kind() == "async") {
            modifiers.insert(Modifier::Async);
        }

        let kind = if owner.is_some() && modifiers.contains(&Modifier::Property) {
            SymbolKind::Property
        } else {
            SymbolKind::Function
        };
        let local = self.module.push_symbol(kind, qualified);
        self.module.record_definition(def.start_byte(), local);
        if kind == SymbolKind::Property {
            self.module.markers.computed_properties.push(local);
        }

        let body = def.child_by_field_name("body");
        let signature = function_signature(def, self.source);
        let raised = body
            .map(|b| raised_exceptions(b, self.source))
            .unwrap_or_default();
        let contract = body.and_then(|b| docstring_contract(b, self.source));
        if let Some(symbol) = self.module.symbol_mut(local) {
            symbol.signature = Some(signature);
            symbol.raised = raised;
            symbol.modifiers = modifiers;
            symbol.contract = contract;
        }

        if def
            .child_by_field_name("parameters")
            .is_some_and(lints::has_mutable_default)
        {
            self.module
                .flag(ProhibitedPattern::MutableDefault, line_of(def));
        }

        let found = routes::extract_routes(def, self.source, local, self.table);
        self.module.markers.routes.extend(found);

        Some(local)
    }
}

// ─── Helpers ────────────────────────────────────────────────────

/// Targets of a valued assignment, chained ones included: `A = B = 1`
/// yields `A` then `B`.
fn assignment_targets(assign: Node) -> Vec<Node> {
    let mut targets = Vec::new();
    let mut current = assign;
    while let (Some(left), Some(right)) = (
        current.child_by_field_name("left"),
        current.child_by_field_name("right"),
    ) {
        targets.push(left);
        if right.kind() != "assignment" {
            break;
        }
        current = right;
    }
    targets
}

/// `(a:T,b,*args,kw:T,**kw)->Ret`, `Any` for a missing return annotation.
pub fn function_signature(def: Node, source: &[u8]) -> String {
    let text = |node: Node| squash_spaces(node_text(node, source));
    let mut params = Vec::new();

    if let Some(parameters) = def.child_by_field_name("parameters") {
        for param in named_children(parameters) {
            let rendered = match param.kind() {
                "identifier" => Some(text(param)),
                "list_splat_pattern" | "dictionary_splat_pattern" => Some(text(param)),
                "typed_parameter" => {
                    let target = named_children(param).into_iter().next();
                    match (target, param.child_by_field_name("type")) {
                        (Some(t), _) if t.kind() != "identifier" => Some(text(t)),
                        (Some(t), Some(ty)) => Some(format!("{}:{}", text(t), text(ty))),
                        (Some(t), None) => Some(text(t)),
                        _ => None,
                    }
                }
                "default_parameter" => param.child_by_field_name("name").map(text),
                "typed_default_parameter" => {
                    match (param.child_by_field_name("name"), param.child_by_field_name("type")) {
                        (Some(n), Some(ty)) => Some(format!("{}:{}", text(n), text(ty))),
                        (Some(n), None) => Some(text(n)),
                        _ => None,
                    }
                }
                _ => None,
            };
            params.extend(rendered);
        }
    }

    let ret = def
        .child_by_field_name("return_type")
        .map(text)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "Any".to_string());
    format!("({})->{}", params.join(","), ret)
}

/// Exception names raised directly in a function body, first-seen order.
///
/// Nested functions, classes and lambdas are not entered.
pub fn raised_exceptions(body: Node, source: &[u8]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    walk_pruned(
        body,
        |node| {
            matches!(
                node.kind(),
                "function_definition" | "class_definition" | "decorated_definition" | "lambda"
            )
        },
        |node| {
            if node.kind() != "raise_statement" {
                return;
            }
            let name = raised_name(node, source);
            if !seen.contains(&name) {
                seen.push(name);
            }
        },
    );
    seen
}

fn raised_name(raise: Node, source: &[u8]) -> String {
    let cause = raise.child_by_field_name("cause").map(|c| c.id());
    let exc = named_children(raise)
        .into_iter()
        .find(|child| child.kind() != "comment" && Some(child.id()) != cause);

    let Some(exc) = exc else {
        return "ReRaise".to_string();
    };
    let named = match exc.kind() {
        "call" => exc
            .child_by_field_name("function")
            .and_then(|f| loose_dotted_name(f, source)),
        "identifier" | "attribute" => loose_dotted_name(exc, source),
        _ => None,
    };
    named.unwrap_or_else(|| "Exception".to_string())
}

/// `requires(X) ∧ ensures(Y)` from `requires:`/`ensures:` docstring lines.
pub fn docstring_contract(body: Node, source: &[u8]) -> Option<String> {
    let first = named_children(body)
        .into_iter()
        .find(|stmt| stmt.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = named_children(first).into_iter().next()?;
    if literal.kind() != "string" {
        return None;
    }
    let doc = strip_quotes(node_text(literal, source));

    let mut requires = None;
    let mut ensures = None;
    for line in doc.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();
        if requires.is_none() && lower.starts_with("requires:") {
            requires = line.get("requires:".len()..).map(|r| r.trim().to_string());
        } else if ensures.is_none() && lower.starts_with("ensures:") {
            ensures = line.get("ensures:".len()..).map(|e| e.trim().to_string());
        }
    }
    let requires = requires.filter(|r| !r.is_empty());
    let ensures = ensures.filter(|e| !e.is_empty());

    match (requires, ensures) {
        (Some(r), Some(e)) => Some(format!("requires({}) ∧ ensures({})", r, e)),
        (Some(r), None) => Some(format!("requires({})", r)),
        (None, Some(e)) => Some(format!("ensures({})", e)),
        (None, None) => None,
    }
}

/// Absolute package for a relative import of `level` dots.
///
/// Dots beyond the package nesting are kept verbatim.
pub fn resolve_relative(logical_name: &str, is_index: bool, level: usize, rest: &str) -> String {
    let mut package: Vec<&str> = logical_name.split('.').filter(|p| !p.is_empty()).collect();
    if !is_index {
        package.pop();
    }

    let up = level.saturating_sub(1);
    if up > package.len() {
        return format!("{}{}", ".".repeat(level), rest);
    }
    package.truncate(package.len() - up);
    if !rest.is_empty() {
        package.push(rest);
    }
    package.join(".")
}

/// Python's `str.isupper`: at least one cased letter, none lower-case.
fn is_upper(name: &str) -> bool {
    name.chars().any(char::is_alphabetic) && !name.chars().any(char::is_lowercase)
}

/// Remove all whitespace (`a . b` → `a.b`).
fn squash(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Collapse whitespace runs to one space.
fn squash_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::MODULE_SYMBOL;

    fn extract(path: &str, source: &str) -> Extraction {
        extract_module(
            1,
            path,
            source,
            &SymgraphConfig::default(),
            &SignatureTable::python(),
        )
    }

    fn names(module: &Module) -> Vec<&str> {
        module
            .symbols
            .iter()
            .map(|s| s.qualified_name.as_str())
            .collect()
    }

    #[test]
    fn test_declaration_order() {
        let source = "\
def top():
    pass

class Service:
    def run(self):
        pass

    @property
    def status(self):
        return 1

def after():
    pass
";
        let ext = extract("pkg/service.py", source);
        assert!(ext.failure.is_none());
        let module = ext.module;
        assert_eq!(
            names(&module),
            vec!["service", "top", "Service", "Service.run", "Service.status", "after"]
        );
        assert_eq!(module.symbols[MODULE_SYMBOL as usize].kind, SymbolKind::Module);
        assert_eq!(module.symbols[2].kind, SymbolKind::Type);
        assert_eq!(module.symbols[4].kind, SymbolKind::Property);
        assert_eq!(module.property("Service.status"), Some(4));
        assert_eq!(module.markers.computed_properties, vec![4]);
    }

    #[test]
    fn test_parse_failure_gives_minimal_module() {
        let ext = extract("c.py", "def (:::\n  garbage ))\n");
        assert!(ext.failure.is_some());
        assert!(ext.module.is_minimal());
        assert_eq!(ext.module.status, ModuleStatus::Failed);
    }

    #[test]
    fn test_unsupported_file() {
        let ext = extract("notes.txt", "anything");
        assert!(ext.failure.is_none());
        assert_eq!(ext.module.status, ModuleStatus::Unsupported);
        assert!(ext.module.is_minimal());
    }

    #[test]
    fn test_signature_format() {
        let source = "\
async def fetch(url: str, retries=3, *args, timeout: float = 1.0, **kw) -> bytes:
    pass

def plain(a, /, b, *, c):
    pass
";
        let module = extract("net.py", source).module;
        assert_eq!(
            module.symbols[1].signature.as_deref(),
            Some("(url:str,retries,*args,timeout:float,**kw)->bytes")
        );
        assert!(module.symbols[1].modifiers.contains(&Modifier::Async));
        assert_eq!(module.symbols[2].signature.as_deref(), Some("(a,b,c)->Any"));
    }

    #[test]
    fn test_shallow_raise_collection() {
        let source = "\
def f(x):
    def g():
        raise X()
    if x:
        raise errors.NotFound(x)
    try:
        pass
    except ValueError:
        raise
    raise errors.NotFound
    raise ValueError('bad') from None
";
        let module = extract("m.py", source).module;
        let f = &module.symbols[1];
        assert_eq!(f.qualified_name, "f");
        assert_eq!(f.raised, vec!["errors.NotFound", "ReRaise", "ValueError"]);
        assert!(!f.raised.contains(&"X".to_string()));
        assert_eq!(module.symbols.len(), 2);
    }

    #[test]
    fn test_contracts() {
        let source = "\
def login(creds):
    \"\"\"Log in.

    Requires: valid(creds)
    ensures: token.exp > now
    \"\"\"

def logout():
    '''ensures: session closed'''

def plain():
    '''Nothing here.'''
";
        let module = extract("auth.py", source).module;
        assert_eq!(
            module.symbols[1].contract.as_deref(),
            Some("requires(valid(creds)) ∧ ensures(token.exp > now)")
        );
        assert_eq!(module.symbols[2].contract.as_deref(), Some("ensures(session closed)"));
        assert_eq!(module.symbols[3].contract, None);
    }

    #[test]
    fn test_class_markers() {
        let source = "\
from dataclasses import dataclass
from enum import Enum
from pydantic import BaseModel

@dataclass(frozen=True)
class Point:
    x: int
    y: float = 0.0
    label = 'p'

class User(BaseModel):
    name: str

class Color(Enum):
    RED = 1
    GREEN = 2
    lower = 3

class NotFoundError(Exception):
    pass

class Lazy:
    def __get__(self, obj, owner): pass
    def __set__(self, obj, value): pass
    def __set_name__(self, owner, name): pass

class Half:
    def __get__(self, obj, owner): pass
";
        let module = extract("models.py", source).module;
        let markers = &module.markers;

        assert_eq!(markers.data_shapes.len(), 2);
        assert_eq!(markers.data_shapes[0].name, "Point");
        let fields: Vec<(&str, &str)> = markers.data_shapes[0]
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.ty.as_str()))
            .collect();
        assert_eq!(fields, vec![("x", "int"), ("y", "float")]);
        assert_eq!(markers.data_shapes[1].name, "User");

        assert_eq!(markers.enumerations.len(), 1);
        assert_eq!(markers.enumerations[0].keys, vec!["RED", "GREEN"]);

        assert_eq!(markers.errors.len(), 1);
        assert_eq!(markers.errors[0].name, "NotFoundError");
        assert_eq!(markers.errors[0].category, "domain");

        let lazy = module.callable("Lazy").unwrap();
        assert_eq!(markers.descriptors, vec![lazy]);
        assert!(module.symbol(lazy).unwrap().modifiers.contains(&Modifier::Descriptor));
    }

    #[test]
    fn test_method_modifiers() {
        let source = "\
import functools

class Repo:
    @staticmethod
    def make(): pass

    @classmethod
    def load(cls): pass

    @functools.cached_property
    def size(self): return 0
";
        let module = extract("store.py", source).module;
        let make = module.symbol(module.callable("Repo.make").unwrap()).unwrap();
        assert!(make.modifiers.contains(&Modifier::StaticMethod));
        let load = module.symbol(module.callable("Repo.load").unwrap()).unwrap();
        assert!(load.modifiers.contains(&Modifier::ClassMethod));
        let size = module.property("Repo.size").unwrap();
        assert_eq!(module.symbol(size).unwrap().kind, SymbolKind::Property);
    }

    #[test]
    fn test_property_accessors_stay_properties() {
        let source = "\
class Service:
    @property
    def status(self):
        return self._status

    @status.setter
    def status(self, value):
        self._status = value

    @status.deleter
    def status(self):
        del self._status
";
        let module = extract("service.py", source).module;
        assert_eq!(module.callable("Service.status"), None);
        assert_eq!(module.property("Service.status"), Some(4));
        assert!(module.symbols[2..]
            .iter()
            .all(|s| s.kind == SymbolKind::Property));
    }

    #[test]
    fn test_redefinition_replaces_lookup() {
        let source = "def f():\n    pass\n\ndef f():\n    return 1\n";
        let tree = parse_source(SourceLanguage::Python, source).unwrap();
        let defs = named_children(tree.root_node());
        let module = extract("m.py", source).module;

        assert_eq!(module.callable("f"), Some(2));
        assert_eq!(module.definition_at(defs[0].start_byte()), Some(1));
        assert_eq!(module.definition_at(defs[1].start_byte()), Some(2));
    }

    #[test]
    fn test_chained_enum_keys() {
        let source = "from enum import Enum\n\nclass Mode(Enum):\n    A = B = 1\n    C = 2\n";
        let module = extract("modes.py", source).module;
        assert_eq!(module.markers.enumerations[0].keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_import_aliases() {
        let source = "\
import os
import os.path as osp
import a.b.c
from pkg.util import helper, other as alias
from . import sibling
from ..core import engine
from x import *
";
        let module = extract("pkg/sub/mod.py", source).module;
        let imports = &module.imports;
        assert_eq!(imports.get("os").map(String::as_str), Some("os"));
        assert_eq!(imports.get("osp").map(String::as_str), Some("os.path"));
        assert_eq!(imports.get("a.b.c").map(String::as_str), Some("a.b.c"));
        assert_eq!(imports.get("helper").map(String::as_str), Some("pkg.util.helper"));
        assert_eq!(imports.get("alias").map(String::as_str), Some("pkg.util.other"));
        assert_eq!(imports.get("sibling").map(String::as_str), Some("pkg.sub.sibling"));
        assert_eq!(imports.get("engine").map(String::as_str), Some("pkg.core.engine"));
        assert!(!imports.contains_key("*"));

        assert!(module.import_tokens.contains("pkg.util"));
        assert!(module.import_tokens.contains("pkg.core"));
        assert!(module.import_tokens.contains("a.b.c"));
        assert!(module
            .prohibited
            .iter()
            .any(|hit| hit.pattern == ProhibitedPattern::WildcardImport));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("pkg.sub.mod", false, 1, "x"), "pkg.sub.x");
        assert_eq!(resolve_relative("pkg.sub", true, 1, "x"), "pkg.sub.x");
        assert_eq!(resolve_relative("pkg.sub.mod", false, 2, ""), "pkg");
        assert_eq!(resolve_relative("mod", false, 2, "x"), "..x");
    }

    #[test]
    fn test_index_reexports() {
        let source = "\
from .core import Engine as Motor
from .util import helper

def local_fn():
    pass

__all__ = ['Motor', 'local_fn', 'missing']
";
        let module = extract("lib/__init__.py", source).module;
        assert_eq!(module.logical_name, "lib");
        assert_eq!(
            module.reexports.get("lib.Motor").map(String::as_str),
            Some("lib.core.Engine")
        );
        assert_eq!(
            module.reexports.get("lib.helper").map(String::as_str),
            Some("lib.util.helper")
        );
        assert_eq!(
            module.reexports.get("lib.local_fn").map(String::as_str),
            Some("lib.local_fn")
        );
        assert!(!module.reexports.contains_key("lib.missing"));
    }

    #[test]
    fn test_non_index_has_no_reexports() {
        let module = extract("lib/mod.py", "from .core import Engine\n").module;
        assert!(module.reexports.is_empty());
    }

    #[test]
    fn test_prohibited_patterns() {
        let source = "\
STATE = {}

def handler(items=[]):
    print(items)
    try:
        eval('1')
    except:
        pass
";
        let module = extract("app/services/user_service.py", source).module;
        let found: Vec<ProhibitedPattern> =
            module.prohibited.iter().map(|hit| hit.pattern).collect();
        assert_eq!(
            found,
            vec![
                ProhibitedPattern::GlobalStateInService,
                ProhibitedPattern::MutableDefault,
                ProhibitedPattern::ConsolePrint,
                ProhibitedPattern::DynamicEval,
                ProhibitedPattern::BareExcept,
            ]
        );

        let module = extract("tests/test_service.py", "def t():\n    print('ok')\n").module;
        assert!(module.prohibited.is_empty());
    }

    #[test]
    fn test_route_markers_attach_to_handler() {
        let source = "\
from fastapi import APIRouter
router = APIRouter()

@router.post('/items')
async def create_item(item):
    pass
";
        let module = extract("api/items.py", source).module;
        assert_eq!(module.markers.routes.len(), 1);
        let route = &module.markers.routes[0];
        assert_eq!(route.verb, "POST");
        assert_eq!(route.path, "/items");
        assert_eq!(route.handler, module.callable("create_item").unwrap());
    }
}
