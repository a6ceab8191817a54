//! Core types for the symbol graph.
//!
//! Defines symbol kinds, edge relations, markers and the per-module record
//! produced by extraction. Symbols refer to their module by id only, so the
//! whole graph serializes without back-references.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Module identifier, assigned in sorted path order starting at 1.
pub type ModuleId = u32;
/// Symbol identifier within one module.
pub type LocalId = u32;

/// Local id reserved for a module's own pseudo-symbol.
pub const MODULE_SYMBOL: LocalId = 0;

/// Globally unique symbol identity: `(module, local)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId {
    pub module: ModuleId,
    pub local: LocalId,
}

impl SymbolId {
    pub fn new(module: ModuleId, local: LocalId) -> Self {
        Self { module, local }
    }

    /// The pseudo-symbol standing for a whole module.
    pub fn module(module: ModuleId) -> Self {
        Self::new(module, MODULE_SYMBOL)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.local)
    }
}

/// The kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// The module pseudo-symbol (local id 0).
    Module,
    /// A class definition.
    Type,
    /// A function or method.
    Function,
    /// A method exposed as an attribute (`@property`, `@cached_property`).
    Property,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Module => write!(f, "module"),
            SymbolKind::Type => write!(f, "type"),
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Property => write!(f, "property"),
        }
    }
}

/// Modifiers carried by a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    StaticMethod,
    ClassMethod,
    Property,
    Async,
    Descriptor,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::StaticMethod => write!(f, "staticmethod"),
            Modifier::ClassMethod => write!(f, "classmethod"),
            Modifier::Property => write!(f, "property"),
            Modifier::Async => write!(f, "async"),
            Modifier::Descriptor => write!(f, "descriptor"),
        }
    }
}

/// One named definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
    /// `name` for top-level definitions, `Type.member` for members, the
    /// file stem for the module pseudo-symbol.
    pub qualified_name: String,
    /// `(a:T,b,*args,**kw)->Ret` for functions and methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Raised exception names in first-seen order, without duplicates.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub raised: Vec<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub modifiers: BTreeSet<Modifier>,
    /// `requires(X) ∧ ensures(Y)` parsed from the docstring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl Symbol {
    pub fn new(id: SymbolId, kind: SymbolKind, qualified_name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            qualified_name: qualified_name.into(),
            signature: None,
            raised: Vec::new(),
            modifiers: BTreeSet::new(),
            contract: None,
        }
    }
}

// ─── Markers ────────────────────────────────────────────────────

/// A field of a structured value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Declared annotation text, `Any` when absent.
    #[serde(rename = "type")]
    pub ty: String,
}

/// A structured value type (dataclass, pydantic model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataShape {
    pub symbol: LocalId,
    pub name: String,
    pub fields: Vec<Field>,
}

/// An enumeration and its upper-case constant keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    pub symbol: LocalId,
    pub name: String,
    pub keys: Vec<String>,
}

/// A project-defined exception type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorType {
    pub symbol: LocalId,
    pub name: String,
    pub category: String,
    pub meaning: String,
}

/// An HTTP route bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Upper-case HTTP verb.
    pub verb: String,
    pub path: String,
    pub handler: LocalId,
}

/// Structural facts collected for one module, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    pub data_shapes: Vec<DataShape>,
    pub enumerations: Vec<Enumeration>,
    pub errors: Vec<ErrorType>,
    pub routes: Vec<Route>,
    /// Types implementing `__get__`, `__set__` and `__set_name__`.
    pub descriptors: Vec<LocalId>,
    /// Methods re-tagged as attribute-like accessors.
    pub computed_properties: Vec<LocalId>,
}

impl Markers {
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Total number of markers of every kind.
    pub fn count(&self) -> usize {
        self.data_shapes.len()
            + self.enumerations.len()
            + self.errors.len()
            + self.routes.len()
            + self.descriptors.len()
            + self.computed_properties.len()
    }
}

// ─── Prohibited patterns ────────────────────────────────────────

/// Code patterns flagged during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProhibitedPattern {
    WildcardImport,
    MutableDefault,
    BareExcept,
    DynamicEval,
    ConsolePrint,
    GlobalStateInService,
}

impl ProhibitedPattern {
    pub fn rule(&self) -> &'static str {
        match self {
            ProhibitedPattern::WildcardImport => "forbid wildcard import",
            ProhibitedPattern::MutableDefault => "forbid mutable default arguments",
            ProhibitedPattern::BareExcept => "forbid bare except",
            ProhibitedPattern::DynamicEval => "forbid eval/exec",
            ProhibitedPattern::ConsolePrint => "forbid print in production",
            ProhibitedPattern::GlobalStateInService => "forbid global state in svc",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ProhibitedPattern::WildcardImport => "namespace",
            ProhibitedPattern::MutableDefault => "bug-risk",
            ProhibitedPattern::BareExcept => "error-handling",
            ProhibitedPattern::DynamicEval => "security",
            ProhibitedPattern::ConsolePrint => "logging",
            ProhibitedPattern::GlobalStateInService => "concurrency",
        }
    }
}

impl fmt::Display for ProhibitedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.rule(), self.category())
    }
}

/// One occurrence of a prohibited pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternHit {
    pub pattern: ProhibitedPattern,
    /// 1-indexed line of the offending construct.
    pub line: usize,
}

// ─── Edges ──────────────────────────────────────────────────────

/// The relation carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Module pseudo-symbol imports another module pseudo-symbol.
    Imports,
    /// Function or method calls another symbol.
    Calls,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Imports => write!(f, "imports"),
            Relation::Calls => write!(f, "calls"),
        }
    }
}

/// A directed relation between two symbols.
///
/// The derived ordering is the canonical one: source module, source local
/// id, target, then relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: SymbolId,
    pub to: SymbolId,
    pub relation: Relation,
}

impl Edge {
    pub fn calls(from: SymbolId, to: SymbolId) -> Self {
        Self {
            from,
            to,
            relation: Relation::Calls,
        }
    }

    pub fn imports(from: ModuleId, to: ModuleId) -> Self {
        Self {
            from: SymbolId::module(from),
            to: SymbolId::module(to),
            relation: Relation::Imports,
        }
    }
}

// ─── Modules ────────────────────────────────────────────────────

/// How far extraction got for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Fully extracted.
    Analyzed,
    /// Could not be read or parsed; pseudo-symbol only.
    Failed,
    /// No grammar for this file type; pseudo-symbol only.
    Unsupported,
}

/// One source file's extracted record.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub id: ModuleId,
    /// Repository-relative, `/`-separated.
    pub path: String,
    /// Dotted name derived from the path.
    pub logical_name: String,
    pub role_tags: BTreeSet<String>,
    pub status: ModuleStatus,
    /// Ordered by local id; index `i` holds local id `i`.
    pub symbols: Vec<Symbol>,
    /// Bound local name → target logical name.
    pub imports: BTreeMap<String, String>,
    /// Raw import targets (`a.b` for `import a.b`, the base for from-imports).
    pub import_tokens: BTreeSet<String>,
    /// `package.alias` → origin logical name. Only index files carry any.
    pub reexports: BTreeMap<String, String>,
    pub markers: Markers,
    pub prohibited: Vec<PatternHit>,
    #[serde(skip)]
    callables: HashMap<String, LocalId>,
    #[serde(skip)]
    properties: HashMap<String, LocalId>,
    /// Start byte of a `function_definition` → its local id.
    #[serde(skip)]
    definitions: HashMap<usize, LocalId>,
}

impl Module {
    /// A minimal module holding only its pseudo-symbol.
    pub fn new(id: ModuleId, path: impl Into<String>) -> Self {
        let path = path.into();
        let pseudo = Symbol::new(SymbolId::module(id), SymbolKind::Module, path_stem(&path));
        Self {
            id,
            logical_name: logical_name_for(&path),
            role_tags: role_tags_for(&path),
            path,
            status: ModuleStatus::Analyzed,
            symbols: vec![pseudo],
            imports: BTreeMap::new(),
            import_tokens: BTreeSet::new(),
            reexports: BTreeMap::new(),
            markers: Markers::default(),
            prohibited: Vec::new(),
            callables: HashMap::new(),
            properties: HashMap::new(),
            definitions: HashMap::new(),
        }
    }

    /// The minimal form of a module whose extraction did not happen.
    pub fn degraded(id: ModuleId, path: impl Into<String>, status: ModuleStatus) -> Self {
        let mut module = Self::new(id, path);
        module.status = status;
        module
    }

    /// Append a symbol and return its local id.
    ///
    /// Property-kind symbols land in the property map, everything but the
    /// pseudo-symbol lands in the callable map. A later definition with the
    /// same qualified name replaces the earlier one in its map.
    pub fn push_symbol(&mut self, kind: SymbolKind, qualified_name: impl Into<String>) -> LocalId {
        let local = self.symbols.len() as LocalId;
        let symbol = Symbol::new(SymbolId::new(self.id, local), kind, qualified_name);
        match kind {
            SymbolKind::Property => {
                self.properties.insert(symbol.qualified_name.clone(), local);
            }
            SymbolKind::Type | SymbolKind::Function => {
                self.callables.insert(symbol.qualified_name.clone(), local);
            }
            SymbolKind::Module => {}
        }
        self.symbols.push(symbol);
        local
    }

    pub fn symbol(&self, local: LocalId) -> Option<&Symbol> {
        self.symbols.get(local as usize)
    }

    pub fn symbol_mut(&mut self, local: LocalId) -> Option<&mut Symbol> {
        self.symbols.get_mut(local as usize)
    }

    /// Look up a type, function or method by qualified name.
    pub fn callable(&self, name: &str) -> Option<LocalId> {
        self.callables.get(name).copied()
    }

    /// Look up a property-kind member by qualified name.
    pub fn property(&self, name: &str) -> Option<LocalId> {
        self.properties.get(name).copied()
    }

    /// Callables first, then properties.
    pub fn member(&self, name: &str) -> Option<LocalId> {
        self.callable(name).or_else(|| self.property(name))
    }

    /// Bind a function definition, keyed by its start byte, to its symbol.
    pub fn record_definition(&mut self, start_byte: usize, local: LocalId) {
        self.definitions.insert(start_byte, local);
    }

    /// The symbol extracted from the definition starting at `start_byte`.
    pub fn definition_at(&self, start_byte: usize) -> Option<LocalId> {
        self.definitions.get(&start_byte).copied()
    }

    pub fn is_index(&self) -> bool {
        self.path == "__init__.py" || self.path.ends_with("/__init__.py")
    }

    /// Only the pseudo-symbol exists.
    pub fn is_minimal(&self) -> bool {
        self.symbols.len() == 1
    }

    pub fn flag(&mut self, pattern: ProhibitedPattern, line: usize) {
        self.prohibited.push(PatternHit { pattern, line });
    }
}

// ─── Path helpers ───────────────────────────────────────────────

/// Dotted logical name: `pkg/sub/mod.py` → `pkg.sub.mod`,
/// `pkg/__init__.py` → `pkg`, root `__init__.py` → empty.
pub fn logical_name_for(path: &str) -> String {
    let trimmed = match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    };
    let mut parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    if parts.last() == Some(&"__init__") {
        parts.pop();
    }
    parts.join(".")
}

/// File name without directory or extension.
pub fn path_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name.to_string(),
        Some(dot) => name[..dot].to_string(),
    }
}

/// Role tags from path substrings; `mod` when nothing matches.
pub fn role_tags_for(path: &str) -> BTreeSet<String> {
    const ROLES: &[(&str, &str)] = &[
        ("test", "test"),
        ("auth", "auth"),
        ("api", "api"),
        ("repository", "repo"),
        ("repo", "repo"),
        ("service", "svc"),
        ("svc", "svc"),
    ];

    let lower = path.to_lowercase();
    let mut tags: BTreeSet<String> = ROLES
        .iter()
        .filter(|(needle, _)| lower.contains(needle))
        .map(|(_, tag)| tag.to_string())
        .collect();
    if tags.is_empty() {
        tags.insert("mod".to_string());
    }
    tags
}
