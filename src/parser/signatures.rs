//! Recognized marker signatures.
//!
//! Structural markers are detected by matching dotted decorator, base class
//! and call names against a table. New framework conventions are added as
//! table rows; the extractor and resolver never hard-code these names.

use crate::graph::types::Modifier;

/// How a signature matches a dotted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    /// The whole dotted name.
    Exact(&'static str),
    /// A plain string suffix (`pydantic.BaseModel` ends with `BaseModel`).
    Suffix(&'static str),
    /// The last dotted component (`functools.cached_property`).
    Tail(&'static str),
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => name == *exact,
            NamePattern::Suffix(suffix) => name.ends_with(suffix),
            NamePattern::Tail(tail) => name.rsplit('.').next() == Some(*tail),
        }
    }
}

/// What a matching name means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    /// Class decorator marking a structured value type.
    DataShapeDecorator,
    /// Base class marking a structured value type.
    DataShapeBase,
    EnumerationBase,
    ErrorBase,
    /// Route decorator with a fixed verb.
    RouteVerb(&'static str),
    /// Route decorator taking a `methods=[...]` keyword, `GET` by default.
    RouteMethods,
    /// Method decorator contributing a modifier.
    MethodModifier(Modifier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSignature {
    pub pattern: NamePattern,
    pub role: MarkerRole,
}

impl MarkerSignature {
    pub const fn new(pattern: NamePattern, role: MarkerRole) -> Self {
        Self { pattern, role }
    }
}

/// Fixed-verb route decorators (`app`/`router` × verb).
const ROUTE_VERBS: &[(&str, &str)] = &[
    ("app.get", "GET"),
    ("app.post", "POST"),
    ("app.put", "PUT"),
    ("app.delete", "DELETE"),
    ("app.patch", "PATCH"),
    ("router.get", "GET"),
    ("router.post", "POST"),
    ("router.put", "PUT"),
    ("router.delete", "DELETE"),
    ("router.patch", "PATCH"),
];

#[derive(Debug, Clone)]
pub struct SignatureTable {
    entries: Vec<MarkerSignature>,
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::python()
    }
}

impl SignatureTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// dataclasses, pydantic, enum, exceptions, Flask/FastAPI routes and
    /// the builtin method decorators.
    pub fn python() -> Self {
        use MarkerRole::*;
        use NamePattern::*;

        let mut table = Self::empty()
            .with(MarkerSignature::new(Suffix("dataclass"), DataShapeDecorator))
            .with(MarkerSignature::new(Suffix("BaseModel"), DataShapeBase))
            .with(MarkerSignature::new(Suffix("Enum"), EnumerationBase))
            .with(MarkerSignature::new(Suffix("Exception"), ErrorBase))
            .with(MarkerSignature::new(Suffix("Error"), ErrorBase))
            .with(MarkerSignature::new(Suffix(".route"), RouteMethods))
            .with(MarkerSignature::new(Tail("staticmethod"), MethodModifier(Modifier::StaticMethod)))
            .with(MarkerSignature::new(Tail("classmethod"), MethodModifier(Modifier::ClassMethod)))
            .with(MarkerSignature::new(Tail("property"), MethodModifier(Modifier::Property)))
            .with(MarkerSignature::new(Tail("cached_property"), MethodModifier(Modifier::Property)))
            // `@name.setter` and `@name.deleter` accessors of a property
            .with(MarkerSignature::new(Tail("setter"), MethodModifier(Modifier::Property)))
            .with(MarkerSignature::new(Tail("deleter"), MethodModifier(Modifier::Property)));

        for &(name, verb) in ROUTE_VERBS {
            table.push(MarkerSignature::new(Exact(name), RouteVerb(verb)));
        }
        table
    }

    pub fn with(mut self, signature: MarkerSignature) -> Self {
        self.push(signature);
        self
    }

    pub fn push(&mut self, signature: MarkerSignature) {
        self.entries.push(signature);
    }

    /// Roles of every row matching `name`, in table order.
    pub fn roles<'a>(&'a self, name: &'a str) -> impl Iterator<Item = MarkerRole> + 'a {
        self.entries
            .iter()
            .filter(move |sig| sig.pattern.matches(name))
            .map(|sig| sig.role)
    }

    pub fn has_role(&self, name: &str, role: MarkerRole) -> bool {
        self.roles(name).any(|r| r == role)
    }

    pub fn is_data_shape_decorator(&self, name: &str) -> bool {
        self.has_role(name, MarkerRole::DataShapeDecorator)
    }

    pub fn is_data_shape_base(&self, name: &str) -> bool {
        self.has_role(name, MarkerRole::DataShapeBase)
    }

    pub fn is_enumeration_base(&self, name: &str) -> bool {
        self.has_role(name, MarkerRole::EnumerationBase)
    }

    pub fn is_error_base(&self, name: &str) -> bool {
        self.has_role(name, MarkerRole::ErrorBase)
    }

    /// Route role of a decorator callee, if any.
    pub fn route_role(&self, name: &str) -> Option<MarkerRole> {
        self.roles(name)
            .find(|role| matches!(role, MarkerRole::RouteVerb(_) | MarkerRole::RouteMethods))
    }

    /// Modifiers contributed by a method decorator.
    pub fn modifier(&self, name: &str) -> Option<Modifier> {
        self.roles(name).find_map(|role| match role {
            MarkerRole::MethodModifier(modifier) => Some(modifier),
            _ => None,
        })
    }
}
