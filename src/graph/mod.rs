//! Symbol graph: data model, indexes, call resolution and the two-pass
//! builder that ties them together.

pub mod builder;
pub mod engine;
pub mod index;
pub mod resolver;
pub mod types;

pub use builder::{build_graph, build_graph_from_paths, build_graph_with_config, discover};
pub use engine::{GraphDocument, GraphStats, MarkerCounts, ModuleReport, SymbolGraph};
pub use index::{GlobalIndex, IndexEntry, ModuleIndex};
pub use resolver::{expand_alias, import_edges, CallResolver};
pub use types::{
    DataShape, Edge, Enumeration, ErrorType, Field, LocalId, Markers, Modifier, Module, ModuleId,
    ModuleStatus, PatternHit, ProhibitedPattern, Relation, Route, Symbol, SymbolId, SymbolKind,
    MODULE_SYMBOL,
};
