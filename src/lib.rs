//! # symgraph
//!
//! Symbol and call-graph extraction for Python source trees.
//!
//! A build runs in two passes. Pass A parses every file in parallel and
//! extracts its symbols, imports and markers. The results are aggregated
//! into a read-only global index, then pass B resolves call sites against
//! that index, again in parallel. Files that fail to parse degrade to a
//! minimal module and are reported; they never abort the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symgraph::build_graph;
//! use std::path::Path;
//!
//! let graph = build_graph(Path::new(".")).unwrap();
//! println!("{}", graph.stats());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod parser;

pub use config::SymgraphConfig;
pub use error::{ParseFailure, Result, SymgraphError};
pub use graph::{
    build_graph, build_graph_from_paths, build_graph_with_config, discover, Edge, GraphStats,
    Module, ModuleStatus, Relation, Symbol, SymbolGraph, SymbolId, SymbolKind,
};
pub use loader::{FileLoader, MemoryLoader, SourceLoader};
pub use parser::SourceLanguage;
