//! The symbol graph, the final artifact of a build.
//!
//! Holds modules ordered by id, edges in canonical order and the per-file
//! parse failures. Everything is read-only once built.

use chrono::{DateTime, Utc};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use super::types::*;
use crate::error::{ParseFailure, Result};

/// Modules, symbols, markers and edges of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolGraph {
    modules: Vec<Module>,
    edges: Vec<Edge>,
    failures: Vec<ParseFailure>,
    #[serde(skip)]
    by_name: HashMap<String, ModuleId>,
}

impl SymbolGraph {
    /// Assemble a graph. Modules are ordered by id, edges are sorted into
    /// canonical order and de-duplicated, failures are ordered by path.
    pub fn new(mut modules: Vec<Module>, mut edges: Vec<Edge>, mut failures: Vec<ParseFailure>) -> Self {
        modules.sort_by_key(|m| m.id);
        edges.sort();
        edges.dedup();
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        let mut by_name = HashMap::new();
        for module in modules.iter().filter(|m| !m.logical_name.is_empty()) {
            by_name
                .entry(module.logical_name.clone())
                .or_insert(module.id);
        }

        debug!(
            modules = modules.len(),
            edges = edges.len(),
            failures = failures.len(),
            "symbol graph assembled"
        );
        Self {
            modules,
            edges,
            failures,
            by_name,
        }
    }

    // ─── Modules & Symbols ──────────────────────────────────────

    /// All modules, ordered by id.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|i| &self.modules[i])
    }

    /// Look up a module by its dotted logical name.
    pub fn module_by_name(&self, logical_name: &str) -> Option<&Module> {
        self.by_name
            .get(logical_name)
            .and_then(|id| self.module(*id))
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.module(id.module)?.symbol(id.local)
    }

    /// Every symbol, by module id then local id.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.modules.iter().flat_map(|m| m.symbols.iter())
    }

    // ─── Edges ──────────────────────────────────────────────────

    /// All edges in canonical order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges whose source lies in `module`.
    pub fn edges_from(&self, module: ModuleId) -> &[Edge] {
        let start = self.edges.partition_point(|e| e.from.module < module);
        let end = self.edges.partition_point(|e| e.from.module <= module);
        &self.edges[start..end]
    }

    /// Edges leaving one symbol.
    pub fn edges_from_symbol(&self, symbol: SymbolId) -> &[Edge] {
        let start = self.edges.partition_point(|e| e.from < symbol);
        let end = self.edges.partition_point(|e| e.from <= symbol);
        &self.edges[start..end]
    }

    /// Edges arriving at one symbol.
    pub fn edges_to(&self, symbol: SymbolId) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.to == symbol).collect()
    }

    pub fn edges_with(&self, relation: Relation) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.relation == relation)
    }

    // ─── Failures ───────────────────────────────────────────────

    pub fn failures(&self) -> &[ParseFailure] {
        &self.failures
    }

    // ─── Analysis ───────────────────────────────────────────────

    /// Import cycles: strongly connected groups of more than one module,
    /// each sorted by id, ordered by their smallest id.
    pub fn import_cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut graph: DiGraphMap<ModuleId, ()> = DiGraphMap::new();
        for module in &self.modules {
            graph.add_node(module.id);
        }
        for edge in self.edges_with(Relation::Imports) {
            graph.add_edge(edge.from.module, edge.to.module, ());
        }

        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            modules: self.modules.len(),
            edges: self.edges.len(),
            parse_failures: self.failures.len(),
            import_cycles: self.import_cycles().len(),
            ..GraphStats::default()
        };

        for module in &self.modules {
            match module.status {
                ModuleStatus::Analyzed => stats.analyzed += 1,
                ModuleStatus::Failed => stats.failed += 1,
                ModuleStatus::Unsupported => stats.unsupported += 1,
            }
            for symbol in &module.symbols {
                stats.symbols += 1;
                *stats
                    .symbols_by_kind
                    .entry(symbol.kind.to_string())
                    .or_default() += 1;
                if symbol.contract.is_some() {
                    stats.markers.contracts += 1;
                }
            }
            let markers = &module.markers;
            stats.markers.data_shapes += markers.data_shapes.len();
            stats.markers.enumerations += markers.enumerations.len();
            stats.markers.errors += markers.errors.len();
            stats.markers.routes += markers.routes.len();
            stats.markers.descriptors += markers.descriptors.len();
            stats.markers.computed_properties += markers.computed_properties.len();
            for hit in &module.prohibited {
                *stats
                    .prohibited
                    .entry(hit.pattern.rule().to_string())
                    .or_default() += 1;
            }
        }

        for edge in &self.edges {
            match edge.relation {
                Relation::Imports => stats.import_edges += 1,
                Relation::Calls => stats.call_edges += 1,
            }
        }
        stats
    }

    // ─── Output ─────────────────────────────────────────────────

    /// The whole graph with a generation timestamp, ready for JSON.
    pub fn document(&self) -> GraphDocument<'_> {
        GraphDocument {
            generated_at: Utc::now(),
            stats: self.stats(),
            graph: self,
        }
    }

    /// [`document`](Self::document) encoded as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let document = self.document();
        let json = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }

    /// One module with its outgoing edges.
    pub fn module_report(&self, logical_name: &str) -> Option<ModuleReport<'_>> {
        let module = self.module_by_name(logical_name)?;
        Some(ModuleReport {
            module,
            edges: self.edges_from(module.id),
        })
    }
}

// ─── Result Types ───────────────────────────────────────────────

/// Counts of markers by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkerCounts {
    pub data_shapes: usize,
    pub enumerations: usize,
    pub errors: usize,
    pub routes: usize,
    pub descriptors: usize,
    pub computed_properties: usize,
    pub contracts: usize,
}

/// Statistics about the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub modules: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub unsupported: usize,
    pub symbols: usize,
    pub symbols_by_kind: BTreeMap<String, usize>,
    pub edges: usize,
    pub import_edges: usize,
    pub call_edges: usize,
    pub markers: MarkerCounts,
    /// Prohibited-pattern hits by rule.
    pub prohibited: BTreeMap<String, usize>,
    pub parse_failures: usize,
    pub import_cycles: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} modules ({} analyzed, {} failed, {} unsupported)",
            self.modules, self.analyzed, self.failed, self.unsupported
        )?;
        writeln!(f, "{} symbols", self.symbols)?;
        for (kind, count) in &self.symbols_by_kind {
            writeln!(f, "  {:<10} {}", kind, count)?;
        }
        writeln!(
            f,
            "{} edges ({} imports, {} calls)",
            self.edges, self.import_edges, self.call_edges
        )?;
        let m = &self.markers;
        writeln!(
            f,
            "markers: {} data shapes, {} enums, {} errors, {} routes, {} descriptors, {} properties, {} contracts",
            m.data_shapes, m.enumerations, m.errors, m.routes, m.descriptors, m.computed_properties, m.contracts
        )?;
        for (rule, count) in &self.prohibited {
            writeln!(f, "  {:<34} {}", rule, count)?;
        }
        write!(
            f,
            "{} parse failures, {} import cycles",
            self.parse_failures, self.import_cycles
        )
    }
}

/// JSON envelope for a full build.
#[derive(Debug, Serialize)]
pub struct GraphDocument<'g> {
    pub generated_at: DateTime<Utc>,
    pub stats: GraphStats,
    #[serde(flatten)]
    pub graph: &'g SymbolGraph,
}

/// One module and the edges it originates.
#[derive(Debug, Serialize)]
pub struct ModuleReport<'g> {
    pub module: &'g Module,
    pub edges: &'g [Edge],
}
