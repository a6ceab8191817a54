//! Graph builder: discovers source files and runs both passes.
//!
//! Pass A extracts every file in parallel. Collecting its results is the
//! barrier: the global index is built from the complete module set before
//! pass B resolves calls, again in parallel, against that read-only index.

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use super::engine::SymbolGraph;
use super::index::{GlobalIndex, IndexEntry, ModuleIndex};
use super::resolver::{import_edges, CallResolver};
use super::types::{Edge, Module, ModuleStatus};
use crate::config::SymgraphConfig;
use crate::error::{Result, SymgraphError};
use crate::loader::{FileLoader, SourceLoader};
use crate::parser::{extract_module, parse_source, Extraction, SignatureTable, SourceLanguage};

/// Bytes inspected for a NUL when sniffing binary files.
const BINARY_SNIFF_LEN: u64 = 2048;

/// Build a symbol graph for every source file under `root`.
///
/// Reads `.symgraph/config.toml` under the root when present.
pub fn build_graph(root: &Path) -> Result<SymbolGraph> {
    let config = SymgraphConfig::load(&SymgraphConfig::path_for(root));
    build_graph_with_config(root, &config)
}

pub fn build_graph_with_config(root: &Path, config: &SymgraphConfig) -> Result<SymbolGraph> {
    let paths = discover(root, config)?;
    let loader = FileLoader::new(root, config.cache_capacity);
    let graph = build_graph_from_paths(&paths, &loader, config);

    if let Some(stats) = loader.cache_stats() {
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            entries = stats.entries,
            "source cache"
        );
    }
    Ok(graph)
}

/// Build a symbol graph from an explicit set of repository-relative paths.
///
/// Paths are not filtered; unsupported ones become minimal modules and
/// unreadable or unparsable ones are reported in the graph's failures.
pub fn build_graph_from_paths<L>(paths: &[String], loader: &L, config: &SymgraphConfig) -> SymbolGraph
where
    L: SourceLoader + ?Sized,
{
    let index = ModuleIndex::new(paths.iter().cloned());
    let table = SignatureTable::python();
    in_pool(config.workers, || run_passes(&index, loader, config, &table))
}

fn run_passes<L>(
    index: &ModuleIndex,
    loader: &L,
    config: &SymgraphConfig,
    table: &SignatureTable,
) -> SymbolGraph
where
    L: SourceLoader + ?Sized,
{
    // ─── Pass A: extraction ─────────────────────────────────────
    let extractions: Vec<Extraction> = index
        .entries()
        .par_iter()
        .map(|entry| extract_entry(entry, loader, config, table))
        .collect();

    let mut modules = Vec::with_capacity(extractions.len());
    let mut failures = Vec::new();
    for extraction in extractions {
        if let Some(failure) = extraction.failure {
            debug!(path = %failure.path, error = %failure.message, "parse failure");
            failures.push(failure);
        }
        modules.push(extraction.module);
    }
    info!(
        modules = modules.len(),
        failures = failures.len(),
        "extraction complete"
    );

    // ─── Barrier: aggregate ─────────────────────────────────────
    let global = GlobalIndex::new(modules);

    // ─── Pass B: resolution ─────────────────────────────────────
    let resolver = CallResolver::new(&global);
    let edges: Vec<Edge> = global
        .modules()
        .par_iter()
        .flat_map_iter(|module| resolve_entry(module, &resolver, &global, loader))
        .collect();
    info!(edges = edges.len(), "resolution complete");

    SymbolGraph::new(global.into_modules(), edges, failures)
}

fn extract_entry<L>(
    entry: &IndexEntry,
    loader: &L,
    config: &SymgraphConfig,
    table: &SignatureTable,
) -> Extraction
where
    L: SourceLoader + ?Sized,
{
    if SourceLanguage::from_path(&entry.path).is_none() {
        return extract_module(entry.id, &entry.path, "", config, table);
    }
    match loader.load(&entry.path) {
        Ok(source) => extract_module(entry.id, &entry.path, &source, config, table),
        Err(e) => Extraction::failed(entry.id, &entry.path, e),
    }
}

fn resolve_entry<L>(
    module: &Module,
    resolver: &CallResolver<'_>,
    global: &GlobalIndex,
    loader: &L,
) -> Vec<Edge>
where
    L: SourceLoader + ?Sized,
{
    let mut edges = import_edges(module, global);
    if module.status != ModuleStatus::Analyzed {
        return edges;
    }
    let Some(language) = SourceLanguage::from_path(&module.path) else {
        return edges;
    };

    let source = match loader.load(&module.path) {
        Ok(source) => source,
        Err(e) => {
            debug!(path = %module.path, error = %e, "source vanished before resolution");
            return edges;
        }
    };
    match parse_source(language, &source) {
        Ok(tree) => edges.extend(resolver.resolve_module(module, tree.root_node(), source.as_bytes())),
        Err(e) => debug!(path = %module.path, error = %e, "reparse failed"),
    }
    edges
}

/// Run `job` on a dedicated pool of `workers` threads, or on rayon's
/// global pool when `workers` is 0.
fn in_pool<T, F>(workers: usize, job: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    if workers == 0 {
        return job();
    }
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(job),
        Err(e) => {
            warn!(error = %e, "could not build worker pool, using the global one");
            job()
        }
    }
}

// ─── Discovery ──────────────────────────────────────────────────

/// Sorted, `/`-separated, root-relative paths of the supported source
/// files under `root`.
///
/// Respects .gitignore and the configured ignore file, skips hidden
/// entries, files over `max_file_size` and files that look binary.
pub fn discover(root: &Path, config: &SymgraphConfig) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(SymgraphError::InvalidRoot(root.to_path_buf()));
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false);
    if !config.ignore_file.is_empty() {
        builder.add_custom_ignore_filename(&config.ignore_file);
    }

    let mut paths = Vec::new();
    let mut oversized = 0usize;
    let mut binary = 0usize;

    for entry in builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
    {
        let path = entry.path();
        if SourceLanguage::from_path(path).is_none() {
            continue;
        }
        if entry
            .metadata()
            .is_ok_and(|meta| meta.len() > config.max_file_size)
        {
            oversized += 1;
            continue;
        }
        if looks_binary(path) {
            binary += 1;
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            paths.push(to_slash(relative));
        }
    }
    paths.sort();

    debug!(
        files = paths.len(),
        oversized, binary, "discovered source files"
    );
    Ok(paths)
}

/// NUL byte within the first few KiB. Unreadable files are not binary;
/// the loader reports them.
fn looks_binary(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::new();
    if file.take(BINARY_SNIFF_LEN).read_to_end(&mut head).is_err() {
        return false;
    }
    head.contains(&0)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
