//! Module numbering and the repository-wide index.
//!
//! [`ModuleIndex`] fixes ids before any parallel work starts.
//! [`GlobalIndex`] is built once every extraction has finished and is only
//! read afterwards.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::types::{logical_name_for, path_stem, Module, ModuleId, Symbol, SymbolId};

/// One entry of the module index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ModuleId,
    pub path: String,
    pub logical_name: String,
}

/// Sorted, de-duplicated paths numbered from 1.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    entries: Vec<IndexEntry>,
}

impl ModuleIndex {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut paths: Vec<String> = paths
            .into_iter()
            .map(|p| p.into().replace('\\', "/"))
            .collect();
        paths.sort();
        paths.dedup();

        let entries = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| IndexEntry {
                id: i as ModuleId + 1,
                logical_name: logical_name_for(&path),
                path,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id_of(&self, path: &str) -> Option<ModuleId> {
        self.entries
            .binary_search_by(|entry| entry.path.as_str().cmp(path))
            .ok()
            .map(|i| self.entries[i].id)
    }
}

/// Merged view over every extracted module.
#[derive(Debug, Default)]
pub struct GlobalIndex {
    /// Ordered by id.
    modules: Vec<Module>,
    by_name: HashMap<String, ModuleId>,
    by_stem: HashMap<String, Vec<ModuleId>>,
    reexports: BTreeMap<String, String>,
}

impl GlobalIndex {
    /// Aggregate extracted modules. The input order does not matter.
    ///
    /// When two modules share a logical name, or two index files claim the
    /// same re-export key, the one with the lower id wins.
    pub fn new(mut modules: Vec<Module>) -> Self {
        modules.sort_by_key(|m| m.id);

        let mut by_name = HashMap::new();
        let mut by_stem: HashMap<String, Vec<ModuleId>> = HashMap::new();
        let mut reexports = BTreeMap::new();

        for module in &modules {
            if !module.logical_name.is_empty() {
                by_name
                    .entry(module.logical_name.clone())
                    .or_insert(module.id);
            }
            by_stem
                .entry(path_stem(&module.path))
                .or_default()
                .push(module.id);
            for (key, origin) in &module.reexports {
                reexports
                    .entry(key.clone())
                    .or_insert_with(|| origin.clone());
            }
        }

        debug!(
            modules = modules.len(),
            names = by_name.len(),
            reexports = reexports.len(),
            "aggregated module index"
        );

        Self {
            modules,
            by_name,
            by_stem,
            reexports,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn into_modules(self) -> Vec<Module> {
        self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|i| &self.modules[i])
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.module(id.module)?.symbol(id.local)
    }

    /// Exact logical-name lookup.
    pub fn by_name(&self, logical_name: &str) -> Option<&Module> {
        self.by_name
            .get(logical_name)
            .and_then(|id| self.module(*id))
    }

    /// First module (in path order) whose file stem is `stem`.
    pub fn by_stem(&self, stem: &str) -> Option<&Module> {
        self.by_stem
            .get(stem)
            .and_then(|ids| ids.first())
            .and_then(|id| self.module(*id))
    }

    /// Exact match, else the stem of the last dotted component.
    pub fn resolve_token(&self, token: &str) -> Option<&Module> {
        if token.is_empty() {
            return None;
        }
        self.by_name(token).or_else(|| {
            let last = token.rsplit('.').next().unwrap_or(token);
            if last.is_empty() {
                None
            } else {
                self.by_stem(last)
            }
        })
    }

    pub fn reexport(&self, qualified: &str) -> Option<&str> {
        self.reexports.get(qualified).map(String::as_str)
    }

    pub fn reexports(&self) -> &BTreeMap<String, String> {
        &self.reexports
    }

    /// The most specific module whose logical name prefixes `dotted`, with
    /// the remaining components.
    pub fn longest_prefix<'d>(&self, dotted: &'d str) -> Option<(&Module, Vec<&'d str>)> {
        let parts: Vec<&str> = dotted.split('.').collect();
        (1..=parts.len()).rev().find_map(|n| {
            let candidate = parts[..n].join(".");
            self.by_name(&candidate)
                .map(|module| (module, parts[n..].to_vec()))
        })
    }
}
