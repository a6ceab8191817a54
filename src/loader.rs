//! Source unit loading.
//!
//! Both passes read every file. [`FileLoader`] puts a bounded LRU cache in
//! front of the filesystem so the resolve pass usually hits memory.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, SymgraphError};

/// Produces the text of a repository-relative path.
pub trait SourceLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Arc<str>>;
}

/// Hit/miss counters of a [`ContentCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe LRU cache of file contents.
pub struct ContentCache {
    entries: Mutex<LruCache<String, Arc<str>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContentCache {
    /// `None` when `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let found = self.entries.lock().get(key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn put(&self, key: String, value: Arc<str>) {
        self.entries.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Reads files under a root directory.
pub struct FileLoader {
    root: PathBuf,
    cache: Option<ContentCache>,
}

impl FileLoader {
    pub fn new(root: impl AsRef<Path>, cache_capacity: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache: ContentCache::new(cache_capacity),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ContentCache::stats)
    }
}

impl SourceLoader for FileLoader {
    fn load(&self, path: &str) -> Result<Arc<str>> {
        if let Some(text) = self.cache.as_ref().and_then(|c| c.get(path)) {
            return Ok(text);
        }

        let full = self.root.join(path);
        let bytes = fs::read(&full).map_err(|source| SymgraphError::Io { path: full, source })?;
        let text: Arc<str> = Arc::from(String::from_utf8_lossy(&bytes).as_ref());

        if let Some(cache) = &self.cache {
            cache.put(path.to_string(), Arc::clone(&text));
        }
        Ok(text)
    }
}

/// In-memory sources, keyed by repository-relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: BTreeMap<String, Arc<str>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, text: &str) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: &str) {
        self.files.insert(path.into(), Arc::from(text));
    }

    /// All known paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<Arc<str>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SymgraphError::SourceNotFound(path.to_string()))
    }
}
