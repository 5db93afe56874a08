//! Persisted cache index.
//!
//! The index is stored as `index.json` in the cache directory: a flat JSON
//! array of [`CacheEntry`] records ordered by source path. It is always
//! rewritten whole.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::entry::CacheEntry;
use crate::error::CacheError;

/// Name of the index file within the cache directory.
pub const INDEX_FILE: &str = "index.json";

/// In-memory cache index keyed by source path.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    entries: BTreeMap<PathBuf, CacheEntry>,
}

impl CacheIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the index from the cache directory.
    ///
    /// A missing file is an empty index. An unreadable or malformed file is
    /// logged and also treated as empty; the next write replaces it.
    pub fn load(cache_dir: &Path) -> Self {
        let path = cache_dir.join(INDEX_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache index; starting empty");
                return Self::new();
            }
        };
        match serde_json::from_str::<Vec<CacheEntry>>(&content) {
            Ok(list) => Self {
                entries: list
                    .into_iter()
                    .map(|entry| (entry.source.clone(), entry))
                    .collect(),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache index; starting empty");
                Self::new()
            }
        }
    }

    /// Writes the whole index to the cache directory.
    ///
    /// Creates the cache directory if it doesn't exist.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(INDEX_FILE);
        let list: Vec<&CacheEntry> = self.entries.values().collect();
        let json = serde_json::to_string_pretty(&list).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns the entry for a source file.
    pub fn get(&self, source: &Path) -> Option<&CacheEntry> {
        self.entries.get(source)
    }

    /// Inserts or fully replaces the entry for its source file.
    pub fn insert(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.source.clone(), entry);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in source-path order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }
}
