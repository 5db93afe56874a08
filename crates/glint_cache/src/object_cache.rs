//! Per-source object cache.
//!
//! The `ObjectCache` owns one directory: the persisted index plus the object
//! files compiled into it. Validation is layered. Cheap checks (entry present,
//! settings match, files exist, mtime unchanged) run first; the content hash
//! is only computed once the mtime already agrees, as the authoritative guard
//! against copies and checkouts that preserve timestamps.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use glint_common::{hash_file, SettingsFingerprint};
use tracing::{debug, warn};

use crate::entry::{modified_ms, CacheEntry};
use crate::error::CacheError;
use crate::index::CacheIndex;

/// Why a cache entry could not be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// No entry was ever recorded for the source.
    NoEntry,
    /// The entry was compiled under different settings.
    SettingsChanged,
    /// The recorded object file is gone.
    ArtifactMissing,
    /// The source file is gone.
    SourceMissing,
    /// The source modification time differs.
    MtimeChanged,
    /// The source content differs.
    ContentChanged,
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Miss::NoEntry => "no entry",
            Miss::SettingsChanged => "settings changed",
            Miss::ArtifactMissing => "artifact missing",
            Miss::SourceMissing => "source missing",
            Miss::MtimeChanged => "mtime changed",
            Miss::ContentChanged => "content changed",
        };
        f.write_str(s)
    }
}

/// Incremental-build bookkeeping for one project's compiled sources.
pub struct ObjectCache {
    /// Directory holding the index and the cached objects.
    dir: PathBuf,

    /// In-memory copy of the persisted index.
    index: CacheIndex,

    /// Fingerprint of the settings currently in effect.
    fingerprint: SettingsFingerprint,
}

impl ObjectCache {
    /// Opens the cache in `dir`, eagerly loading its index.
    ///
    /// Never fails: a missing or corrupt index yields an empty cache.
    pub fn open(dir: &Path, fingerprint: SettingsFingerprint) -> Self {
        let index = CacheIndex::load(dir);
        debug!(dir = %dir.display(), entries = index.len(), "opened object cache");
        Self {
            dir: dir.to_path_buf(),
            index,
            fingerprint,
        }
    }

    /// The managed directory; objects compiled for this cache belong here.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The settings fingerprint entries are validated against.
    pub fn fingerprint(&self) -> &SettingsFingerprint {
        &self.fingerprint
    }

    /// Switches the active settings fingerprint.
    pub fn set_fingerprint(&mut self, fingerprint: SettingsFingerprint) {
        self.fingerprint = fingerprint;
    }

    /// Checks the entry for `source`, returning the first reason it is stale.
    pub fn check(&self, source: &Path) -> Result<&CacheEntry, Miss> {
        let entry = self.index.get(source).ok_or(Miss::NoEntry)?;

        if let Some(recorded) = &entry.settings_fingerprint {
            if *recorded != self.fingerprint {
                return Err(Miss::SettingsChanged);
            }
        }
        if !entry.artifact.is_file() {
            return Err(Miss::ArtifactMissing);
        }
        if !source.is_file() {
            return Err(Miss::SourceMissing);
        }
        match modified_ms(source) {
            Ok(mtime) if mtime == entry.mtime_ms => {}
            Ok(_) => return Err(Miss::MtimeChanged),
            Err(_) => return Err(Miss::SourceMissing),
        }
        match hash_file(source) {
            Ok(hash) if hash == entry.content_hash => Ok(entry),
            Ok(_) => Err(Miss::ContentChanged),
            Err(_) => Err(Miss::SourceMissing),
        }
    }

    /// Returns `true` if the cached object for `source` can be reused.
    pub fn is_valid(&self, source: &Path) -> bool {
        match self.check(source) {
            Ok(_) => true,
            Err(miss) => {
                debug!(source = %source.display(), reason = %miss, "object cache miss");
                false
            }
        }
    }

    /// Returns the cached object path if the entry is valid.
    pub fn get_artifact(&self, source: &Path) -> Option<PathBuf> {
        self.check(source).ok().map(|entry| entry.artifact.clone())
    }

    /// Returns source → object for the subset of `sources` that is valid.
    pub fn get_valid_entries(&self, sources: &[PathBuf]) -> HashMap<PathBuf, PathBuf> {
        sources
            .iter()
            .filter_map(|source| {
                self.get_artifact(source)
                    .map(|artifact| (source.clone(), artifact))
            })
            .collect()
    }

    /// Records a successful compile and persists the whole index immediately.
    pub fn record_build(&mut self, source: &Path, artifact: &Path) -> Result<(), CacheError> {
        let content_hash = hash_file(source)?;
        let mtime_ms = modified_ms(source).map_err(|e| CacheError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.index.insert(CacheEntry {
            source: source.to_path_buf(),
            artifact: artifact.to_path_buf(),
            content_hash,
            mtime_ms,
            settings_fingerprint: Some(self.fingerprint.clone()),
        });
        self.index.save(&self.dir)
    }

    /// Empties the index and deletes every file directly inside the cache directory.
    ///
    /// Deletion is best-effort: failures are logged and leftover files are
    /// simply never referenced by the (now empty) index.
    pub fn clear(&mut self) {
        self.index.clear();

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "could not list object cache");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "could not delete cached file");
            }
        }
    }

    /// Number of recorded entries, valid or not.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates recorded entries in source-path order.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.index.iter()
    }
}
