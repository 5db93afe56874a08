//! Per-file object cache for incremental builds.
//!
//! This crate tracks, for every compiled source file, the object it produced,
//! the source's content hash and modification time, and the fingerprint of the
//! settings it was compiled under. An entry is reused only when all of these
//! still agree with the disk and the active settings.

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod index;
pub mod object_cache;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use object_cache::{Miss, ObjectCache};
