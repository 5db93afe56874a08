//! Shared foundational types used across the glint build core.
//!
//! This crate provides the fingerprint engine: content hashing of source files
//! and a canonical, order-independent digest of a compilation-settings bundle.

#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod hash;

pub use error::FingerprintError;
pub use fingerprint::{hash_file, hash_settings, SettingsBundle, SettingsFingerprint};
pub use hash::ContentHash;
