//! The glint build pipeline.
//!
//! Stages run in a fixed order: the graphics library is compiled (or reused)
//! as a whole per [`LibraryBuilder::cache_key`], project dependencies are
//! compiled incrementally through the object cache, and everything is linked
//! into a web module. [`Orchestrator`] sequences the stages and turns every
//! failure into a [`CompilationResult`].

#![warn(missing_docs)]

pub mod dependency;
pub mod error;
pub mod library;
pub mod link;
pub mod orchestrator;
pub mod profile;
pub mod result;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;

pub use dependency::{DependencyBuilder, DependencyOutput};
pub use error::{BuildError, Stage};
pub use library::{
    clear_library_cache, LibraryBuild, LibraryBuilder, BUILD_STRATEGY_VERSION, COMPLETE_MARKER,
};
pub use link::{LinkRequest, Linker, OBJECT_MANIFEST};
pub use orchestrator::{BuildTarget, Orchestrator};
pub use profile::DriverProfile;
pub use result::CompilationResult;
pub use sources::{LocalSources, SourceProvider};
