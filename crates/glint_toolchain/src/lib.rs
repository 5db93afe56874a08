//! Compiler process invocation.
//!
//! The build stages never spawn processes directly. They go through the
//! [`Toolchain`] trait, implemented for real runs by [`ProcessToolchain`] and
//! by recording fakes in tests.

#![warn(missing_docs)]

pub mod error;
pub mod invoke;
pub mod process;

pub use error::InvokeError;
pub use invoke::{InvokeOptions, InvokeOutput, Toolchain};
pub use process::ProcessToolchain;
