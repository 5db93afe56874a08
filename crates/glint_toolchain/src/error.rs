//! Error types for toolchain invocation.

use std::path::PathBuf;
use std::time::Duration;

use crate::invoke::InvokeOutput;

/// A failed toolchain run.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The process could not be started (missing executable, permissions).
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        /// The program that was invoked.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("{} exited with {}", program.display(), describe_code(*code))]
    Exit {
        /// The program that was invoked.
        program: PathBuf,
        /// The exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Output captured before exit.
        output: InvokeOutput,
    },

    /// The process exceeded its time limit and was killed.
    #[error("{} timed out after {limit:?}", program.display())]
    Timeout {
        /// The program that was invoked.
        program: PathBuf,
        /// The limit that was exceeded.
        limit: Duration,
        /// Output captured before the process was killed.
        output: InvokeOutput,
    },

    /// The runtime could not be created, or waiting on a started process failed.
    #[error("toolchain runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

impl InvokeError {
    /// Output captured before the failure, if the process ran at all.
    pub fn output(&self) -> Option<&InvokeOutput> {
        match self {
            InvokeError::Exit { output, .. } | InvokeError::Timeout { output, .. } => Some(output),
            InvokeError::Spawn { .. } | InvokeError::Runtime(_) => None,
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
