//! Real process execution on a private tokio runtime.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::InvokeError;
use crate::invoke::{InvokeOptions, InvokeOutput, Toolchain};

/// How long to keep draining pipes after killing a timed-out process.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Spawns the compiler as a child process.
///
/// Each call builds a current-thread runtime, so the type can be used from
/// plain threads (including rayon workers) without an ambient executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessToolchain;

impl ProcessToolchain {
    /// Creates a process-backed toolchain.
    pub fn new() -> Self {
        Self
    }
}

impl Toolchain for ProcessToolchain {
    fn invoke(
        &self,
        program: &Path,
        args: &[String],
        options: &InvokeOptions,
    ) -> Result<InvokeOutput, InvokeError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(InvokeError::Runtime)?;
        rt.block_on(run(program, args, options))
    }
}

async fn run(
    program: &Path,
    args: &[String],
    options: &InvokeOptions,
) -> Result<InvokeOutput, InvokeError> {
    debug!(
        program = %program.display(),
        args = args.len(),
        cwd = ?options.cwd,
        "invoking toolchain"
    );
    let started = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(|source| InvokeError::Spawn {
        program: program.to_path_buf(),
        source,
    })?;

    let cap = options.max_output_bytes;
    let stdout = tokio::spawn(read_capped(child.stdout.take(), cap));
    let stderr = tokio::spawn(read_capped(child.stderr.take(), cap));

    let waited = match options.timeout {
        Some(limit) => timeout(limit, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    let status = match waited {
        Some(Ok(status)) => status,
        Some(Err(source)) => return Err(InvokeError::Runtime(source)),
        None => {
            let limit = options.timeout.unwrap_or_default();
            warn!(program = %program.display(), ?limit, "toolchain timed out; killing");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out toolchain process");
            }
            let output = InvokeOutput {
                stdout: drain(stdout, Some(DRAIN_GRACE)).await,
                stderr: drain(stderr, Some(DRAIN_GRACE)).await,
            };
            return Err(InvokeError::Timeout {
                program: program.to_path_buf(),
                limit,
                output,
            });
        }
    };

    let output = InvokeOutput {
        stdout: drain(stdout, None).await,
        stderr: drain(stderr, None).await,
    };
    debug!(
        program = %program.display(),
        code = ?status.code(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "toolchain finished"
    );

    if status.success() {
        Ok(output)
    } else {
        Err(InvokeError::Exit {
            program: program.to_path_buf(),
            code: status.code(),
            output,
        })
    }
}

/// Reads a stream to EOF, keeping at most `limit` bytes.
///
/// The pipe is drained past the limit so the child never blocks on a full pipe.
async fn read_capped<R>(reader: Option<R>, limit: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut kept = Vec::new();
    let Some(mut reader) = reader else {
        return kept;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    kept
}

/// Awaits a reader task, optionally giving up after `grace`.
///
/// A grandchild that inherited the pipe can keep it open after the child is
/// killed; the grace period bounds how long we wait for it.
async fn drain(handle: JoinHandle<Vec<u8>>, grace: Option<Duration>) -> String {
    let bytes = match grace {
        Some(grace) => {
            let abort = handle.abort_handle();
            match timeout(grace, handle).await {
                Ok(joined) => joined.unwrap_or_default(),
                Err(_) => {
                    abort.abort();
                    Vec::new()
                }
            }
        }
        None => handle.await.unwrap_or_default(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}
