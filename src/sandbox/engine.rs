//! Execution engine boundary
//!
//! The engine is whatever isolated interpreter actually runs the assembled
//! program. The harness only needs one call: run this text, tell me the
//! status and what was captured. [`CommandEngine`] implements it by piping
//! the program into an external interpreter process.

use futures::future::BoxFuture;
use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Success,
    Error,
}

/// What the engine reports back for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub status: EngineStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl EngineReport {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Success,
            stdout: Some(stdout.into()),
            stderr: None,
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Error,
            stdout: None,
            stderr: Some(stderr.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start execution engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to communicate with the execution engine: {0}")]
    Io(#[from] io::Error),
    #[error("execution was cancelled")]
    Cancelled,
}

/// An isolated runtime able to execute an assembled program.
///
/// Implementations must stop work and release the runtime once `cancel`
/// fires or the returned future is dropped.
pub trait ExecutionEngine: Send + Sync {
    fn execute<'a>(
        &'a self,
        program: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<EngineReport, EngineError>>;
}

/// Runs programs by writing them to the stdin of an interpreter process.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    async fn run(
        &self,
        program: &str,
        cancel: CancellationToken,
    ) -> Result<EngineReport, EngineError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("engine stdin was not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("engine stderr was not captured"))?;

        // Owns the child: dropping this future (cancellation or timeout)
        // kills the process.
        let exchange = async move {
            let write = async move {
                stdin.write_all(program.as_bytes()).await?;
                stdin.shutdown().await
            };
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (written, read_out, read_err) = tokio::join!(
                write,
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err)
            );
            if let Err(e) = written {
                // The interpreter may exit before consuming all input.
                debug!(error = %e, "engine closed stdin early");
            }
            read_out?;
            read_err?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, out, err))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
            result = exchange => {
                let (status, out, err) = result?;
                debug!(exit = ?status.code(), "engine process finished");
                Ok(EngineReport {
                    status: if status.success() {
                        EngineStatus::Success
                    } else {
                        EngineStatus::Error
                    },
                    stdout: non_empty(out),
                    stderr: non_empty(err),
                })
            }
        }
    }
}

impl ExecutionEngine for CommandEngine {
    fn execute<'a>(
        &'a self,
        program: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<EngineReport, EngineError>> {
        Box::pin(self.run(program, cancel))
    }
}

fn non_empty(bytes: Vec<u8>) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandEngine {
        CommandEngine::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_program_is_piped_to_stdin() {
        let engine = shell("cat");
        let report = engine
            .execute("hello engine\n", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report, EngineReport::success("hello engine\n"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error_status() {
        let engine = shell("cat >/dev/null; echo boom >&2; exit 3");
        let report = engine
            .execute("ignored", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status, EngineStatus::Error);
        assert_eq!(report.stdout, None);
        assert_eq!(report.stderr.as_deref(), Some("boom\n"));
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let engine = CommandEngine::new("rozelle-no-such-interpreter", Vec::new());
        let err = engine
            .execute("", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_process() {
        let engine = shell("exec sleep 30");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.execute("", cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }
}
