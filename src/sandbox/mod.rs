//! Sandboxed execution harness
//!
//! Runs an assembled program through an [`ExecutionEngine`] under a hard
//! deadline and turns whatever comes back into either an [`Envelope`] or a
//! [`HarnessFailure`]. Exactly one engine invocation per run, no retries.

pub mod engine;
pub mod envelope;
pub mod scaffold;

pub use engine::{CommandEngine, EngineError, EngineReport, EngineStatus, ExecutionEngine};
pub use envelope::{Envelope, EnvelopeError};

use crate::util::last_line;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const NO_DIAGNOSTIC: &str = "Could not get error information from the execution engine.";

/// Why a run produced no usable envelope. The `Display` text is what the
/// learner sees; the underlying cause is only logged.
#[derive(Debug, Error)]
pub enum HarnessFailure {
    #[error("{diagnostic}")]
    Engine { diagnostic: String },
    #[error("Your program did not finish within {limit:?}.")]
    Timeout { limit: Duration },
    #[error("The output of your program could not be accessed.")]
    NoOutput,
    #[error("The execution engine returned a malformed or unexpected result.")]
    Malformed {
        #[source]
        cause: EnvelopeError,
    },
}

pub struct Harness<E> {
    engine: E,
    timeout: Duration,
}

impl<E: ExecutionEngine> Harness<E> {
    pub fn new(engine: E, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Execute `program` once, racing the engine against the deadline.
    ///
    /// If the deadline wins, the invocation's token is cancelled and its
    /// future dropped.
    pub async fn run(&self, program: &str) -> Result<Envelope, HarnessFailure> {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let invocation = self.engine.execute(program, cancel.child_token());

        let report = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                warn!(error = %err, "execution engine failed");
                return Err(HarnessFailure::Engine {
                    diagnostic: err.to_string(),
                });
            }
            Err(_) => {
                cancel.cancel();
                warn!(limit = ?self.timeout, "execution timed out");
                return Err(HarnessFailure::Timeout {
                    limit: self.timeout,
                });
            }
        };
        debug!(elapsed = ?started.elapsed(), status = ?report.status, "engine returned");

        classify(report)
    }
}

/// Turn a completed engine report into an envelope or a failure.
pub fn classify(report: EngineReport) -> Result<Envelope, HarnessFailure> {
    if report.status != EngineStatus::Success {
        if let Some(trace) = report.stderr.as_deref() {
            debug!(trace, "engine reported an error");
        }
        let diagnostic = report
            .stderr
            .as_deref()
            .and_then(last_line)
            .unwrap_or(NO_DIAGNOSTIC)
            .to_string();
        return Err(HarnessFailure::Engine { diagnostic });
    }

    let captured = match report.stdout.as_deref() {
        Some(out) if !out.trim().is_empty() => out,
        _ => return Err(HarnessFailure::NoOutput),
    };

    envelope::extract(captured).map_err(|cause| {
        debug!(%cause, "could not decode result envelope");
        HarnessFailure::Malformed { cause }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use std::collections::BTreeSet;

    fn envelope(lines: &[&str]) -> Envelope {
        Envelope {
            stdout: lines.iter().map(|l| l.to_string()).collect(),
            postrun_stdout: Vec::new(),
            tokens: BTreeSet::new(),
            attempt_time_seconds: 0.01,
        }
    }

    #[tokio::test]
    async fn test_valid_envelope_is_returned() {
        let framed = envelope::frame(&envelope(&["hi"])).unwrap();
        let harness = Harness::new(
            ScriptedEngine::reply(EngineReport::success(framed)),
            DEFAULT_TIMEOUT,
        );
        assert_eq!(harness.run("print('hi')").await.unwrap(), envelope(&["hi"]));
        assert_eq!(harness.engine().calls(), 1);
    }

    #[tokio::test]
    async fn test_engine_error_prefers_last_line() {
        let trace = "Traceback (most recent call last):\n  File \"<stdin>\", line 40, in <module>\nZeroDivisionError: division by zero\n\n";
        let harness = Harness::new(
            ScriptedEngine::reply(EngineReport::failure(trace)),
            DEFAULT_TIMEOUT,
        );
        let failure = harness.run("1/0").await.unwrap_err();
        assert_eq!(failure.to_string(), "ZeroDivisionError: division by zero");
    }

    #[tokio::test]
    async fn test_engine_error_without_stderr() {
        let report = EngineReport {
            status: EngineStatus::Error,
            stdout: None,
            stderr: None,
        };
        let failure = classify(report).unwrap_err();
        assert_eq!(failure.to_string(), NO_DIAGNOSTIC);
    }

    #[tokio::test]
    async fn test_success_without_output() {
        let report = EngineReport {
            status: EngineStatus::Success,
            stdout: None,
            stderr: None,
        };
        assert!(matches!(classify(report), Err(HarnessFailure::NoOutput)));
        assert!(matches!(
            classify(EngineReport::success("  \n")),
            Err(HarnessFailure::NoOutput)
        ));
    }

    #[tokio::test]
    async fn test_malformed_output_is_a_failure() {
        for captured in [
            "no sentinels at all".to_string(),
            format!("{}\n{{oops\n{}\n", envelope::ENVELOPE_BEGIN, envelope::ENVELOPE_END),
            format!(
                "{}\n{{\"stdout\": []}}\n{}\n",
                envelope::ENVELOPE_BEGIN,
                envelope::ENVELOPE_END
            ),
        ] {
            let failure = classify(EngineReport::success(captured)).unwrap_err();
            assert!(matches!(failure, HarnessFailure::Malformed { .. }));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_completion_is_a_timeout() {
        let limit = Duration::from_secs(2);
        let framed = envelope::frame(&envelope(&["late"])).unwrap();
        let engine = ScriptedEngine::reply(EngineReport::success(framed))
            .with_delay(limit + Duration::from_millis(1));
        let harness = Harness::new(engine, limit);

        let failure = harness.run("pass").await.unwrap_err();
        assert!(matches!(failure, HarnessFailure::Timeout { .. }));
        assert!(harness.engine().was_cancelled());
        assert!(harness.engine().was_dropped_early());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_before_deadline_succeeds() {
        let limit = Duration::from_secs(2);
        let framed = envelope::frame(&envelope(&["on time"])).unwrap();
        let engine = ScriptedEngine::reply(EngineReport::success(framed))
            .with_delay(limit - Duration::from_millis(1));
        let harness = Harness::new(engine, limit);

        assert!(harness.run("pass").await.is_ok());
        assert!(!harness.engine().was_cancelled());
    }
}
