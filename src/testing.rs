//! Test doubles shared by unit tests

use crate::sandbox::envelope::{self, Envelope};
use crate::sandbox::{EngineError, EngineReport, ExecutionEngine};
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Reply = Box<dyn Fn(&str) -> EngineReport + Send + Sync>;

/// An engine that answers every program with a scripted report, optionally
/// after a delay.
pub struct ScriptedEngine {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    token: Mutex<Option<CancellationToken>>,
    dropped_early: Arc<AtomicBool>,
    last_program: Mutex<Option<String>>,
}

impl ScriptedEngine {
    pub fn new(reply: impl Fn(&str) -> EngineReport + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            delay: None,
            calls: AtomicUsize::new(0),
            token: Mutex::new(None),
            dropped_early: Arc::new(AtomicBool::new(false)),
            last_program: Mutex::new(None),
        }
    }

    pub fn reply(report: EngineReport) -> Self {
        Self::new(move |_| report.clone())
    }

    /// Reply with an envelope whose attempt stdout is `stdout`.
    pub fn printing(stdout: &[&str], postrun_stdout: &[&str]) -> Self {
        let envelope = Envelope {
            stdout: stdout.iter().map(|l| l.to_string()).collect(),
            postrun_stdout: postrun_stdout.iter().map(|l| l.to_string()).collect(),
            tokens: BTreeSet::new(),
            attempt_time_seconds: 0.002,
        };
        let framed = envelope::frame(&envelope).unwrap();
        Self::reply(EngineReport::success(framed))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_cancelled(&self) -> bool {
        self.token
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|t| t.is_cancelled())
    }

    pub fn was_dropped_early(&self) -> bool {
        self.dropped_early.load(Ordering::SeqCst)
    }

    pub fn last_program(&self) -> Option<String> {
        self.last_program.lock().unwrap().clone()
    }
}

struct DropFlag {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for DropFlag {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn execute<'a>(
        &'a self,
        program: &'a str,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<EngineReport, EngineError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.token.lock().unwrap() = Some(cancel.clone());
        *self.last_program.lock().unwrap() = Some(program.to_string());

        Box::pin(async move {
            let mut guard = DropFlag {
                flag: self.dropped_early.clone(),
                armed: true,
            };
            if let Some(delay) = self.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                }
            }
            guard.armed = false;
            Ok((self.reply)(program))
        })
    }
}
