//! Outcome classification
//!
//! Drives one attempt through the pipeline. The first failing stage decides
//! the outcome:
//!
//! 1. parse the attempt
//! 2. critical policy
//! 3. exercise policy
//! 4. assemble and execute
//! 5. compare the selected output stream
//! 6. pass

use crate::assemble::{AssembleError, Assembler, MangleCache};
use crate::constraint::{critical_constraints, violations, Constraint};
use crate::exercise::Exercise;
use crate::outcome::Outcome;
use crate::sandbox::{scaffold, ExecutionEngine, Harness};
use crate::syntax::{self, SyntaxTree};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Evaluator<E> {
    critical: Vec<Constraint>,
    assembler: Assembler,
    harness: Harness<E>,
}

impl<E: ExecutionEngine> Evaluator<E> {
    pub fn new(engine: E, cache: Arc<MangleCache>, timeout: Duration) -> Self {
        Self {
            critical: critical_constraints(),
            assembler: Assembler::new(cache),
            harness: Harness::new(engine, timeout),
        }
    }

    pub fn harness(&self) -> &Harness<E> {
        &self.harness
    }

    /// Evaluate `attempt` against `exercise`.
    ///
    /// Every learner-caused failure comes back as an [`Outcome`]. `Err` means
    /// trusted code (scaffolding or the exercise's own prerun/postrun) does
    /// not parse, which no attempt can fix.
    pub async fn evaluate(
        &self,
        exercise: &Exercise,
        attempt: &str,
    ) -> Result<Outcome, AssembleError> {
        let outcome = self.classify(exercise, attempt).await?;
        info!(outcome = outcome.label(), "evaluation finished");
        Ok(outcome)
    }

    async fn classify(&self, exercise: &Exercise, attempt: &str) -> Result<Outcome, AssembleError> {
        let tree = match syntax::parse(attempt) {
            Ok(tree) => tree,
            Err(error) => {
                debug!(%error, "attempt does not parse");
                return Ok(Outcome::FailParse(error));
            }
        };

        if let Some(outcome) = check_policy(&tree, &self.critical, true) {
            return Ok(outcome);
        }
        if let Some(outcome) = check_policy(&tree, &exercise.constraints, false) {
            return Ok(outcome);
        }

        let fragments =
            scaffold::program_fragments(&exercise.prerun_code, attempt, &exercise.postrun_code);
        let program = self.assembler.assemble(&fragments)?;

        let envelope = match self.harness.run(&program).await {
            Ok(envelope) => envelope,
            Err(failure) => {
                return Ok(Outcome::FailRuntime {
                    message: failure.to_string(),
                })
            }
        };
        if !envelope.tokens.is_empty() {
            debug!(tokens = ?envelope.tokens, "exercise code reported tokens");
        }

        if let Some(actual) = exercise.output_selection.select(&envelope) {
            let expected = exercise.expected_output.trim();
            if expected != actual {
                return Ok(Outcome::FailOutputMismatch {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(Outcome::Pass {
            elapsed_seconds: envelope.attempt_time_seconds,
        })
    }
}

fn check_policy(tree: &SyntaxTree, constraints: &[Constraint], critical: bool) -> Option<Outcome> {
    let failed = violations(tree, constraints);
    if failed.is_empty() {
        return None;
    }
    debug!(critical, count = failed.len(), "policy violated");
    Some(Outcome::FailPolicy {
        critical,
        violated: failed.iter().map(|c| c.description.clone()).collect(),
    })
}
