use crate::syntax::ParseError;

/// The result of evaluating one attempt. Exactly one per evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The attempt is not valid Python.
    FailParse(ParseError),
    /// The attempt broke policy; `violated` holds every broken rule's
    /// description from the pass that failed.
    FailPolicy { critical: bool, violated: Vec<String> },
    /// The attempt crashed, timed out, or its result could not be read.
    FailRuntime { message: String },
    /// The selected output stream differs from the expected output.
    FailOutputMismatch { expected: String, actual: String },
    Pass { elapsed_seconds: f64 },
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass { .. })
    }

    /// Short machine-friendly name, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::FailParse(_) => "fail-parse",
            Outcome::FailPolicy { critical: true, .. } => "fail-policy-critical",
            Outcome::FailPolicy { critical: false, .. } => "fail-policy",
            Outcome::FailRuntime { .. } => "fail-runtime",
            Outcome::FailOutputMismatch { .. } => "fail-output",
            Outcome::Pass { .. } => "pass",
        }
    }
}
