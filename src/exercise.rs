//! Exercise definitions and their TOML form

use crate::constraint::{Constraint, ConstraintTarget, Limits};
use crate::sandbox::Envelope;
use crate::syntax::NodeKind;
use crate::util::joined_trimmed;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Which captured stream the expected output is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputSelection {
    #[default]
    Attempt,
    Postrun,
    NoCheck,
}

impl OutputSelection {
    /// The trimmed text to compare, or `None` when the check is skipped.
    pub fn select(&self, envelope: &Envelope) -> Option<String> {
        match self {
            OutputSelection::Attempt => Some(joined_trimmed(&envelope.stdout)),
            OutputSelection::Postrun => Some(joined_trimmed(&envelope.postrun_stdout)),
            OutputSelection::NoCheck => None,
        }
    }
}

/// A validated exercise. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub message: String,
    pub expected_output: String,
    pub constraints: Vec<Constraint>,
    pub hide_constraints: bool,
    pub hide_expected_output: bool,
    pub prerun_code: String,
    pub postrun_code: String,
    pub output_selection: OutputSelection,
}

impl Exercise {
    /// An exercise with no constraints or exercise code.
    pub fn new(message: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected_output: expected_output.into(),
            constraints: Vec::new(),
            hide_constraints: false,
            hide_expected_output: false,
            prerun_code: String::new(),
            postrun_code: String::new(),
            output_selection: OutputSelection::Attempt,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Load and validate an exercise TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read exercise '{}'", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid exercise '{}'", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ExerciseFile = toml::from_str(content).context("Invalid TOML")?;
        let identifier = Regex::new(IDENTIFIER_PATTERN)?;

        let constraints = file
            .constraints
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let description = entry.description.clone();
                entry.into_constraint(&identifier).with_context(|| {
                    format!("constraint #{} (\"{}\")", index + 1, description)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            message: file.message,
            expected_output: file.expected_output,
            constraints,
            hide_constraints: file.hide_constraints,
            hide_expected_output: file.hide_expected_output,
            prerun_code: file.code.prerun,
            postrun_code: file.code.postrun,
            output_selection: file.check_expected_output_from,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExerciseFile {
    message: String,
    expected_output: String,
    #[serde(default)]
    constraints: Vec<ConstraintEntry>,
    #[serde(default)]
    hide_constraints: bool,
    #[serde(default)]
    hide_expected_output: bool,
    #[serde(default)]
    code: CodeEntry,
    #[serde(default)]
    check_expected_output_from: OutputSelection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CodeEntry {
    #[serde(default)]
    prerun: String,
    #[serde(default)]
    postrun: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstraintEntry {
    description: String,
    call: Option<String>,
    node: Option<String>,
    nodes: Option<Vec<String>>,
    min_required: Option<usize>,
    max_allowed: Option<usize>,
}

impl ConstraintEntry {
    fn into_constraint(self, identifier: &Regex) -> Result<Constraint> {
        let target = match (self.call, self.node, self.nodes) {
            (Some(call), None, None) => {
                if !identifier.is_match(&call) {
                    bail!("`call` must be a plain function name, got \"{}\"", call);
                }
                ConstraintTarget::Call(call)
            }
            (None, Some(node), None) => ConstraintTarget::Node(node_kind(&node)?),
            (None, None, Some(nodes)) => {
                if nodes.is_empty() {
                    bail!("`nodes` must list at least one node kind");
                }
                ConstraintTarget::AnyNode(
                    nodes
                        .iter()
                        .map(|n| node_kind(n))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            _ => return Err(anyhow!("exactly one of `call`, `node` or `nodes` is required")),
        };

        let limits = Limits {
            minimum: self.min_required,
            maximum: self.max_allowed,
        };
        if limits.is_unconstrained() {
            bail!("at least one of `min_required` or `max_allowed` is required");
        }
        if let (Some(min), Some(max)) = (limits.minimum, limits.maximum) {
            if min > max {
                bail!("`min_required` ({}) exceeds `max_allowed` ({})", min, max);
            }
        }

        Ok(Constraint::new(self.description, target, limits))
    }
}

fn node_kind(name: &str) -> Result<NodeKind> {
    NodeKind::lookup(name).ok_or_else(|| anyhow!("unknown node kind \"{}\"", name))
}
