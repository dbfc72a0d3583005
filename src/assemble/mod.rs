//! Program assembly
//!
//! Builds the single program text handed to the execution engine from an
//! ordered list of [`Fragment`]s. Trusted fragments (scaffolding and
//! exercise-authored code) carry a mangle salt and have their reserved
//! identifiers rewritten; the attempt fragment carries none and is copied
//! verbatim.

pub mod mangle;

pub use mangle::{MangleCache, RESERVED_PREFIX};

use crate::syntax::{parse_raw, preorder, ParseError, Walk};
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use tree_sitter::Node;

/// One labelled piece of the assembled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub label: String,
    pub source: String,
    /// `Some` for trusted code, whose reserved identifiers get mangled.
    pub mangle_salt: Option<u64>,
}

impl Fragment {
    pub fn trusted(label: impl Into<String>, source: impl Into<String>, salt: u64) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            mangle_salt: Some(salt),
        }
    }

    pub fn untrusted(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            mangle_salt: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// A trusted fragment failed to parse. This is a defect in the harness or in
/// the exercise definition, never in the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("trusted fragment `{label}` has a syntax error: {error}")]
    Syntax { label: String, error: ParseError },
}

pub struct Assembler {
    cache: Arc<MangleCache>,
}

impl Assembler {
    pub fn new(cache: Arc<MangleCache>) -> Self {
        Self { cache }
    }

    /// Concatenate `fragments` in order, one blank line apart. Empty
    /// fragments are skipped without touching the mangle cache.
    pub fn assemble(&self, fragments: &[Fragment]) -> Result<String, AssembleError> {
        let mut parts = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            if fragment.is_empty() {
                debug!(label = %fragment.label, "skipping empty fragment");
                continue;
            }
            let text = match fragment.mangle_salt {
                Some(salt) => self.mangle(&fragment.label, &fragment.source, salt)?,
                None => fragment.source.clone(),
            };
            parts.push(text.trim_end().to_string());
        }

        let mut program = parts.join("\n\n");
        program.push('\n');
        Ok(program)
    }

    /// Rewrite every reserved identifier in `source` to its mangled form.
    pub fn mangle(&self, label: &str, source: &str, salt: u64) -> Result<String, AssembleError> {
        let tree = parse_raw(source).map_err(|error| AssembleError::Syntax {
            label: label.to_string(),
            error,
        })?;

        let mut ranges = Vec::new();
        reserved_identifiers(tree.root_node(), source.as_bytes(), &mut ranges);

        let mut out = String::with_capacity(source.len() + ranges.len() * 17);
        let mut last = 0;
        for range in ranges {
            out.push_str(&source[last..range.start]);
            out.push_str(&self.cache.mangle(salt, &source[range.clone()]));
            last = range.end;
        }
        out.push_str(&source[last..]);
        Ok(out)
    }
}

fn reserved_identifiers(root: Node<'_>, source: &[u8], out: &mut Vec<Range<usize>>) {
    preorder::<()>(root, |node, _| {
        if node.kind() != "identifier" {
            return Walk::Descend;
        }
        if let Ok(text) = node.utf8_text(source) {
            if mangle::is_reserved(text) {
                out.push(node.byte_range());
            }
        }
        Walk::Skip
    });
}
