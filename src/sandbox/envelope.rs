//! Result envelope framing
//!
//! The trusted post-fragment writes three lines to the engine's stdout: the
//! begin sentinel, one line of JSON, the end sentinel. Anything else on
//! stdout (interpreter warnings, stray writes) is ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const ENVELOPE_BEGIN: &str = "***ROZELLE-ENVELOPE-BEGIN***";
pub const ENVELOPE_END: &str = "***ROZELLE-ENVELOPE-END***";

/// Structured result of one run, as reported by the scaffolding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Lines printed by the attempt.
    pub stdout: Vec<String>,
    /// Lines printed by the exercise's postrun code.
    #[serde(default)]
    pub postrun_stdout: Vec<String>,
    pub tokens: BTreeSet<String>,
    pub attempt_time_seconds: f64,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("begin sentinel not found in engine output")]
    MissingBegin,
    #[error("end sentinel not found after begin sentinel")]
    MissingEnd,
    #[error("envelope does not match the expected schema: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("attempt time {0} is not a finite, non-negative number")]
    InvalidTime(f64),
}

/// Decode the envelope framed between the first begin sentinel and the
/// first end sentinel after it.
pub fn extract(captured: &str) -> Result<Envelope, EnvelopeError> {
    let start = captured
        .find(ENVELOPE_BEGIN)
        .ok_or(EnvelopeError::MissingBegin)?
        + ENVELOPE_BEGIN.len();
    let rest = &captured[start..];
    let end = rest.find(ENVELOPE_END).ok_or(EnvelopeError::MissingEnd)?;

    let envelope: Envelope = serde_json::from_str(rest[..end].trim())?;
    let seconds = envelope.attempt_time_seconds;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(EnvelopeError::InvalidTime(seconds));
    }
    Ok(envelope)
}

/// Frame an envelope the way the scaffolding prints it.
pub fn frame(envelope: &Envelope) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}\n{}\n{}\n",
        ENVELOPE_BEGIN,
        serde_json::to_string(envelope)?,
        ENVELOPE_END
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            stdout: vec!["Hello, Alice!".to_string()],
            postrun_stdout: Vec::new(),
            tokens: BTreeSet::from(["greeted".to_string()]),
            attempt_time_seconds: 0.25,
        }
    }

    #[test]
    fn test_extract_ignores_surrounding_noise() {
        let captured = format!(
            "Loading runtime...\n{}trailing warning\n",
            frame(&sample()).unwrap()
        );
        assert_eq!(extract(&captured).unwrap(), sample());
    }

    #[test]
    fn test_extract_uses_first_end_after_begin() {
        let captured = format!(
            "{} noise before\n{}{}\n",
            ENVELOPE_END,
            frame(&sample()).unwrap(),
            ENVELOPE_END
        );
        assert_eq!(extract(&captured).unwrap(), sample());
    }

    #[test]
    fn test_missing_sentinels() {
        assert!(matches!(
            extract("plain output\n"),
            Err(EnvelopeError::MissingBegin)
        ));
        let unterminated = format!("{}\n{{\"stdout\": []}}\n", ENVELOPE_BEGIN);
        assert!(matches!(
            extract(&unterminated),
            Err(EnvelopeError::MissingEnd)
        ));
    }

    #[test]
    fn test_invalid_json_is_a_decode_error() {
        let captured = format!("{}\nnot json\n{}\n", ENVELOPE_BEGIN, ENVELOPE_END);
        assert!(matches!(extract(&captured), Err(EnvelopeError::Decode(_))));
    }

    #[test]
    fn test_missing_required_field_is_a_decode_error() {
        let captured = format!(
            "{}\n{{\"stdout\": [], \"tokens\": []}}\n{}\n",
            ENVELOPE_BEGIN, ENVELOPE_END
        );
        assert!(matches!(extract(&captured), Err(EnvelopeError::Decode(_))));
    }

    #[test]
    fn test_postrun_stdout_defaults_to_empty() {
        let captured = format!(
            "{}\n{{\"stdout\": [\"a\"], \"tokens\": [], \"attempt_time_seconds\": 0}}\n{}\n",
            ENVELOPE_BEGIN, ENVELOPE_END
        );
        let envelope = extract(&captured).unwrap();
        assert!(envelope.postrun_stdout.is_empty());
        assert_eq!(envelope.attempt_time_seconds, 0.0);
    }

    #[test]
    fn test_negative_time_is_rejected() {
        let mut envelope = sample();
        envelope.attempt_time_seconds = -1.0;
        let captured = frame(&envelope).unwrap();
        assert!(matches!(
            extract(&captured),
            Err(EnvelopeError::InvalidTime(_))
        ));
    }
}
