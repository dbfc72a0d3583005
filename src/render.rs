//! Plain-text rendering of exercises and outcomes

use crate::exercise::Exercise;
use crate::outcome::Outcome;
use crate::util::truncate;
use std::fmt::Write;

const DIAGNOSTIC_MAX_CHARS: usize = 2_000;
const RULE_WIDTH: usize = 60;

fn rule(title: &str) -> String {
    let title = format!("── {} ", title);
    let fill = RULE_WIDTH.saturating_sub(title.chars().count());
    format!("{}{}", title, "─".repeat(fill))
}

fn numbered(text: &str) -> String {
    let mut out = String::new();
    for (i, line) in text.lines().enumerate() {
        let _ = writeln!(out, "  {:>3} │ {}", i + 1, line);
    }
    out
}

/// Header block: the exercise message, expected output and constraints,
/// minus whatever the exercise hides.
pub fn render_exercise(name: &str, exercise: &Exercise) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule(&format!("Exercise: {}", name)));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", exercise.message.trim());

    if !exercise.hide_expected_output {
        let _ = writeln!(out);
        let _ = writeln!(out, "Expected output:");
        let _ = writeln!(out);
        out.push_str(&numbered(exercise.expected_output.trim()));
    }

    if !exercise.hide_constraints && !exercise.constraints.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Constraints:");
        let _ = writeln!(out);
        for constraint in &exercise.constraints {
            let _ = writeln!(out, "  · {}", constraint.description);
        }
    }
    out
}

/// Badge, title and body for one outcome.
pub fn render_outcome(outcome: &Outcome) -> String {
    let (badge, title, body) = match outcome {
        Outcome::FailParse(error) => (
            "FAIL:",
            "Your program cannot be examined due to a syntax error.".to_string(),
            format!("  {}\n", error),
        ),
        Outcome::FailPolicy { critical, violated } => {
            let which = if *critical { "critical" } else { "these" };
            let body = violated
                .iter()
                .map(|d| format!("  · {}\n", d))
                .collect::<String>();
            (
                "FAIL:",
                format!("Your program failed to satisfy {} constraints.", which),
                body,
            )
        }
        Outcome::FailRuntime { message } => (
            "FAIL:",
            "Your program ran into an error.".to_string(),
            format!("  {}\n", truncate(message, DIAGNOSTIC_MAX_CHARS)),
        ),
        Outcome::FailOutputMismatch { actual, .. } => (
            "FAIL:",
            "Your program does not have the expected output.".to_string(),
            numbered(actual),
        ),
        Outcome::Pass { elapsed_seconds } => (
            "PASS:",
            "Your program is correct!".to_string(),
            format!("  Execution time: {:.4}s\n", elapsed_seconds),
        ),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", badge, title);
    if !body.is_empty() {
        let _ = writeln!(out);
        out.push_str(&body);
    }
    out
}
