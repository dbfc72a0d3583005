//! Declarative source policy
//!
//! A [`Constraint`] bounds how many times a countable pattern (a call to a
//! named function, or a node of some syntactic kind) may occur in a program.
//! The [`scanner`] counts occurrences over a parsed tree.

pub mod scanner;

pub use scanner::{count_occurrences, violations};

use crate::syntax::{NodeKind, SyntaxNode};

/// What a constraint counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintTarget {
    /// Calls whose callee is the plain name given. Method calls and computed
    /// callees never match.
    Call(String),
    /// Nodes of the given kind.
    Node(NodeKind),
    /// Nodes of any of the given kinds; each node counts once.
    AnyNode(Vec<NodeKind>),
}

impl ConstraintTarget {
    pub fn matches(&self, node: &SyntaxNode) -> bool {
        match self {
            ConstraintTarget::Call(name) => {
                node.kind == NodeKind::Call && node.callee.as_deref() == Some(name.as_str())
            }
            ConstraintTarget::Node(kind) => node.kind == *kind,
            ConstraintTarget::AnyNode(kinds) => kinds.contains(&node.kind),
        }
    }
}

/// Inclusive occurrence bounds. Both unset means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Limits {
    pub minimum: Option<usize>,
    pub maximum: Option<usize>,
}

impl Limits {
    pub fn at_least(minimum: usize) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: None,
        }
    }

    pub fn at_most(maximum: usize) -> Self {
        Self {
            minimum: None,
            maximum: Some(maximum),
        }
    }

    pub fn between(minimum: usize, maximum: usize) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none()
    }

    pub fn satisfied(&self, count: usize) -> bool {
        self.minimum.is_none_or(|min| count >= min) && self.maximum.is_none_or(|max| count <= max)
    }
}

/// A single policy rule with its learner-facing description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub description: String,
    pub target: ConstraintTarget,
    pub limits: Limits,
}

impl Constraint {
    pub fn new(description: impl Into<String>, target: ConstraintTarget, limits: Limits) -> Self {
        Self {
            description: description.into(),
            target,
            limits,
        }
    }

    pub fn forbidden_call(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            description,
            ConstraintTarget::Call(name.into()),
            Limits::at_most(0),
        )
    }

    pub fn forbidden_node(kind: NodeKind, description: impl Into<String>) -> Self {
        Self::new(description, ConstraintTarget::Node(kind), Limits::at_most(0))
    }

    pub fn forbidden_nodes(kinds: Vec<NodeKind>, description: impl Into<String>) -> Self {
        Self::new(
            description,
            ConstraintTarget::AnyNode(kinds),
            Limits::at_most(0),
        )
    }

    pub fn satisfied(&self, count: usize) -> bool {
        self.limits.satisfied(count)
    }
}

/// Functions no attempt may call, whatever the exercise says.
pub const CRITICAL_FORBIDDEN_CALLS: &[&str] = &["exec", "eval", "open"];

/// The fixed policy evaluated before any exercise-defined constraint.
pub fn critical_constraints() -> Vec<Constraint> {
    let mut constraints = vec![Constraint::forbidden_nodes(
        vec![NodeKind::Import, NodeKind::ImportFrom],
        "You cannot import any other code.",
    )];
    constraints.extend(CRITICAL_FORBIDDEN_CALLS.iter().map(|name| {
        Constraint::forbidden_call(*name, format!("You cannot use the `{}` function.", name))
    }));
    constraints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconstrained_limits_accept_everything() {
        let limits = Limits::default();
        assert!(limits.is_unconstrained());
        assert!(limits.satisfied(0));
        assert!(limits.satisfied(usize::MAX));
    }

    #[test]
    fn test_forbidden_limits() {
        let constraint = Constraint::forbidden_call("eval", "no eval");
        assert!(constraint.satisfied(0));
        for count in 1..5 {
            assert!(!constraint.satisfied(count));
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let limits = Limits::between(1, 2);
        assert!(!limits.satisfied(0));
        assert!(limits.satisfied(1));
        assert!(limits.satisfied(2));
        assert!(!limits.satisfied(3));
    }

    #[test]
    fn test_call_target_ignores_non_calls() {
        let target = ConstraintTarget::Call("print".to_string());
        let mut name = SyntaxNode::leaf(NodeKind::Name, 1);
        name.callee = Some("print".to_string());
        assert!(!target.matches(&name));

        let mut call = SyntaxNode::leaf(NodeKind::Call, 1);
        call.callee = Some("print".to_string());
        assert!(target.matches(&call));
    }

    #[test]
    fn test_critical_set_is_fixed() {
        let critical = critical_constraints();
        let descriptions: Vec<_> = critical.iter().map(|c| c.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "You cannot import any other code.",
                "You cannot use the `exec` function.",
                "You cannot use the `eval` function.",
                "You cannot use the `open` function.",
            ]
        );
        assert!(critical.iter().all(|c| c.limits == Limits::at_most(0)));
    }
}
