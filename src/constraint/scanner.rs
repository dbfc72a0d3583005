use super::Constraint;
use crate::syntax::SyntaxTree;

/// Count, for each constraint, the nodes of `tree` its target matches.
///
/// One full traversal; every node is tested against every constraint, so the
/// counts are final for all constraints at once.
pub fn count_occurrences(tree: &SyntaxTree, constraints: &[Constraint]) -> Vec<usize> {
    let mut counts = vec![0usize; constraints.len()];
    for node in tree.nodes() {
        for (count, constraint) in counts.iter_mut().zip(constraints) {
            if constraint.target.matches(node) {
                *count += 1;
            }
        }
    }
    counts
}

/// Constraints whose occurrence count in `tree` falls outside their limits.
///
/// Returned in the order given, with structurally equal constraints reported
/// once.
pub fn violations<'a>(tree: &SyntaxTree, constraints: &'a [Constraint]) -> Vec<&'a Constraint> {
    let counts = count_occurrences(tree, constraints);
    let mut failed: Vec<&Constraint> = Vec::new();
    for (constraint, count) in constraints.iter().zip(counts) {
        if !constraint.satisfied(count) && !failed.contains(&constraint) {
            failed.push(constraint);
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{critical_constraints, ConstraintTarget, Limits};
    use crate::syntax::{parse, NodeKind};

    fn descriptions<'a>(failed: &[&'a Constraint]) -> Vec<&'a str> {
        failed.iter().map(|c| c.description.as_str()).collect()
    }

    #[test]
    fn test_counts_calls_by_plain_name() {
        let tree = parse("print(1)\nprint(len([1]))\nlog.print(2)\n").unwrap();
        let constraints = vec![
            Constraint::new("print", ConstraintTarget::Call("print".into()), Limits::default()),
            Constraint::new("len", ConstraintTarget::Call("len".into()), Limits::default()),
        ];
        assert_eq!(count_occurrences(&tree, &constraints), vec![2, 1]);
    }

    #[test]
    fn test_counts_nested_nodes() {
        let source = "for i in range(3):\n    for j in range(i):\n        print(i, j)\n";
        let tree = parse(source).unwrap();
        let constraints = vec![Constraint::new(
            "loops",
            ConstraintTarget::Node(NodeKind::For),
            Limits::default(),
        )];
        assert_eq!(count_occurrences(&tree, &constraints), vec![2]);
    }

    #[test]
    fn test_zero_maximum_with_no_occurrence_passes() {
        let tree = parse("total = 1 + 2\nprint(total)\n").unwrap();
        let critical = critical_constraints();
        assert!(violations(&tree, &critical).is_empty());
    }

    #[test]
    fn test_reports_every_violation_in_one_pass() {
        let tree = parse("import os\neval('1')\nopen('f')\n").unwrap();
        let critical = critical_constraints();
        assert_eq!(
            descriptions(&violations(&tree, &critical)),
            vec![
                "You cannot import any other code.",
                "You cannot use the `eval` function.",
                "You cannot use the `open` function.",
            ]
        );
    }

    #[test]
    fn test_import_from_counts_as_import() {
        let tree = parse("from math import pi\n").unwrap();
        let critical = critical_constraints();
        assert_eq!(
            descriptions(&violations(&tree, &critical)),
            vec!["You cannot import any other code."]
        );
    }

    #[test]
    fn test_method_named_like_forbidden_call_is_allowed() {
        let tree = parse("calculator.eval('1 + 1')\nfiles.open()\n").unwrap();
        assert!(violations(&tree, &critical_constraints()).is_empty());
    }

    #[test]
    fn test_minimum_requirement() {
        let constraints = vec![Constraint::new(
            "You must use at least one `for` loop.",
            ConstraintTarget::Node(NodeKind::For),
            Limits::at_least(1),
        )];
        let without = parse("print(\"Hello, Alice!\")\n").unwrap();
        assert_eq!(
            descriptions(&violations(&without, &constraints)),
            vec!["You must use at least one `for` loop."]
        );

        let with = parse("for name in ['Alice']:\n    print(name)\n").unwrap();
        assert!(violations(&with, &constraints).is_empty());
    }

    #[test]
    fn test_duplicate_constraints_reported_once() {
        let rule = Constraint::forbidden_node(NodeKind::While, "no while");
        let constraints = vec![rule.clone(), rule];
        let tree = parse("while False:\n    pass\n").unwrap();
        assert_eq!(descriptions(&violations(&tree, &constraints)), vec!["no while"]);
    }

    #[test]
    fn test_other_kind_matches_raw_grammar_name() {
        let tree = parse("@staticmethod\ndef f():\n    pass\n").unwrap();
        let constraints = vec![Constraint::forbidden_node(
            NodeKind::lookup("decorator").unwrap(),
            "no decorators",
        )];
        assert_eq!(
            descriptions(&violations(&tree, &constraints)),
            vec!["no decorators"]
        );
    }
}
