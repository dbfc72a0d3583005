//! Tree-sitter based parsing of Python sources

use super::{NodeKind, SyntaxNode, SyntaxTree};
use std::cell::RefCell;
use std::sync::OnceLock;
use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

/// Deepest bracket nesting the CPython tokenizer accepts.
pub const MAX_BRACKET_NESTING: usize = 200;
/// Syntax tree depth past which a source is rejected outright.
pub const MAX_TREE_DEPTH: usize = 1_000;

static PYTHON: OnceLock<Language> = OnceLock::new();

fn python() -> &'static Language {
    PYTHON.get_or_init(|| tree_sitter_python::LANGUAGE.into())
}

// One parser per thread, reused across parses.
thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // A language mismatch surfaces as a failed parse below
        let _ = p.set_language(python());
        p
    });
}

/// A source that could not be parsed as Python.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    /// 1-based line of the first offending token.
    pub line: usize,
    /// 1-based column of the first offending token.
    pub column: usize,
    pub message: String,
}

impl ParseError {
    fn at(node: Node<'_>, message: impl Into<String>) -> Self {
        let position = node.start_position();
        Self {
            line: position.row + 1,
            column: position.column + 1,
            message: message.into(),
        }
    }
}

/// Whether `kind` names a node type of the Python grammar.
pub fn is_grammar_kind(kind: &str) -> bool {
    python().id_for_node_kind(kind, true) != 0
}

/// What a [`preorder`] visitor wants next.
pub(crate) enum Walk<B> {
    Descend,
    Skip,
    Stop(B),
}

/// Visit `root` and its descendants in source order without recursion.
/// The visitor also receives the node's depth below `root`.
pub(crate) fn preorder<'t, B>(
    root: Node<'t>,
    mut visit: impl FnMut(Node<'t>, usize) -> Walk<B>,
) -> Option<B> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        match visit(cursor.node(), depth) {
            Walk::Stop(found) => return Some(found),
            Walk::Descend if cursor.goto_first_child() => {
                depth += 1;
                continue;
            }
            Walk::Descend | Walk::Skip => {}
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

/// Parse Python source into the raw tree-sitter tree, rejecting any tree
/// that contains error or missing nodes, nests too deeply, or uses
/// statement forms Python 3 removed.
pub fn parse_raw(source: &str) -> Result<Tree, ParseError> {
    let tree = PYTHON_PARSER
        .with(|p| p.borrow_mut().parse(source, None))
        .ok_or_else(|| ParseError {
            line: 1,
            column: 1,
            message: "the Python parser is unavailable".to_string(),
        })?;

    let root = tree.root_node();
    check_nesting(root)?;
    if root.has_error() {
        return Err(describe_error(root));
    }
    check_python3(root)?;
    Ok(tree)
}

/// Parse Python source into a [`SyntaxTree`].
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    let tree = parse_raw(source)?;
    Ok(SyntaxTree::new(lower(tree.root_node(), source.as_bytes())))
}

fn check_nesting(root: Node<'_>) -> Result<(), ParseError> {
    let mut brackets = 0usize;
    let failure = preorder(root, |node, depth| {
        if depth > MAX_TREE_DEPTH {
            return Walk::Stop(ParseError::at(node, "too many nested expressions"));
        }
        if !node.is_named() {
            match node.kind() {
                "(" | "[" | "{" => {
                    brackets += 1;
                    if brackets > MAX_BRACKET_NESTING {
                        return Walk::Stop(ParseError::at(node, "too many nested parentheses"));
                    }
                }
                ")" | "]" | "}" => brackets = brackets.saturating_sub(1),
                _ => {}
            }
        }
        Walk::Descend
    });
    failure.map_or(Ok(()), Err)
}

fn check_python3(root: Node<'_>) -> Result<(), ParseError> {
    let failure = preorder(root, |node, _| match node.kind() {
        "print_statement" => Walk::Stop(ParseError::at(
            node,
            "Missing parentheses in call to 'print'",
        )),
        "exec_statement" => Walk::Stop(ParseError::at(
            node,
            "Missing parentheses in call to 'exec'",
        )),
        _ => Walk::Descend,
    });
    failure.map_or(Ok(()), Err)
}

fn describe_error(root: Node<'_>) -> ParseError {
    let first = preorder(root, |node, _| {
        if node.is_error() || node.is_missing() {
            Walk::Stop(node)
        } else if node.has_error() {
            Walk::Descend
        } else {
            Walk::Skip
        }
    });
    match first {
        Some(node) if node.is_missing() => {
            ParseError::at(node, format!("invalid syntax: expected `{}`", node.kind()))
        }
        Some(node) => ParseError::at(node, "invalid syntax"),
        None => ParseError {
            line: 1,
            column: 1,
            message: "invalid syntax".to_string(),
        },
    }
}

/// A node being lowered, with the named children still to visit.
struct Frame<'t> {
    node: Node<'t>,
    kind: NodeKind,
    pending: std::vec::IntoIter<Node<'t>>,
    children: Vec<SyntaxNode>,
}

impl<'t> Frame<'t> {
    fn new(node: Node<'t>, source: &[u8]) -> Self {
        let mut pending = Vec::new();
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let child = cursor.node();
                if child.is_named() && !is_binding_name(node, cursor.field_name(), child) {
                    pending.push(unwrap_statement(child));
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        Self {
            node,
            kind: refine(node, source),
            pending: pending.into_iter(),
            children: Vec::new(),
        }
    }

    fn finish(self, source: &[u8]) -> SyntaxNode {
        let callee = match self.kind {
            NodeKind::Call => self
                .node
                .child_by_field_name("function")
                .filter(|function| function.kind() == "identifier")
                .and_then(|function| function.utf8_text(source).ok())
                .map(str::to_string),
            _ => None,
        };
        SyntaxNode {
            kind: self.kind,
            callee,
            line: self.node.start_position().row + 1,
            children: self.children,
        }
    }
}

fn lower(root: Node<'_>, source: &[u8]) -> SyntaxNode {
    let mut current = Frame::new(root, source);
    let mut parents: Vec<Frame<'_>> = Vec::new();
    loop {
        if let Some(child) = current.pending.next() {
            let child = Frame::new(child, source);
            parents.push(std::mem::replace(&mut current, child));
            continue;
        }
        let done = current.finish(source);
        match parents.pop() {
            Some(mut parent) => {
                parent.children.push(done);
                current = parent;
            }
            None => return done,
        }
    }
}

/// Assignments are statements of their own in Python's tree, not
/// expression statements.
fn unwrap_statement(node: Node<'_>) -> Node<'_> {
    if node.kind() == "expression_statement" && node.named_child_count() == 1 {
        if let Some(inner) = node.named_child(0) {
            if matches!(inner.kind(), "assignment" | "augmented_assignment") {
                return inner;
            }
        }
    }
    node
}

/// Identifiers that Python's tree keeps as plain strings rather than `Name`
/// nodes: definition names, parameters, attribute names, keyword argument
/// names, imported names and `global`/`nonlocal` declarations.
fn is_binding_name(parent: Node<'_>, field: Option<&str>, child: Node<'_>) -> bool {
    if child.kind() != "identifier" {
        return false;
    }
    match (parent.kind(), field) {
        ("function_definition" | "class_definition", Some("name")) => true,
        ("attribute", Some("attribute")) => true,
        ("keyword_argument", Some("name")) => true,
        ("default_parameter" | "typed_default_parameter", Some("name")) => true,
        ("except_clause", Some("alias")) => true,
        ("aliased_import", Some("alias")) => true,
        ("parameters" | "lambda_parameters" | "typed_parameter", None) => true,
        ("list_splat_pattern" | "dictionary_splat_pattern", _) => parent
            .parent()
            .is_some_and(|p| is_parameter_list(p.kind())),
        ("dotted_name" | "global_statement" | "nonlocal_statement", _) => true,
        _ => false,
    }
}

fn is_parameter_list(kind: &str) -> bool {
    matches!(kind, "parameters" | "lambda_parameters" | "typed_parameter")
}

/// Grammar kind of `node`, refined where Python's tree distinguishes forms
/// the grammar shares one node type for.
fn refine(node: Node<'_>, source: &[u8]) -> NodeKind {
    let is_async = || {
        node.child(0)
            .is_some_and(|first| !first.is_named() && first.kind() == "async")
    };
    match node.kind() {
        "function_definition" if is_async() => NodeKind::AsyncFunctionDef,
        "for_statement" if is_async() => NodeKind::AsyncFor,
        "with_statement" if is_async() => NodeKind::AsyncWith,
        "assignment" if node.child_by_field_name("type").is_some() => NodeKind::AnnAssign,
        "list_splat_pattern" | "dictionary_splat_pattern"
            if node.parent().is_some_and(|p| is_parameter_list(p.kind())) =>
        {
            NodeKind::Other(node.kind().to_string())
        }
        "list_splat_pattern" => NodeKind::Starred,
        "string" if is_format_string(node, source) => NodeKind::JoinedStr,
        kind => NodeKind::from_grammar(kind),
    }
}

fn is_format_string(node: Node<'_>, source: &[u8]) -> bool {
    node.child(0)
        .filter(|start| start.kind() == "string_start")
        .and_then(|start| start.utf8_text(source).ok())
        .is_some_and(|prefix| prefix.contains(['f', 'F']))
}
