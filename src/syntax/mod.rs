//! Syntax tree model for Python sources
//!
//! The parser (tree-sitter) produces a concrete syntax tree with string
//! node kinds. Everything downstream works on [`SyntaxTree`] instead: every
//! node carries a [`NodeKind`] from a closed enumeration (named the way
//! Python's own `ast` module names them) with [`NodeKind::Other`] as the
//! escape hatch for grammar kinds that have no dedicated variant.

mod parser;

pub(crate) use parser::{preorder, Walk};
pub use parser::{
    is_grammar_kind, parse, parse_raw, ParseError, MAX_BRACKET_NESTING, MAX_TREE_DEPTH,
};

use std::fmt;

/// Syntactic category of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Module,
    Import,
    ImportFrom,
    FunctionDef,
    AsyncFunctionDef,
    ClassDef,
    Return,
    Assign,
    AugAssign,
    AnnAssign,
    /// A bare expression used as a statement. Assignments are never `Expr`.
    Expr,
    For,
    AsyncFor,
    While,
    If,
    With,
    AsyncWith,
    Try,
    ExceptHandler,
    Raise,
    Assert,
    Global,
    Nonlocal,
    Delete,
    Pass,
    Break,
    Continue,
    Match,
    Call,
    Keyword,
    Lambda,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    Comprehension,
    IfExp,
    NamedExpr,
    BinOp,
    BoolOp,
    Compare,
    UnaryOp,
    Attribute,
    Subscript,
    Slice,
    Starred,
    /// A variable reference. Definition, parameter, attribute, keyword and
    /// import names are plain strings in Python's tree and are not `Name`.
    Name,
    Constant,
    JoinedStr,
    FormattedValue,
    List,
    Tuple,
    Dict,
    Set,
    Yield,
    Await,
    /// A grammar kind without a dedicated variant, kept verbatim.
    Other(String),
}

const NAMED_KINDS: &[(&str, NodeKind)] = &[
    ("Module", NodeKind::Module),
    ("Import", NodeKind::Import),
    ("ImportFrom", NodeKind::ImportFrom),
    ("FunctionDef", NodeKind::FunctionDef),
    ("AsyncFunctionDef", NodeKind::AsyncFunctionDef),
    ("ClassDef", NodeKind::ClassDef),
    ("Return", NodeKind::Return),
    ("Assign", NodeKind::Assign),
    ("AugAssign", NodeKind::AugAssign),
    ("AnnAssign", NodeKind::AnnAssign),
    ("Expr", NodeKind::Expr),
    ("For", NodeKind::For),
    ("AsyncFor", NodeKind::AsyncFor),
    ("While", NodeKind::While),
    ("If", NodeKind::If),
    ("With", NodeKind::With),
    ("AsyncWith", NodeKind::AsyncWith),
    ("Try", NodeKind::Try),
    ("ExceptHandler", NodeKind::ExceptHandler),
    ("Raise", NodeKind::Raise),
    ("Assert", NodeKind::Assert),
    ("Global", NodeKind::Global),
    ("Nonlocal", NodeKind::Nonlocal),
    ("Delete", NodeKind::Delete),
    ("Pass", NodeKind::Pass),
    ("Break", NodeKind::Break),
    ("Continue", NodeKind::Continue),
    ("Match", NodeKind::Match),
    ("Call", NodeKind::Call),
    ("keyword", NodeKind::Keyword),
    ("Lambda", NodeKind::Lambda),
    ("ListComp", NodeKind::ListComp),
    ("SetComp", NodeKind::SetComp),
    ("DictComp", NodeKind::DictComp),
    ("GeneratorExp", NodeKind::GeneratorExp),
    ("Comprehension", NodeKind::Comprehension),
    ("IfExp", NodeKind::IfExp),
    ("NamedExpr", NodeKind::NamedExpr),
    ("BinOp", NodeKind::BinOp),
    ("BoolOp", NodeKind::BoolOp),
    ("Compare", NodeKind::Compare),
    ("UnaryOp", NodeKind::UnaryOp),
    ("Attribute", NodeKind::Attribute),
    ("Subscript", NodeKind::Subscript),
    ("Slice", NodeKind::Slice),
    ("Starred", NodeKind::Starred),
    ("Name", NodeKind::Name),
    ("Constant", NodeKind::Constant),
    ("JoinedStr", NodeKind::JoinedStr),
    ("FormattedValue", NodeKind::FormattedValue),
    ("List", NodeKind::List),
    ("Tuple", NodeKind::Tuple),
    ("Dict", NodeKind::Dict),
    ("Set", NodeKind::Set),
    ("Yield", NodeKind::Yield),
    ("Await", NodeKind::Await),
];

impl NodeKind {
    /// Map a tree-sitter-python node kind onto the closed enumeration.
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "module" => NodeKind::Module,
            "import_statement" => NodeKind::Import,
            "import_from_statement" | "future_import_statement" => NodeKind::ImportFrom,
            "function_definition" => NodeKind::FunctionDef,
            "class_definition" => NodeKind::ClassDef,
            "return_statement" => NodeKind::Return,
            "assignment" => NodeKind::Assign,
            "augmented_assignment" => NodeKind::AugAssign,
            "expression_statement" => NodeKind::Expr,
            "for_statement" => NodeKind::For,
            "while_statement" => NodeKind::While,
            // `elif` is a nested `If` in Python's own tree
            "if_statement" | "elif_clause" => NodeKind::If,
            "with_statement" => NodeKind::With,
            "try_statement" => NodeKind::Try,
            "except_clause" | "except_group_clause" => NodeKind::ExceptHandler,
            "raise_statement" => NodeKind::Raise,
            "assert_statement" => NodeKind::Assert,
            "global_statement" => NodeKind::Global,
            "nonlocal_statement" => NodeKind::Nonlocal,
            "delete_statement" => NodeKind::Delete,
            "pass_statement" => NodeKind::Pass,
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "match_statement" => NodeKind::Match,
            "call" => NodeKind::Call,
            "keyword_argument" => NodeKind::Keyword,
            "lambda" => NodeKind::Lambda,
            "list_comprehension" => NodeKind::ListComp,
            "set_comprehension" => NodeKind::SetComp,
            "dictionary_comprehension" => NodeKind::DictComp,
            "generator_expression" => NodeKind::GeneratorExp,
            "for_in_clause" => NodeKind::Comprehension,
            "conditional_expression" => NodeKind::IfExp,
            "named_expression" => NodeKind::NamedExpr,
            "binary_operator" => NodeKind::BinOp,
            "boolean_operator" => NodeKind::BoolOp,
            "comparison_operator" => NodeKind::Compare,
            "unary_operator" | "not_operator" => NodeKind::UnaryOp,
            "attribute" => NodeKind::Attribute,
            "subscript" => NodeKind::Subscript,
            "slice" => NodeKind::Slice,
            "list_splat" | "list_splat_pattern" => NodeKind::Starred,
            "identifier" => NodeKind::Name,
            "string" | "concatenated_string" | "integer" | "float" | "true" | "false"
            | "none" | "ellipsis" => NodeKind::Constant,
            "interpolation" => NodeKind::FormattedValue,
            "list" => NodeKind::List,
            "tuple" => NodeKind::Tuple,
            "dictionary" => NodeKind::Dict,
            "set" => NodeKind::Set,
            "yield" => NodeKind::Yield,
            "await" => NodeKind::Await,
            other => NodeKind::Other(other.to_string()),
        }
    }

    /// Resolve a kind name as written in an exercise definition.
    ///
    /// Accepts the `ast`-style names (`"For"`, `"NamedExpr"`) as well as raw
    /// grammar kinds (`"for_statement"`, `"decorator"`). Anything else is
    /// `None`, since it could never match a node.
    pub fn lookup(name: &str) -> Option<Self> {
        if let Some((_, kind)) = NAMED_KINDS.iter().find(|(n, _)| *n == name) {
            return Some(kind.clone());
        }
        is_grammar_kind(name).then(|| NodeKind::from_grammar(name))
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Other(raw) => raw,
            known => NAMED_KINDS
                .iter()
                .find(|(_, kind)| kind == known)
                .map(|(n, _)| *n)
                .unwrap_or("?"),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named node of a parsed program.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// For `Call` nodes whose callee is a bare identifier, that identifier.
    pub callee: Option<String>,
    /// 1-based line of the node's first character.
    pub line: usize,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn leaf(kind: NodeKind, line: usize) -> Self {
        Self {
            kind,
            callee: None,
            line,
            children: Vec::new(),
        }
    }
}

/// A successfully parsed program.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    root: SyntaxNode,
}

impl SyntaxTree {
    pub fn new(root: SyntaxNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Preorder iterator over every node, root included.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![&self.root],
        }
    }
}

pub struct Nodes<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_kinds_round_trip() {
        for (name, kind) in NAMED_KINDS {
            assert_eq!(NodeKind::lookup(name).as_ref(), Some(kind));
            assert_eq!(kind.name(), *name);
        }
    }

    #[test]
    fn test_grammar_names_resolve_through_fallback() {
        assert_eq!(NodeKind::lookup("for_statement"), Some(NodeKind::For));
        assert_eq!(
            NodeKind::lookup("decorator"),
            Some(NodeKind::Other("decorator".to_string()))
        );
        assert_eq!(NodeKind::Other("decorator".to_string()).name(), "decorator");
    }

    #[test]
    fn test_unknown_names_do_not_resolve() {
        assert_eq!(NodeKind::lookup("YieldFrom"), None);
        assert_eq!(NodeKind::lookup("for"), None);
        assert_eq!(NodeKind::lookup("Fro"), None);
    }

    #[test]
    fn test_nodes_iterates_in_preorder() {
        let mut root = SyntaxNode::leaf(NodeKind::Module, 1);
        let mut stmt = SyntaxNode::leaf(NodeKind::Expr, 1);
        stmt.children.push(SyntaxNode::leaf(NodeKind::Call, 1));
        root.children.push(stmt);
        root.children.push(SyntaxNode::leaf(NodeKind::Pass, 2));

        let tree = SyntaxTree::new(root);
        let kinds: Vec<_> = tree.nodes().map(|n| n.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Module, NodeKind::Expr, NodeKind::Call, NodeKind::Pass]
        );
    }
}
