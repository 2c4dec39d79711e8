//! AST data structures for Assert Probe.
//! These types represent parsed Python test code in a form suitable for
//! assertion discovery and instrumentation.

/// Location of a node in the source it was parsed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-based line of the first character.
    pub line: usize,
    /// 0-based byte column of the first character.
    pub column: usize,
}

impl Span {
    /// Zero-width span sitting at the start of `self`.
    pub fn anchor(&self) -> Span {
        Span {
            end_byte: self.start_byte,
            ..*self
        }
    }
}

/// A node in the abstract syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: AstNodeKind,
    pub span: Span,
    pub children: Vec<AstNode>,
}

/// Supported AST node types. Anything the analyses do not care about is
/// kept as `Other` so traversals can still recurse through it.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNodeKind {
    Module,
    ClassDef { name: String },
    FunctionDef { name: String },
    Block,
    /// children: test expression, optional message
    Assert,
    /// children: callee, arguments
    Call,
    /// children: receiver
    Attribute { attr: String },
    Name { id: String },
    /// children: operands, always `ops.len() + 1` of them
    Compare { ops: Vec<CompareOp> },
    Subscript,
    /// Synthesized `print(message, (expr))` statement; never produced by the parser.
    Diagnostic { message: String, expr: String },
    Other(String),
}

/// Python comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn from_token(token: &str) -> Option<CompareOp> {
        match token {
            "==" => Some(CompareOp::Eq),
            "!=" | "<>" => Some(CompareOp::NotEq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::LtE),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::GtE),
            "in" => Some(CompareOp::In),
            "not in" => Some(CompareOp::NotIn),
            "is" => Some(CompareOp::Is),
            "is not" => Some(CompareOp::IsNot),
            _ => None,
        }
    }

    /// Equality and ordering operators. Membership and identity tests are not.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            CompareOp::Eq
                | CompareOp::NotEq
                | CompareOp::Lt
                | CompareOp::LtE
                | CompareOp::Gt
                | CompareOp::GtE
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtE => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtE => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

impl AstNode {
    pub fn new(kind: AstNodeKind, span: Span, children: Vec<AstNode>) -> Self {
        Self {
            kind,
            span,
            children,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    /// Tested expression of an `assert`.
    pub fn assert_test(&self) -> Option<&AstNode> {
        match self.kind {
            AstNodeKind::Assert => self.children.first(),
            _ => None,
        }
    }

    /// Callee expression of a call.
    pub fn callee(&self) -> Option<&AstNode> {
        match self.kind {
            AstNodeKind::Call => self.children.first(),
            _ => None,
        }
    }

    /// Object an attribute is read from (`np` in `np.random`).
    pub fn receiver(&self) -> Option<&AstNode> {
        match self.kind {
            AstNodeKind::Attribute { .. } => self.children.first(),
            _ => None,
        }
    }

    /// Method name when this is a call through an attribute (`x.allclose(y)`).
    pub fn called_method(&self) -> Option<&str> {
        match &self.callee()?.kind {
            AstNodeKind::Attribute { attr } => Some(attr.as_str()),
            _ => None,
        }
    }

    /// Body block of a class or function definition.
    pub fn body(&self) -> Option<&AstNode> {
        match self.kind {
            AstNodeKind::ClassDef { .. } | AstNodeKind::FunctionDef { .. } => self
                .children
                .iter()
                .rev()
                .find(|c| c.kind == AstNodeKind::Block),
            _ => None,
        }
    }
}

/// A parsed source file: the lowered tree plus the text it was lowered from.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub source: String,
    pub root: AstNode,
}

impl SyntaxTree {
    /// Exact source text covered by `node`.
    pub fn text(&self, node: &AstNode) -> &str {
        node_text(&self.source, node)
    }
}

pub fn node_text<'s>(source: &'s str, node: &AstNode) -> &'s str {
    source
        .get(node.span.start_byte..node.span.end_byte)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: AstNodeKind) -> AstNode {
        AstNode::new(kind, Span::default(), vec![])
    }

    #[test]
    fn test_compare_op_tokens() {
        assert_eq!(CompareOp::from_token("<="), Some(CompareOp::LtE));
        assert_eq!(CompareOp::from_token("<>"), Some(CompareOp::NotEq));
        assert_eq!(CompareOp::from_token("not in"), Some(CompareOp::NotIn));
        assert_eq!(CompareOp::from_token("+"), None);
        assert_eq!(CompareOp::IsNot.as_str(), "is not");
    }

    #[test]
    fn test_relational_ops() {
        assert!(CompareOp::Eq.is_relational());
        assert!(CompareOp::GtE.is_relational());
        assert!(!CompareOp::In.is_relational());
        assert!(!CompareOp::Is.is_relational());
    }

    #[test]
    fn test_called_method() {
        let attr = AstNode::new(
            AstNodeKind::Attribute {
                attr: "allclose".to_string(),
            },
            Span::default(),
            vec![leaf(AstNodeKind::Name { id: "x".to_string() })],
        );
        let call = AstNode::new(
            AstNodeKind::Call,
            Span::default(),
            vec![attr, leaf(AstNodeKind::Other("argument_list".to_string()))],
        );
        assert_eq!(call.called_method(), Some("allclose"));

        let bare = AstNode::new(
            AstNodeKind::Call,
            Span::default(),
            vec![leaf(AstNodeKind::Name { id: "f".to_string() })],
        );
        assert_eq!(bare.called_method(), None);
    }

    #[test]
    fn test_anchor_is_zero_width() {
        let span = Span {
            start_byte: 10,
            end_byte: 24,
            line: 3,
            column: 4,
        };
        let anchor = span.anchor();
        assert_eq!(anchor.start_byte, 10);
        assert_eq!(anchor.end_byte, 10);
        assert_eq!(anchor.line, 3);
    }
}
