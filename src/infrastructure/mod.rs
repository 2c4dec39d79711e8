//! Infrastructure implementations for Assert Probe.

pub mod concurrency;
pub mod csv_exporter;
pub mod project_loader;
pub mod rules_loader;
pub mod splice;
pub mod test_runner;

pub use csv_exporter::CsvExporter;
pub use splice::SpliceUnparser;

use std::path::PathBuf;

use tree_sitter::{Node, Parser};

use crate::domain::ast::{AstNode, AstNodeKind, CompareOp, Span, SyntaxTree};
use crate::error::{ProbeError, Result};
use crate::ports::AstParser;

/// Python parser backed by tree-sitter. The concrete syntax tree is lowered
/// into `AstNode`s right away so nothing downstream depends on tree-sitter.
pub struct TreeSitterParser;

impl AstParser for TreeSitterParser {
    fn parse(&self, src: &str) -> Result<SyntaxTree> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| parse_error(format!("failed to load Python grammar: {}", e)))?;

        let tree = parser
            .parse(src, None)
            .ok_or_else(|| parse_error("parser produced no tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let message = match first_error(root) {
                Some(node) => {
                    let pos = node.start_position();
                    format!("invalid syntax at line {}, column {}", pos.row + 1, pos.column + 1)
                }
                None => "invalid syntax".to_string(),
            };
            return Err(parse_error(message));
        }

        Ok(SyntaxTree {
            source: src.to_string(),
            root: lower(root, src),
        })
    }
}

fn parse_error(message: String) -> ProbeError {
    ProbeError::Parse {
        path: PathBuf::from("<source>"),
        message,
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

fn span_of(node: Node<'_>) -> Span {
    let pos = node.start_position();
    Span {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        line: pos.row + 1,
        column: pos.column,
    }
}

fn text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    src.get(node.byte_range()).unwrap_or_default()
}

/// Named children worth keeping. Extras (comments, `\` line continuations)
/// can sit between any two tokens and are dropped.
fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

fn lower_all(nodes: Vec<Node<'_>>, src: &str) -> Vec<AstNode> {
    nodes.into_iter().map(|n| lower(n, src)).collect()
}

fn lower(node: Node<'_>, src: &str) -> AstNode {
    let span = span_of(node);
    match node.kind() {
        "module" => AstNode::new(AstNodeKind::Module, span, lower_all(named_children(node), src)),
        "block" => AstNode::new(AstNodeKind::Block, span, lower_all(named_children(node), src)),
        "class_definition" | "function_definition" => lower_definition(node, span, src),
        "assert_statement" => AstNode::new(AstNodeKind::Assert, span, lower_all(named_children(node), src)),
        "call" => AstNode::new(AstNodeKind::Call, span, lower_all(named_children(node), src)),
        "attribute" => {
            let attr = node
                .child_by_field_name("attribute")
                .map(|a| text(a, src).to_string())
                .unwrap_or_default();
            let receiver = node
                .child_by_field_name("object")
                .map(|o| vec![lower(o, src)])
                .unwrap_or_default();
            AstNode::new(AstNodeKind::Attribute { attr }, span, receiver)
        }
        "identifier" => AstNode::new(
            AstNodeKind::Name {
                id: text(node, src).to_string(),
            },
            span,
            vec![],
        ),
        "comparison_operator" => {
            let ops = comparison_ops(node);
            AstNode::new(AstNodeKind::Compare { ops }, span, lower_all(named_children(node), src))
        }
        "subscript" => AstNode::new(AstNodeKind::Subscript, span, lower_all(named_children(node), src)),
        "parenthesized_expression" => {
            let mut inner = named_children(node);
            if inner.len() == 1 {
                lower(inner.remove(0), src)
            } else {
                AstNode::new(AstNodeKind::Other(node.kind().to_string()), span, lower_all(inner, src))
            }
        }
        kind => AstNode::new(AstNodeKind::Other(kind.to_string()), span, lower_all(named_children(node), src)),
    }
}

/// Operators of a comparison, joining `not in` / `is not` when the grammar
/// hands them over as two tokens.
fn comparison_ops(node: Node<'_>) -> Vec<CompareOp> {
    let mut cursor = node.walk();
    let tokens: Vec<&'static str> = node
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();

    let mut ops = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let joined = match (tokens[i], tokens.get(i + 1)) {
            ("not", Some(&"in")) => Some(CompareOp::NotIn),
            ("is", Some(&"not")) => Some(CompareOp::IsNot),
            _ => None,
        };
        match joined {
            Some(op) => {
                ops.push(op);
                i += 2;
            }
            None => {
                ops.extend(CompareOp::from_token(tokens[i]));
                i += 1;
            }
        }
    }
    ops
}

fn lower_definition(node: Node<'_>, span: Span, src: &str) -> AstNode {
    let name_node = node.child_by_field_name("name");
    let name = name_node.map(|n| text(n, src).to_string()).unwrap_or_default();
    let children = named_children(node)
        .into_iter()
        .filter(|c| Some(c.id()) != name_node.map(|n| n.id()))
        .map(|c| lower(c, src))
        .collect();
    let kind = if node.kind() == "class_definition" {
        AstNodeKind::ClassDef { name }
    } else {
        AstNodeKind::FunctionDef { name }
    };
    AstNode::new(kind, span, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SyntaxTree {
        TreeSitterParser.parse(src).unwrap()
    }

    #[test]
    fn test_function_lowering() {
        let tree = parse("def test_a(x):\n    # note\n    assert x == 1\n");
        assert_eq!(tree.root.kind, AstNodeKind::Module);
        let func = &tree.root.children[0];
        assert_eq!(
            func.kind,
            AstNodeKind::FunctionDef {
                name: "test_a".to_string()
            }
        );
        let body = func.body().unwrap();
        assert_eq!(body.children.len(), 1, "comments are dropped");

        let assert_stmt = &body.children[0];
        assert_eq!(assert_stmt.kind, AstNodeKind::Assert);
        assert_eq!(assert_stmt.line(), 3);
        assert_eq!(assert_stmt.span.column, 4);
        assert_eq!(tree.text(assert_stmt), "assert x == 1");

        let test = assert_stmt.assert_test().unwrap();
        assert_eq!(
            test.kind,
            AstNodeKind::Compare {
                ops: vec![CompareOp::Eq]
            }
        );
        assert_eq!(test.children.len(), 2);
    }

    #[test]
    fn test_attribute_call_lowering() {
        let tree = parse("np.random.rand(3)\n");
        let stmt = &tree.root.children[0];
        let call = &stmt.children[0];
        assert_eq!(call.kind, AstNodeKind::Call);
        assert_eq!(call.called_method(), Some("rand"));

        let callee = call.callee().unwrap();
        let inner = callee.receiver().unwrap();
        assert_eq!(
            inner.kind,
            AstNodeKind::Attribute {
                attr: "random".to_string()
            }
        );
        assert_eq!(
            inner.receiver().unwrap().kind,
            AstNodeKind::Name { id: "np".to_string() }
        );
    }

    #[test]
    fn test_compound_comparison_operators() {
        let tree = parse("assert a not in b\nassert a is not None\nassert 0 <= x < 10\n");
        let ops: Vec<_> = tree
            .root
            .children
            .iter()
            .map(|s| match &s.assert_test().unwrap().kind {
                AstNodeKind::Compare { ops } => ops.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                vec![CompareOp::NotIn],
                vec![CompareOp::IsNot],
                vec![CompareOp::LtE, CompareOp::Lt],
            ]
        );
    }

    #[test]
    fn test_parentheses_unwrapped() {
        let tree = parse("assert (a == b)\n");
        let test = tree.root.children[0].assert_test().unwrap();
        assert!(matches!(test.kind, AstNodeKind::Compare { .. }));
        assert_eq!(tree.text(test), "a == b");
    }

    #[test]
    fn test_class_and_decorated_method() {
        let src = "\
class TestX(Base):
    @pytest.mark.slow
    def test_y(self):
        pass
";
        let tree = parse(src);
        let class = &tree.root.children[0];
        assert_eq!(
            class.kind,
            AstNodeKind::ClassDef {
                name: "TestX".to_string()
            }
        );
        let decorated = &class.body().unwrap().children[0];
        assert_eq!(decorated.kind, AstNodeKind::Other("decorated_definition".to_string()));
        let method = decorated
            .children
            .iter()
            .find(|c| matches!(c.kind, AstNodeKind::FunctionDef { .. }))
            .unwrap();
        assert_eq!(method.line(), 3);
    }

    #[test]
    fn test_syntax_error_reported() {
        let err = TreeSitterParser.parse("def broken(:\n    pass\n").unwrap_err();
        match err {
            ProbeError::Parse { message, .. } => assert!(message.contains("line 1"), "{}", message),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_source_parses() {
        let tree = parse("");
        assert!(tree.root.children.is_empty());
    }
}
