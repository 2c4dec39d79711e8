//! Instrumentation Transformer
//!
//! Rewrites one target function so that the two-term comparison asserted on
//! the target line is preceded by two diagnostic statements, one per operand:
//!
//! ```text
//! assert numbers[i] < numbers[i + 1]
//! ```
//! becomes
//! ```text
//! print('log>> numbers[i]:', (numbers[i]))
//! print('log>> numbers[i + 1]:', (numbers[i + 1]))
//! assert numbers[i] < numbers[i + 1]
//! ```
//!
//! Every function visited along the way also gets a randomness profile.

use tracing::info;

use crate::domain::ast::{node_text, AstNode, AstNodeKind, Span, SyntaxTree};
use crate::domain::randomness::{RandomUsageProfile, RandomnessDetector};
use crate::domain::rules::DetectionRules;
use crate::domain::visit::{walk_mut, VisitMut};
use crate::error::{ProbeError, Result};

/// Where to instrument: the function name and the 1-based line of its assert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelector {
    pub function_name: String,
    pub line_number: usize,
}

impl TargetSelector {
    pub fn new(function_name: impl Into<String>, line_number: usize) -> Self {
        Self {
            function_name: function_name.into(),
            line_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentOutcome {
    /// Diagnostics were inserted before the assert on `line`.
    Instrumented {
        line: usize,
        left: String,
        right: String,
    },
    /// The target function exists but holds no relational assert on the line.
    NoMatchingAssertion,
    /// No function with the target name exists; the tree is untouched.
    TargetNotFound,
}

impl InstrumentOutcome {
    pub fn is_instrumented(&self) -> bool {
        matches!(self, InstrumentOutcome::Instrumented { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Instrumentation {
    pub outcome: InstrumentOutcome,
    pub profiles: RandomUsageProfile,
}

pub struct InstrumentationTransformer<'a> {
    target: &'a TargetSelector,
    rules: &'a DetectionRules,
    source: &'a str,
    profiles: RandomUsageProfile,
    in_target: bool,
    target_seen: bool,
    instrumented: Option<(String, String)>,
}

impl<'a> InstrumentationTransformer<'a> {
    /// Rewrite `tree` in place and report what happened.
    pub fn instrument(
        tree: &mut SyntaxTree,
        target: &TargetSelector,
        rules: &DetectionRules,
    ) -> Result<Instrumentation> {
        let SyntaxTree { source, root } = tree;
        let mut transformer = InstrumentationTransformer {
            target,
            rules,
            source: source.as_str(),
            profiles: RandomUsageProfile::new(),
            in_target: false,
            target_seen: false,
            instrumented: None,
        };
        transformer.visit_node_mut(root)?;

        let outcome = match (transformer.target_seen, transformer.instrumented) {
            (false, _) => InstrumentOutcome::TargetNotFound,
            (true, None) => InstrumentOutcome::NoMatchingAssertion,
            (true, Some((left, right))) => InstrumentOutcome::Instrumented {
                line: target.line_number,
                left,
                right,
            },
        };
        Ok(Instrumentation {
            outcome,
            profiles: transformer.profiles,
        })
    }

    /// Rewrite for `stmt`, if it is the targeted assert.
    fn rewrite_for(&self, stmt: &AstNode) -> Result<Option<AssertRewrite>> {
        if !self.in_target || self.instrumented.is_some() || stmt.line() != self.target.line_number {
            return Ok(None);
        }
        let Some(test) = stmt.assert_test() else {
            return Ok(None);
        };
        let AstNodeKind::Compare { ops } = &test.kind else {
            return Ok(None);
        };
        if !ops.iter().all(|op| op.is_relational()) {
            return Ok(None);
        }
        let [left, right] = test.children.as_slice() else {
            return Err(ProbeError::MalformedComparison {
                function: self.target.function_name.clone(),
                line: stmt.line(),
                operands: test.children.len(),
            });
        };
        let left_label = self.label(left);
        let right_label = self.label(right);
        Ok(Some(AssertRewrite {
            diagnostics: [
                self.diagnostic(left, &left_label, stmt.span),
                self.diagnostic(right, &right_label, stmt.span),
            ],
            left: left_label,
            right: right_label,
        }))
    }

    /// Bare identifier for a variable, exact source text for anything else.
    fn label(&self, operand: &AstNode) -> String {
        match &operand.kind {
            AstNodeKind::Name { id } => id.clone(),
            _ => node_text(self.source, operand).to_string(),
        }
    }

    fn diagnostic(&self, operand: &AstNode, label: &str, before: Span) -> AstNode {
        AstNode::new(
            AstNodeKind::Diagnostic {
                message: format!("{} {}:", self.rules.log_prefix, label),
                expr: node_text(self.source, operand).to_string(),
            },
            before.anchor(),
            vec![],
        )
    }
}

struct AssertRewrite {
    diagnostics: [AstNode; 2],
    left: String,
    right: String,
}

impl VisitMut for InstrumentationTransformer<'_> {
    fn visit_function_def_mut(&mut self, node: &mut AstNode) -> Result<()> {
        let name = match &node.kind {
            AstNodeKind::FunctionDef { name } => name.clone(),
            _ => return walk_mut(self, node),
        };
        let profile = RandomnessDetector::detect(self.rules, &name, node.body().unwrap_or(&*node));
        self.profiles.insert(name.clone(), profile);

        let is_target = name == self.target.function_name;
        self.target_seen |= is_target;
        let enclosing = std::mem::replace(&mut self.in_target, is_target);
        let result = walk_mut(self, node);
        self.in_target = enclosing;
        result
    }

    fn visit_block_mut(&mut self, node: &mut AstNode) -> Result<()> {
        if !self.in_target {
            return walk_mut(self, node);
        }
        let mut i = 0;
        while i < node.children.len() {
            self.visit_node_mut(&mut node.children[i])?;
            if let Some(rewrite) = self.rewrite_for(&node.children[i])? {
                info!(
                    function = %self.target.function_name,
                    line = self.target.line_number,
                    "instrumenting assert: {} / {}", rewrite.left, rewrite.right
                );
                node.children.splice(i..i, rewrite.diagnostics);
                self.instrumented = Some((rewrite.left, rewrite.right));
                i += 2;
            }
            i += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::TreeSitterParser;
    use crate::ports::AstParser;

    fn run(src: &str, function: &str, line: usize) -> (SyntaxTree, Result<Instrumentation>) {
        let mut tree = TreeSitterParser.parse(src).unwrap();
        let result = InstrumentationTransformer::instrument(
            &mut tree,
            &TargetSelector::new(function, line),
            &DetectionRules::default(),
        );
        (tree, result)
    }

    fn diagnostics(node: &AstNode, out: &mut Vec<(String, String, usize)>) {
        if let AstNodeKind::Diagnostic { message, expr } = &node.kind {
            out.push((message.clone(), expr.clone(), node.line()));
        }
        for child in &node.children {
            diagnostics(child, out);
        }
    }

    fn collect(tree: &SyntaxTree) -> Vec<(String, String, usize)> {
        let mut out = Vec::new();
        diagnostics(&tree.root, &mut out);
        out
    }

    #[test]
    fn test_names_use_bare_identifier() {
        let src = "def test_a():\n    x = 1\n    y = 1\n    assert x == y\n";
        let (tree, result) = run(src, "test_a", 4);
        let result = result.unwrap();
        assert_eq!(
            result.outcome,
            InstrumentOutcome::Instrumented {
                line: 4,
                left: "x".to_string(),
                right: "y".to_string()
            }
        );
        assert_eq!(
            collect(&tree),
            vec![
                ("log>> x:".to_string(), "x".to_string(), 4),
                ("log>> y:".to_string(), "y".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_any_operand_shape_uses_source_text() {
        let src = "def test_b():\n    assert len(items) + 1 >= 2.5\n";
        let (tree, result) = run(src, "test_b", 2);
        assert!(result.unwrap().outcome.is_instrumented());
        let found = collect(&tree);
        assert_eq!(found[0].0, "log>> len(items) + 1:");
        assert_eq!(found[1].0, "log>> 2.5:");
        assert_eq!(found[1].1, "2.5");
    }

    #[test]
    fn test_diagnostics_precede_assert_in_block() {
        let src = "def test_c():\n    for i in range(3):\n        assert numbers[i] < numbers[i + 1]\n";
        let (tree, result) = run(src, "test_c", 3);
        assert!(result.unwrap().outcome.is_instrumented());

        let func = &tree.root.children[0];
        let loop_body = func.body().unwrap().children[0]
            .children
            .iter()
            .find(|c| c.kind == AstNodeKind::Block)
            .unwrap();
        let kinds: Vec<_> = loop_body
            .children
            .iter()
            .map(|c| matches!(c.kind, AstNodeKind::Diagnostic { .. }))
            .collect();
        assert_eq!(kinds, vec![true, true, false]);
        assert_eq!(loop_body.children[2].kind, AstNodeKind::Assert);
    }

    #[test]
    fn test_target_not_found() {
        let src = "def test_d():\n    assert a == b\n";
        let (tree, result) = run(src, "test_missing", 2);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::TargetNotFound);
        assert!(collect(&tree).is_empty());
    }

    #[test]
    fn test_line_without_comparison_passes_through() {
        let src = "def test_e():\n    flag = True\n    assert flag\n    assert a in b\n";
        let (_, result) = run(src, "test_e", 3);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::NoMatchingAssertion);
        let (_, result) = run(src, "test_e", 4);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::NoMatchingAssertion);
        let (_, result) = run(src, "test_e", 2);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::NoMatchingAssertion);
    }

    #[test]
    fn test_chained_comparison_is_rejected() {
        let src = "def test_f():\n    assert 0 < x < 10\n";
        let (_, result) = run(src, "test_f", 2);
        match result {
            Err(ProbeError::MalformedComparison { line, operands, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(operands, 3);
            }
            other => panic!("expected MalformedComparison, got {:?}", other),
        }
    }

    #[test]
    fn test_only_target_function_rewritten() {
        let src = "\
def test_g():
    assert a == b

def test_h():
    assert a == b
";
        let (tree, result) = run(src, "test_h", 2);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::NoMatchingAssertion);
        assert!(collect(&tree).is_empty());
    }

    #[test]
    fn test_nested_helper_not_rewritten() {
        let src = "\
def test_i():
    def helper():
        assert a == b
    helper()
";
        let (tree, result) = run(src, "test_i", 3);
        assert_eq!(result.unwrap().outcome, InstrumentOutcome::NoMatchingAssertion);
        assert!(collect(&tree).is_empty());
    }

    #[test]
    fn test_method_target_inside_class() {
        let src = "\
class TestJ:
    def test_m(self):
        assert self.value() != 0
";
        let (tree, result) = run(src, "test_m", 3);
        assert!(result.unwrap().outcome.is_instrumented());
        assert_eq!(collect(&tree)[0].0, "log>> self.value():");
    }

    #[test]
    fn test_profiles_cover_every_function() {
        let src = "\
def test_k():
    x = random.random()

def test_l():
    assert np.random.rand() < 1
";
        let (_, result) = run(src, "test_l", 5);
        let result = result.unwrap();
        assert!(result.outcome.is_instrumented());
        assert!(result.profiles["test_k"].uses_basic_random);
        assert!(result.profiles["test_l"].uses_numeric_library_random);
    }

    #[test]
    fn test_line_continuations_are_not_operands() {
        let src = "def test_n():\n    assert a == \\\n        b\n";
        let (_, result) = run(src, "test_n", 2);
        assert_eq!(
            result.unwrap().outcome,
            InstrumentOutcome::Instrumented {
                line: 2,
                left: "a".to_string(),
                right: "b".to_string()
            }
        );

        let src = "def test_o():\n    assert \\\n        a == b\n";
        let (tree, result) = run(src, "test_o", 2);
        assert!(result.unwrap().outcome.is_instrumented());
        assert_eq!(collect(&tree).len(), 2);
    }
}
