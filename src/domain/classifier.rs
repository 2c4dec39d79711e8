//! Assertion Classifier
//!
//! Walks a syntax tree depth-first and emits an `AssertionRecord` for every
//! assertion it recognizes. Two independent rules apply:
//!
//! 1. `assert <obj>.<method>(...)` where `method` is an approximate-comparison
//!    method -> `approximate_equality`, recorded with the statement's text.
//! 2. Any call `<obj>.<method>(...)` where `method` is in the call table ->
//!    the mapped kind, recorded with the call's text.
//!
//! A bare `assert x.allclose(y)` satisfies both and yields two records.

use crate::domain::assertion::{AssertionKind, AssertionRecord};
use crate::domain::ast::{AstNode, SyntaxTree};
use crate::domain::rules::DetectionRules;
use crate::domain::visit::{walk, Visit};

/// Innermost class and function open at the current node.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'ast> {
    class: Option<&'ast str>,
    function: Option<&'ast str>,
}

pub struct AssertionClassifier<'a> {
    tree: &'a SyntaxTree,
    rules: &'a DetectionRules,
    filepath: &'a str,
    records: Vec<AssertionRecord>,
}

impl<'a> AssertionClassifier<'a> {
    /// Classify every assertion in `tree`, in source order.
    pub fn classify(
        tree: &'a SyntaxTree,
        filepath: &'a str,
        rules: &'a DetectionRules,
    ) -> Vec<AssertionRecord> {
        let mut classifier = AssertionClassifier {
            tree,
            rules,
            filepath,
            records: Vec::new(),
        };
        classifier.visit_node(&tree.root, Scope::default());
        classifier.records
    }

    fn record(&mut self, node: &AstNode, kind: AssertionKind, scope: Scope<'_>) {
        self.records.push(AssertionRecord {
            filepath: self.filepath.to_string(),
            enclosing_class: scope.class.unwrap_or_default().to_string(),
            enclosing_function: scope.function.unwrap_or_default().to_string(),
            kind,
            line_number: node.line(),
            source_text: self.tree.text(node).to_string(),
        });
    }
}

impl<'a> Visit<'a> for AssertionClassifier<'a> {
    type Scope = Scope<'a>;

    fn visit_class_def(&mut self, node: &'a AstNode, name: &'a str, scope: Scope<'a>) {
        walk(self, node, Scope { class: Some(name), ..scope })
    }

    fn visit_function_def(&mut self, node: &'a AstNode, name: &'a str, scope: Scope<'a>) {
        walk(self, node, Scope { function: Some(name), ..scope })
    }

    fn visit_assert(&mut self, node: &'a AstNode, scope: Scope<'a>) {
        let approximate = node
            .assert_test()
            .and_then(AstNode::called_method)
            .is_some_and(|method| self.rules.is_approximate_method(method));
        if approximate {
            self.record(node, AssertionKind::ApproximateEquality, scope);
        }
        walk(self, node, scope)
    }

    fn visit_call(&mut self, node: &'a AstNode, scope: Scope<'a>) {
        if let Some(kind) = node.called_method().and_then(|m| self.rules.call_assertion(m)) {
            self.record(node, kind, scope);
        }
        walk(self, node, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::TreeSitterParser;
    use crate::ports::AstParser;

    fn classify(src: &str) -> Vec<AssertionRecord> {
        let tree = TreeSitterParser.parse(src).unwrap();
        AssertionClassifier::classify(&tree, "test_sample.py", &DetectionRules::default())
    }

    #[test]
    fn test_bare_assert_allclose_yields_two_records() {
        let records = classify("def test_a():\n    assert x.allclose(y)\n");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, AssertionKind::ApproximateEquality);
        assert_eq!(records[0].source_text, "assert x.allclose(y)");
        assert_eq!(records[0].line_number, 2);

        assert_eq!(records[1].kind, AssertionKind::AssertAllclose);
        assert_eq!(records[1].source_text, "x.allclose(y)");
        assert_eq!(records[1].line_number, 2);
        assert_eq!(records[1].enclosing_function, "test_a");
    }

    #[test]
    fn test_unittest_helpers_inside_class() {
        let src = "\
import unittest

class TestStats(unittest.TestCase):
    def test_mean(self):
        self.assertAlmostEqual(mean([1, 2]), 1.5, places=3)
        self.assertTrue(ok)

    def test_bounds(self):
        self.assertGreaterEqual(lo, 0)
";
        let records = classify(src);
        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.enclosing_class.as_str(), r.enclosing_function.as_str(), r.kind, r.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("TestStats", "test_mean", AssertionKind::AssertAlmostEqual, 5),
                ("TestStats", "test_mean", AssertionKind::AssertTrue, 6),
                ("TestStats", "test_bounds", AssertionKind::AssertGreaterEqual, 9),
            ]
        );
        assert_eq!(records[0].source_text, "self.assertAlmostEqual(mean([1, 2]), 1.5, places=3)");
    }

    #[test]
    fn test_class_context_restored_after_class_ends() {
        let src = "\
class TestA:
    def test_in_class(self):
        self.assertTrue(a)

def test_free():
    np.testing.assert_allclose(a, b)
";
        let records = classify(src);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].enclosing_class, "TestA");
        assert_eq!(records[1].enclosing_class, "");
        assert_eq!(records[1].enclosing_function, "test_free");
        assert_eq!(records[1].kind, AssertionKind::AssertAllclose);
    }

    #[test]
    fn test_nested_function_scope_is_closed_for_siblings() {
        let src = "\
def test_outer():
    def helper():
        self.assertLess(a, b)
    self.assertGreater(c, d)
";
        let records = classify(src);
        assert_eq!(records[0].enclosing_function, "helper");
        assert_eq!(records[1].enclosing_function, "test_outer");
    }

    #[test]
    fn test_module_level_call_has_empty_context() {
        let records = classify("np.testing.assert_array_less(a, b)\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].enclosing_class, "");
        assert_eq!(records[0].enclosing_function, "");
        assert_eq!(records[0].kind, AssertionKind::AssertArrayLess);
    }

    #[test]
    fn test_plain_asserts_and_unrelated_calls_ignored() {
        let src = "\
def test_plain():
    assert x == y
    assert allclose(a, b)
    self.assertEqual(a, b)
    print(x.mean())
";
        assert!(classify(src).is_empty());
    }

    #[test]
    fn test_parenthesized_assert_test_still_matches() {
        let records = classify("def test_p():\n    assert (np.allclose(a, b))\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_text, "assert (np.allclose(a, b))");
        assert_eq!(records[1].source_text, "np.allclose(a, b)");
    }

    #[test]
    fn test_multiline_call_reports_start_line() {
        let src = "\
def test_multi():
    np.testing.assert_array_almost_equal(
        actual,
        expected,
    )
";
        let records = classify(src);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line_number, 2);
        assert!(records[0].source_text.starts_with("np.testing.assert_array_almost_equal("));
        assert!(records[0].source_text.ends_with(')'));
    }

    #[test]
    fn test_line_continuation_after_assert_keyword() {
        let records = classify("def test_c():\n    assert \\\n        np.allclose(a, b)\n");
        let kinds: Vec<_> = records.iter().map(|r| (r.kind, r.line_number)).collect();
        assert_eq!(
            kinds,
            vec![
                (AssertionKind::ApproximateEquality, 2),
                (AssertionKind::AssertAllclose, 3),
            ]
        );
        assert_eq!(records[0].source_text, "assert \\\n        np.allclose(a, b)");
    }
}
