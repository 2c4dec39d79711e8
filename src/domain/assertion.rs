//! Assertion records produced by discovery.

use serde::{Deserialize, Serialize};

/// Semantic category of a discovered assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    /// `assert <obj>.<closeness method>(...)`
    ApproximateEquality,
    AssertAllclose,
    AssertAlmostEqual,
    AssertApproxEqual,
    AssertArrayAlmostEqual,
    AssertArrayLess,
    AssertTrue,
    AssertFalse,
    AssertGreater,
    AssertGreaterEqual,
    AssertLess,
    AssertLessEqual,
}

impl AssertionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertionKind::ApproximateEquality => "approximate_equality",
            AssertionKind::AssertAllclose => "assert_allclose",
            AssertionKind::AssertAlmostEqual => "assert_almost_equal",
            AssertionKind::AssertApproxEqual => "assert_approx_equal",
            AssertionKind::AssertArrayAlmostEqual => "assert_array_almost_equal",
            AssertionKind::AssertArrayLess => "assert_array_less",
            AssertionKind::AssertTrue => "assert_true",
            AssertionKind::AssertFalse => "assert_false",
            AssertionKind::AssertGreater => "assert_greater",
            AssertionKind::AssertGreaterEqual => "assert_greater_equal",
            AssertionKind::AssertLess => "assert_less",
            AssertionKind::AssertLessEqual => "assert_less_equal",
        }
    }
}

impl std::fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One assertion occurrence in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRecord {
    pub filepath: String,
    /// Nearest enclosing class, empty at module level.
    pub enclosing_class: String,
    /// Nearest enclosing function, empty at module level.
    pub enclosing_function: String,
    pub kind: AssertionKind,
    /// 1-based line of the node `source_text` was taken from.
    pub line_number: usize,
    pub source_text: String,
}
