//! Detection Rules Module
//!
//! The method names, module aliases and log prefix the analyses match against.
//! Defaults cover numpy / unittest / TensorFlow style test suites; a TOML
//! file can override any subset (see `infrastructure::rules_loader`).

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::domain::assertion::AssertionKind;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    /// Methods that make `assert <obj>.<method>(...)` an approximate assertion.
    pub approximate_methods: BTreeSet<String>,
    /// Assertion helper method name -> kind, matched on any attribute call.
    pub call_assertions: BTreeMap<String, AssertionKind>,
    /// Names bound to the standard randomness module.
    pub basic_random_modules: BTreeSet<String>,
    /// Names bound to the numeric library.
    pub numeric_aliases: BTreeSet<String>,
    /// Randomness submodule of the numeric library (`np.random`).
    pub random_submodule: String,
    /// Prefix of every diagnostic line printed by instrumented code.
    pub log_prefix: String,
}

const APPROXIMATE_METHODS: &[&str] = &[
    "allclose",
    "assert_allclose",
    "assertAlmostEqual",
    "assert_approx_equal",
    "assert_array_almost_equal",
    "assert_array_less",
    "assertAllClose",
];

const CALL_ASSERTIONS: &[(&str, AssertionKind)] = &[
    ("allclose", AssertionKind::AssertAllclose),
    ("assert_allclose", AssertionKind::AssertAllclose),
    ("assertAlmostEqual", AssertionKind::AssertAlmostEqual),
    ("assert_approx_equal", AssertionKind::AssertApproxEqual),
    ("assert_array_almost_equal", AssertionKind::AssertArrayAlmostEqual),
    ("assert_array_less", AssertionKind::AssertArrayLess),
    ("assertTrue", AssertionKind::AssertTrue),
    ("assertFalse", AssertionKind::AssertFalse),
    ("assertGreater", AssertionKind::AssertGreater),
    ("assertGreaterEqual", AssertionKind::AssertGreaterEqual),
    ("assertLess", AssertionKind::AssertLess),
    ("assertLessEqual", AssertionKind::AssertLessEqual),
    ("assertAllClose", AssertionKind::AssertAllclose),
];

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            approximate_methods: APPROXIMATE_METHODS.iter().map(|m| m.to_string()).collect(),
            call_assertions: CALL_ASSERTIONS
                .iter()
                .map(|(m, k)| (m.to_string(), *k))
                .collect(),
            basic_random_modules: BTreeSet::from(["random".to_string()]),
            numeric_aliases: BTreeSet::from(["np".to_string(), "numpy".to_string()]),
            random_submodule: "random".to_string(),
            log_prefix: "log>>".to_string(),
        }
    }
}

impl DetectionRules {
    pub fn is_approximate_method(&self, method: &str) -> bool {
        self.approximate_methods.contains(method)
    }

    pub fn call_assertion(&self, method: &str) -> Option<AssertionKind> {
        self.call_assertions.get(method).copied()
    }
}
