//! Randomness Detection
//!
//! Decides, per function, whether its body calls into the standard `random`
//! module or the numeric library's RNG. Only attribute calls count:
//!
//! - `random.randint(..)`          -> basic
//! - `np.zeros(..)`                -> numeric (any call on the library alias)
//! - `np.random.rand()`            -> numeric (two-level access through `.random`)

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::ast::{AstNode, AstNodeKind, SyntaxTree};
use crate::domain::rules::DetectionRules;
use crate::domain::visit::{walk, Visit};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionRandomnessProfile {
    pub function_name: String,
    pub uses_basic_random: bool,
    pub uses_numeric_library_random: bool,
}

impl FunctionRandomnessProfile {
    pub fn uses_any_random(&self) -> bool {
        self.uses_basic_random || self.uses_numeric_library_random
    }
}

/// Profiles keyed by function name. A later definition with the same name
/// replaces the earlier one.
pub type RandomUsageProfile = BTreeMap<String, FunctionRandomnessProfile>;

pub struct RandomnessDetector<'r> {
    rules: &'r DetectionRules,
    profile: FunctionRandomnessProfile,
}

impl<'r> RandomnessDetector<'r> {
    /// Inspect every call reachable from `body`.
    pub fn detect(rules: &'r DetectionRules, function_name: &str, body: &AstNode) -> FunctionRandomnessProfile {
        let mut detector = RandomnessDetector {
            rules,
            profile: FunctionRandomnessProfile {
                function_name: function_name.to_string(),
                ..Default::default()
            },
        };
        detector.visit_node(body, ());
        detector.profile
    }

    fn inspect_call(&mut self, call: &AstNode) {
        let Some(callee) = call.callee() else { return };
        let AstNodeKind::Attribute { attr } = &callee.kind else { return };
        let Some(receiver) = callee.receiver() else { return };

        match &receiver.kind {
            AstNodeKind::Name { id } if self.rules.basic_random_modules.contains(id) => {
                debug!(function = %self.profile.function_name, "random usage: {}.{}", id, attr);
                self.profile.uses_basic_random = true;
            }
            AstNodeKind::Name { id } if self.rules.numeric_aliases.contains(id) => {
                debug!(function = %self.profile.function_name, "numeric library usage: {}.{}", id, attr);
                self.profile.uses_numeric_library_random = true;
            }
            AstNodeKind::Attribute { attr: submodule } if *submodule == self.rules.random_submodule => {
                if let Some(AstNodeKind::Name { id }) = receiver.receiver().map(|r| &r.kind) {
                    if self.rules.numeric_aliases.contains(id) {
                        debug!(
                            function = %self.profile.function_name,
                            "numeric random usage: {}.{}.{}", id, submodule, attr
                        );
                        self.profile.uses_numeric_library_random = true;
                    }
                }
            }
            _ => {}
        }
    }
}

impl<'ast> Visit<'ast> for RandomnessDetector<'_> {
    type Scope = ();

    fn visit_call(&mut self, node: &'ast AstNode, scope: ()) {
        self.inspect_call(node);
        walk(self, node, scope)
    }
}

/// Profile every function definition in `tree`, nested ones included.
pub fn random_usage_profile(tree: &SyntaxTree, rules: &DetectionRules) -> RandomUsageProfile {
    struct Collector<'r> {
        rules: &'r DetectionRules,
        profiles: RandomUsageProfile,
    }

    impl<'ast> Visit<'ast> for Collector<'_> {
        type Scope = ();

        fn visit_function_def(&mut self, node: &'ast AstNode, name: &'ast str, scope: ()) {
            let profile = RandomnessDetector::detect(self.rules, name, node.body().unwrap_or(node));
            self.profiles.insert(name.to_string(), profile);
            walk(self, node, scope)
        }
    }

    let mut collector = Collector {
        rules,
        profiles: RandomUsageProfile::new(),
    };
    collector.visit_node(&tree.root, ());
    collector.profiles
}
