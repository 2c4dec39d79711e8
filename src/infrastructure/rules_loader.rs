//! Detection rules from defaults or a TOML override file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::rules::DetectionRules;

/// Load detection rules from a TOML file, or the built-in defaults when no
/// file is given. Keys left out of the file keep their default value.
pub fn load_rules(path: Option<&Path>) -> Result<DetectionRules> {
    let Some(path) = path else {
        return Ok(DetectionRules::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read rules file {}", path.display()))?;
    let rules: DetectionRules = toml::from_str(&content)
        .with_context(|| format!("Invalid rules file {}", path.display()))?;
    debug!(
        "loaded rules from {}: {} approximate methods, {} call assertions",
        path.display(),
        rules.approximate_methods.len(),
        rules.call_assertions.len()
    );
    Ok(rules)
}
