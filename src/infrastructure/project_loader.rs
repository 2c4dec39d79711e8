//! Test file discovery under a project root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &[".git", "__pycache__", ".venv", "venv", "node_modules", ".tox"];

pub struct ProjectLoader;

impl ProjectLoader {
    /// Collect every Python test file under `root`, sorted by path.
    /// A file qualifies when its name contains "test" (any case) and ends in `.py`.
    pub fn collect_test_files(root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if root.is_file() {
            if Self::is_test_file(root) {
                files.push(root.to_path_buf());
            }
            return Ok(files);
        }
        if !root.exists() {
            anyhow::bail!("Test directory {} not found", root.display());
        }
        Self::collect_py_recursive(root, &mut files)?;
        files.sort();
        Ok(files)
    }

    pub fn is_test_file(path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.ends_with(".py") && name.to_lowercase().contains("test")
    }

    fn collect_py_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        if SKIPPED_DIRS.iter().any(|skip| dir.ends_with(skip)) {
            return Ok(());
        }

        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::collect_py_recursive(&path, out)?;
            } else if Self::is_test_file(&path) {
                out.push(path);
            }
        }
        Ok(())
    }
}
