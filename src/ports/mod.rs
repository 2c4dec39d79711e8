//! Traits at the seams between the use cases and their adapters.

use std::path::{Path, PathBuf};

use crate::domain::assertion::AssertionRecord;
use crate::domain::ast::SyntaxTree;
use crate::error::Result;

pub trait AstParser: Send + Sync {
    /// Parse source text; a syntactically invalid input is a `ProbeError::Parse`.
    fn parse(&self, src: &str) -> Result<SyntaxTree>;
}

pub trait Unparser {
    fn unparse(&self, tree: &SyntaxTree) -> String;
}

pub trait RecordExporter {
    fn export(&self, records: &[AssertionRecord], path: &Path) -> Result<()>;
}

pub trait TestExecutor {
    /// Run `test_name` from `file` `iterations` times, capturing output in
    /// `log_path`. Returns where the log went.
    fn run_test(
        &self,
        file: &Path,
        test_name: &str,
        iterations: usize,
        log_path: &Path,
    ) -> anyhow::Result<PathBuf>;
}
