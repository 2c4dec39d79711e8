//! Error type shared by the library layers.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(
        "assert at line {line} in `{function}` compares {operands} operands -- only two-term comparisons can be instrumented"
    )]
    MalformedComparison {
        function: String,
        line: usize,
        operands: usize,
    },

    #[error("instrumented source for `{function}` no longer parses: {message}")]
    InvalidRewrite { function: String, message: String },

    #[error("failed to write assertion table: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Attach the originating file to a parse failure raised on in-memory text.
    pub fn at_path(self, file: &Path) -> Self {
        match self {
            ProbeError::Parse { message, .. } => ProbeError::Parse {
                path: file.to_path_buf(),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
