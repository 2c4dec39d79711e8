//! Use cases for Assert Probe: discovery and instrumentation, wired to the ports.

pub mod batch;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::assertion::AssertionRecord;
use crate::domain::classifier::AssertionClassifier;
use crate::domain::instrument::{
    InstrumentOutcome, Instrumentation, InstrumentationTransformer, TargetSelector,
};
use crate::domain::randomness::{self, RandomUsageProfile};
use crate::domain::rules::DetectionRules;
use crate::error::{ProbeError, Result};
use crate::ports::{AstParser, RecordExporter, Unparser};

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ProbeError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

pub struct AssertionScanner<'a> {
    pub parser: &'a dyn AstParser,
    pub rules: &'a DetectionRules,
}

impl<'a> AssertionScanner<'a> {
    /// Classify one file. Only an unreadable file is an error; invalid
    /// Python is logged and yields no records.
    pub fn classify_file(&self, path: &Path) -> Result<Vec<AssertionRecord>> {
        let source = read_source(path)?;
        Ok(self.classify_source(&source, &path.display().to_string()))
    }

    pub fn classify_source(&self, source: &str, filepath: &str) -> Vec<AssertionRecord> {
        if source.trim().is_empty() {
            return Vec::new();
        }
        match self.parser.parse(source) {
            Ok(tree) => {
                let records = AssertionClassifier::classify(&tree, filepath, self.rules);
                debug!("{}: {} assertions", filepath, records.len());
                records
            }
            Err(e) => {
                warn!("skipping {}: {}", filepath, e.at_path(Path::new(filepath)));
                Vec::new()
            }
        }
    }

    /// Classify `files` in parallel on the global pool. Records come back in
    /// the order of `files`; files that cannot be read are logged and skipped.
    pub fn discover(&self, files: &[PathBuf]) -> Vec<AssertionRecord> {
        let per_file: Vec<Vec<AssertionRecord>> = files
            .par_iter()
            .map(|path| {
                self.classify_file(path).unwrap_or_else(|e| {
                    warn!("{}", e);
                    Vec::new()
                })
            })
            .collect();
        per_file.into_iter().flatten().collect()
    }
}

pub struct DiscoverUsecase<'a> {
    pub scanner: AssertionScanner<'a>,
    pub exporter: &'a dyn RecordExporter,
}

impl<'a> DiscoverUsecase<'a> {
    /// Scan `files` and write the table to `export_path`. Returns the number of records.
    pub fn run(&self, files: &[PathBuf], export_path: &Path) -> Result<usize> {
        let records = self.scanner.discover(files);
        self.exporter.export(&records, export_path)?;
        Ok(records.len())
    }
}

/// Rewritten text plus what the transformer found.
#[derive(Debug, Clone)]
pub struct InstrumentResult {
    pub source: String,
    pub outcome: InstrumentOutcome,
    pub profiles: RandomUsageProfile,
}

pub struct InstrumentUsecase<'a> {
    pub parser: &'a dyn AstParser,
    pub unparser: &'a dyn Unparser,
    pub rules: &'a DetectionRules,
}

impl<'a> InstrumentUsecase<'a> {
    pub fn instrument_file(&self, path: &Path, target: &TargetSelector) -> Result<InstrumentResult> {
        let source = read_source(path)?;
        self.instrument_source(&source, target)
            .map_err(|e| e.at_path(path))
    }

    /// Instrument `source` at `target`. Unlike discovery, invalid Python is an
    /// error here. The rewritten text is re-parsed before it is returned.
    pub fn instrument_source(&self, source: &str, target: &TargetSelector) -> Result<InstrumentResult> {
        let mut tree = self.parser.parse(source)?;
        let Instrumentation { outcome, profiles } =
            InstrumentationTransformer::instrument(&mut tree, target, self.rules)?;

        if !outcome.is_instrumented() {
            return Ok(InstrumentResult {
                source: tree.source,
                outcome,
                profiles,
            });
        }

        let rewritten = self.unparser.unparse(&tree);
        if let Err(e) = self.parser.parse(&rewritten) {
            let message = match e {
                ProbeError::Parse { message, .. } => message,
                other => other.to_string(),
            };
            return Err(ProbeError::InvalidRewrite {
                function: target.function_name.clone(),
                message,
            });
        }
        Ok(InstrumentResult {
            source: rewritten,
            outcome,
            profiles,
        })
    }

    pub fn random_usage_profile(&self, source: &str) -> Result<RandomUsageProfile> {
        let tree = self.parser.parse(source)?;
        Ok(randomness::random_usage_profile(&tree, self.rules))
    }
}

/// `instrumented_<name>` beside `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("instrumented_{}", name))
}

/// `test_logs_<test_name>.txt` in the working directory.
pub fn default_log_path(test_name: &str) -> PathBuf {
    PathBuf::from(format!("test_logs_{}.txt", test_name))
}
