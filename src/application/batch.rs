//! Batch processing of a discovered assertion table.
//!
//! A seeded sample of rows is drawn without replacement; each sampled
//! assertion is instrumented beside its file and the test is re-run with
//! the instrumented copy. Rows whose file no longer exists are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::application::{default_log_path, default_output_path, InstrumentUsecase};
use crate::domain::assertion::AssertionRecord;
use crate::domain::instrument::{InstrumentOutcome, TargetSelector};
use crate::ports::TestExecutor;

pub const DEFAULT_SAMPLE: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

/// Pick `count` records without replacement, reproducibly for a given `seed`.
/// Asking for more rows than exist returns all of them. Table order is kept.
pub fn sample_records(records: &[AssertionRecord], count: usize, seed: u64) -> Vec<AssertionRecord> {
    let amount = count.min(records.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, records.len(), amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| records[i].clone()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Ran { instrumented: PathBuf, log: PathBuf },
    MissingFile,
    NotInstrumented(InstrumentOutcome),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub record: AssertionRecord,
    pub status: BatchStatus,
}

pub struct BatchUsecase<'a> {
    pub instrumenter: InstrumentUsecase<'a>,
    pub executor: &'a dyn TestExecutor,
    pub iterations: usize,
    /// Directory receiving `test_logs_<test>.txt`.
    pub log_dir: &'a Path,
}

impl<'a> BatchUsecase<'a> {
    /// Process every record in order. A failing row is reported in its entry
    /// and never stops the batch.
    pub fn run(&self, records: &[AssertionRecord]) -> Vec<BatchEntry> {
        records
            .iter()
            .map(|record| BatchEntry {
                record: record.clone(),
                status: self.process(record),
            })
            .collect()
    }

    fn process(&self, record: &AssertionRecord) -> BatchStatus {
        let file = Path::new(&record.filepath);
        if !file.is_file() {
            warn!("skipping {}:{}: file not found", record.filepath, record.line_number);
            return BatchStatus::MissingFile;
        }

        let target = TargetSelector::new(record.enclosing_function.as_str(), record.line_number);
        let result = match self.instrumenter.instrument_file(file, &target) {
            Ok(result) => result,
            Err(e) => {
                warn!("skipping {}:{}: {}", record.filepath, record.line_number, e);
                return BatchStatus::Failed(e.to_string());
            }
        };
        if !result.outcome.is_instrumented() {
            warn!(
                "skipping {}:{}: nothing to instrument in `{}` ({:?})",
                record.filepath, record.line_number, record.enclosing_function, result.outcome
            );
            return BatchStatus::NotInstrumented(result.outcome);
        }

        let instrumented = default_output_path(file);
        if let Err(e) = fs::write(&instrumented, &result.source) {
            warn!("cannot write {}: {}", instrumented.display(), e);
            return BatchStatus::Failed(e.to_string());
        }

        let log = self.log_dir.join(default_log_path(&record.enclosing_function));
        match self
            .executor
            .run_test(&instrumented, &record.enclosing_function, self.iterations, &log)
        {
            Ok(log) => {
                info!("{}: logs in {}", record.enclosing_function, log.display());
                BatchStatus::Ran { instrumented, log }
            }
            Err(e) => {
                warn!("running `{}` failed: {:#}", record.enclosing_function, e);
                BatchStatus::Failed(format!("{:#}", e))
            }
        }
    }
}
