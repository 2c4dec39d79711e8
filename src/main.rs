//! Command-line entry point for Assert Probe.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use assert_probe::application::batch::{
    sample_records, BatchStatus, BatchUsecase, DEFAULT_SAMPLE, DEFAULT_SEED,
};
use assert_probe::application::{
    default_log_path, default_output_path, AssertionScanner, DiscoverUsecase, InstrumentResult,
    InstrumentUsecase,
};
use assert_probe::domain::instrument::{InstrumentOutcome, TargetSelector};
use assert_probe::domain::rules::DetectionRules;
use assert_probe::infrastructure::concurrency::init_thread_pool;
use assert_probe::infrastructure::project_loader::ProjectLoader;
use assert_probe::infrastructure::rules_loader::load_rules;
use assert_probe::infrastructure::test_runner::{PytestExecutor, TestRunner, DEFAULT_ITERATIONS};
use assert_probe::infrastructure::{CsvExporter, SpliceUnparser, TreeSitterParser};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find approximate assertions in Python tests and instrument them", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan test files for assertions and write them to a CSV table
    Discover {
        /// Directory to search for test files
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Individual test file (can specify multiple)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Output CSV path
        #[arg(short, long, default_value = "assertions.csv")]
        output: PathBuf,

        /// Detection rules (TOML)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Worker threads (default: half the cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Insert operand prints before the assert at LINE of TEST_NAME
    Instrument {
        file: PathBuf,
        test_name: String,
        line: usize,

        /// Output path (default: instrumented_<file> beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Print the per-function randomness profile as JSON
    Profile {
        file: PathBuf,

        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Instrument, then run the test repeatedly with pytest
    Run {
        file: PathBuf,
        test_name: String,
        line: usize,

        #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,

        /// Log file (default: test_logs_<test_name>.txt)
        #[arg(long)]
        log: Option<PathBuf>,

        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Instrument and run a random sample of rows from a discovery table
    Process {
        /// CSV table written by `discover`
        table: PathBuf,

        /// Rows to sample (all rows if the table is smaller)
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE)]
        sample: usize,

        /// Seed for the row sample
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        #[arg(short = 'n', long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,

        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Discover { root, file, output, rules, jobs } => {
            discover(root.as_deref(), file, &output, rules.as_deref(), jobs)
        }
        Command::Instrument { file, test_name, line, output, rules } => {
            let rules = load_rules(rules.as_deref())?;
            let output = output.unwrap_or_else(|| default_output_path(&file));
            instrument_to(&file, &TargetSelector::new(test_name, line), &output, &rules)?;
            Ok(())
        }
        Command::Profile { file, rules } => {
            let rules = load_rules(rules.as_deref())?;
            let source = fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let usecase = InstrumentUsecase {
                parser: &TreeSitterParser,
                unparser: &SpliceUnparser,
                rules: &rules,
            };
            let profile = usecase
                .random_usage_profile(&source)
                .map_err(|e| e.at_path(&file))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Command::Run { file, test_name, line, iterations, log, rules } => {
            let rules = load_rules(rules.as_deref())?;
            let output = default_output_path(&file);
            let target = TargetSelector::new(test_name.as_str(), line);
            let result = instrument_to(&file, &target, &output, &rules)?;
            require_instrumented(&result.outcome, &target, &file)?;

            let log = log.unwrap_or_else(|| default_log_path(&test_name));
            let log = TestRunner::new(&output, &test_name).run_repeatedly(iterations, &log)?;
            println!("Logs written to {}", log.display());
            Ok(())
        }
        Command::Process { table, sample, seed, iterations, rules } => {
            process(&table, sample, seed, iterations, rules.as_deref())
        }
    }
}

/// Running pytest on an unchanged copy would log nothing useful.
fn require_instrumented(outcome: &InstrumentOutcome, target: &TargetSelector, file: &Path) -> Result<()> {
    match outcome {
        InstrumentOutcome::Instrumented { .. } => Ok(()),
        InstrumentOutcome::NoMatchingAssertion => anyhow::bail!(
            "`{}` has no two-term comparison assert on line {} of {}; not running pytest",
            target.function_name,
            target.line_number,
            file.display()
        ),
        InstrumentOutcome::TargetNotFound => anyhow::bail!(
            "no function named `{}` in {}; not running pytest",
            target.function_name,
            file.display()
        ),
    }
}

fn process(table: &Path, sample: usize, seed: u64, iterations: usize, rules: Option<&Path>) -> Result<()> {
    let rules = load_rules(rules)?;
    let records = CsvExporter::load(table)
        .with_context(|| format!("Failed to read {}", table.display()))?;
    let picked = sample_records(&records, sample, seed);
    info!("processing {} of {} assertions (seed {})", picked.len(), records.len(), seed);

    let usecase = BatchUsecase {
        instrumenter: InstrumentUsecase {
            parser: &TreeSitterParser,
            unparser: &SpliceUnparser,
            rules: &rules,
        },
        executor: &PytestExecutor,
        iterations,
        log_dir: Path::new("."),
    };
    let entries = usecase.run(&picked);

    let ran = entries
        .iter()
        .filter(|e| matches!(e.status, BatchStatus::Ran { .. }))
        .count();
    for entry in &entries {
        if let BatchStatus::Ran { log, .. } = &entry.status {
            println!(
                "{}:{} {} -> {}",
                entry.record.filepath,
                entry.record.line_number,
                entry.record.enclosing_function,
                log.display()
            );
        }
    }
    println!("Ran {} of {} sampled assertions", ran, entries.len());
    Ok(())
}

fn discover(
    root: Option<&Path>,
    extra: Vec<PathBuf>,
    output: &Path,
    rules: Option<&Path>,
    jobs: Option<usize>,
) -> Result<()> {
    let rules = load_rules(rules)?;

    let mut files = extra;
    if let Some(root) = root {
        files.extend(ProjectLoader::collect_test_files(root)?);
    }
    if files.is_empty() {
        anyhow::bail!("Please provide --root <dir> or at least one --file <test file>");
    }
    files.sort();
    files.dedup();
    info!("scanning {} test files", files.len());

    init_thread_pool(jobs)?;

    let usecase = DiscoverUsecase {
        scanner: AssertionScanner {
            parser: &TreeSitterParser,
            rules: &rules,
        },
        exporter: &CsvExporter,
    };
    let count = usecase
        .run(&files, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Found {} assertions, written to {}", count, output.display());
    Ok(())
}

fn instrument_to(
    file: &Path,
    target: &TargetSelector,
    output: &Path,
    rules: &DetectionRules,
) -> Result<InstrumentResult> {
    let usecase = InstrumentUsecase {
        parser: &TreeSitterParser,
        unparser: &SpliceUnparser,
        rules,
    };
    let result = usecase
        .instrument_file(file, target)
        .with_context(|| format!("Failed to instrument {}", file.display()))?;

    match &result.outcome {
        InstrumentOutcome::Instrumented { line, left, right } => {
            info!("line {}: logging `{}` and `{}`", line, left, right)
        }
        InstrumentOutcome::NoMatchingAssertion => warn!(
            "`{}` has no two-term comparison assert on line {}; output is unchanged",
            target.function_name, target.line_number
        ),
        InstrumentOutcome::TargetNotFound => warn!(
            "no function named `{}` in {}; output is unchanged",
            target.function_name,
            file.display()
        ),
    }
    for profile in result.profiles.values().filter(|p| p.uses_any_random()) {
        info!(
            "`{}` uses randomness (basic: {}, numeric: {})",
            profile.function_name, profile.uses_basic_random, profile.uses_numeric_library_random
        );
    }

    fs::write(output, &result.source)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Instrumented source written to {}", output.display());
    Ok(result)
}
