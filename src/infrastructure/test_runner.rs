//! Repeated pytest execution.
//!
//! Runs a single test several times and appends every iteration's captured
//! output to one log file, so intermittent (flaky) values printed by the
//! instrumented asserts can be compared side by side.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::ports::TestExecutor;

pub const DEFAULT_ITERATIONS: usize = 10;
const PAUSE_BETWEEN_RUNS: Duration = Duration::from_millis(100);
const SEPARATOR_WIDTH: usize = 80;

/// Describes the command that will be run for one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Build the pytest invocation selecting `test_name` in `file`.
pub fn build_command_spec(file: &Path, test_name: &str) -> CommandSpec {
    CommandSpec {
        program: "pytest".to_string(),
        args: vec![
            file.display().to_string(),
            "-k".to_string(),
            test_name.to_string(),
            "-s".to_string(),
        ],
    }
}

/// One iteration's log entry.
pub fn format_iteration(iteration: usize, stdout: &str, stderr: &str) -> String {
    format!(
        "Iteration {}:\n{}{}\n{}\n",
        iteration,
        stdout,
        stderr,
        "=".repeat(SEPARATOR_WIDTH)
    )
}

pub struct TestRunner {
    spec: CommandSpec,
}

impl TestRunner {
    pub fn new(file: &Path, test_name: &str) -> Self {
        Self {
            spec: build_command_spec(file, test_name),
        }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Run the test `iterations` times, appending output to `log_path`.
    /// A failing test is not an error; only a command that cannot start is.
    pub fn run_repeatedly(&self, iterations: usize, log_path: &Path) -> Result<PathBuf> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        for i in 1..=iterations {
            let output = Command::new(&self.spec.program)
                .args(&self.spec.args)
                .output()
                .with_context(|| format!("Failed to execute {}", self.spec.program))?;
            debug!("iteration {} exited with {:?}", i, output.status.code());

            let entry = format_iteration(
                i,
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            );
            log.write_all(entry.as_bytes())
                .with_context(|| format!("Failed to write log file {}", log_path.display()))?;

            if i < iterations {
                thread::sleep(PAUSE_BETWEEN_RUNS);
            }
        }

        info!("ran {} iterations, output in {}", iterations, log_path.display());
        Ok(log_path.to_path_buf())
    }
}

/// `TestExecutor` that shells out to pytest through a `TestRunner`.
pub struct PytestExecutor;

impl TestExecutor for PytestExecutor {
    fn run_test(
        &self,
        file: &Path,
        test_name: &str,
        iterations: usize,
        log_path: &Path,
    ) -> Result<PathBuf> {
        TestRunner::new(file, test_name).run_repeatedly(iterations, log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_spec() {
        let spec = build_command_spec(Path::new("tests/test_example.py"), "test_function2");
        assert_eq!(spec.program, "pytest");
        assert_eq!(
            spec.args,
            vec!["tests/test_example.py", "-k", "test_function2", "-s"]
        );
    }

    #[test]
    fn test_format_iteration() {
        let entry = format_iteration(3, "log>> x: 1\n", "");
        let expected = format!("Iteration 3:\nlog>> x: 1\n\n{}\n", "=".repeat(80));
        assert_eq!(entry, expected);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TestRunner {
            spec: CommandSpec {
                program: "definitely-not-a-real-program-xyz".to_string(),
                args: vec![],
            },
        };
        let err = runner
            .run_repeatedly(1, &dir.path().join("log.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }

    #[test]
    fn test_zero_iterations_creates_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        let runner = TestRunner::new(Path::new("test_x.py"), "test_x");
        assert_eq!(runner.run_repeatedly(0, &log).unwrap(), log);
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "");
    }

    #[test]
    fn test_pytest_executor_writes_requested_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("nested_log.txt");
        let written = PytestExecutor
            .run_test(Path::new("test_x.py"), "test_x", 0, &log)
            .unwrap();
        assert_eq!(written, log);
        assert!(log.exists());
    }
}
