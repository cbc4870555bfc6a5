//! Running extracted test cases against the extracted solution.
//!
//! [`PythonTestRunner`] pipes the solution plus a generated harness into a
//! Python interpreter on stdin. The harness loads the solution into its own
//! namespace, picks the entry point (a `Solution` class method or the first
//! top-level function) and prints one marked JSON line per case. Anything
//! else the solution prints is ignored.
//!
//! The run is bounded by a timeout and the child is killed when it expires.
//! Generated code runs with the privileges of the current user.

use crate::errors::TestRunError;
use crate::extract::TestCase;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Interpreter used when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Wall-clock budget for one problem's test run.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of every harness result line on stdout.
const RESULT_MARKER: &str = "@@solveflow-case@@";

const HARNESS: &str = r#"import json
import sys

MARKER = "@@solveflow-case@@"
METHODS = ("isMatch", "twoSum", "reverseList", "search", "sortArray")


def emit(record):
    sys.stdout.write(MARKER + json.dumps(record) + "\n")
    sys.stdout.flush()


payload = json.loads(__PAYLOAD__)
namespace = {"__name__": "solution"}
try:
    exec(compile(payload["solution"], "<solution>", "exec"), namespace)
except BaseException as exc:
    emit({"fatal": "solution failed to load: %s: %s" % (type(exc).__name__, exc)})
    sys.exit(0)

func = None
cls = namespace.get("Solution")
if isinstance(cls, type):
    instance = cls()
    for name in METHODS:
        if hasattr(instance, name):
            func = getattr(instance, name)
            break
    if func is None:
        public = [n for n in vars(cls) if not n.startswith("_") and callable(getattr(instance, n))]
        if public:
            func = getattr(instance, public[0])
else:
    for name, obj in namespace.items():
        if (
            callable(obj)
            and not isinstance(obj, type)
            and not name.startswith("_")
            and getattr(obj, "__module__", None) == "solution"
        ):
            func = obj
            break

if func is None:
    emit({"fatal": "no solution function or class found"})
    sys.exit(0)

for index, case in enumerate(payload["cases"], 1):
    try:
        raw = case["input"].strip()
        value = eval(raw, {})
        args = list(value) if raw.startswith("(") and isinstance(value, tuple) else [value]
        expected = eval(case["expected"].strip(), {})
        actual = func(*args)
        emit({"index": index, "passed": actual == expected, "actual": repr(actual)})
    except Exception as exc:
        emit({"index": index, "error": "%s: %s" % (type(exc).__name__, exc)})
"#;

/// The outcome of one test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// The solution returned the expected value.
    Passed {
        /// `repr` of the returned value.
        actual: String,
    },
    /// The solution returned something else.
    Failed {
        /// `repr` of the returned value.
        actual: String,
    },
    /// The case could not be evaluated or the solution raised.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl CaseOutcome {
    /// Returns true if the case passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// One case together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// The case that was run.
    pub case: TestCase,
    /// What happened.
    pub outcome: CaseOutcome,
}

/// The result of running a problem's test cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestReport {
    /// There was nothing to run.
    NotRun {
        /// Why nothing ran.
        reason: String,
    },
    /// The cases could not be run at all.
    Error {
        /// What went wrong.
        message: String,
    },
    /// Every case was attempted.
    Completed {
        /// Per-case results in extraction order.
        results: Vec<CaseResult>,
    },
}

impl TestReport {
    /// Returns the number of passed cases.
    #[must_use]
    pub fn passed(&self) -> usize {
        match self {
            Self::Completed { results } => results.iter().filter(|r| r.outcome.is_passed()).count(),
            _ => 0,
        }
    }

    /// Returns the number of attempted cases.
    #[must_use]
    pub fn total(&self) -> usize {
        match self {
            Self::Completed { results } => results.len(),
            _ => 0,
        }
    }

    /// Returns true if at least one case ran and every case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.total() > 0 && self.passed() == self.total()
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRun { reason } => writeln!(f, "{reason}"),
            Self::Error { message } => writeln!(f, "Error running tests: {message}"),
            Self::Completed { results } => {
                for (i, result) in results.iter().enumerate() {
                    let n = i + 1;
                    match &result.outcome {
                        CaseOutcome::Passed { actual } | CaseOutcome::Failed { actual } => {
                            writeln!(f, "Test Case {n}:")?;
                            writeln!(f, "Input: {}", result.case.input)?;
                            writeln!(f, "Expected: {}", result.case.expected)?;
                            writeln!(f, "Actual: {actual}")?;
                            let status = if result.outcome.is_passed() { "PASSED" } else { "FAILED" };
                            writeln!(f, "Status: {status}")?;
                        }
                        CaseOutcome::Error { message } => {
                            writeln!(f, "Test Case {n} Error: {message}")?;
                            writeln!(f, "Input: {}", result.case.input)?;
                            writeln!(f, "Expected: {}", result.case.expected)?;
                        }
                    }
                    writeln!(f)?;
                }
                writeln!(f, "Test Summary: {}/{} tests passed", self.passed(), self.total())
            }
        }
    }
}

/// Runs test cases against a solution.
///
/// Failures are reported inside the [`TestReport`]; a broken test run never
/// fails the problem's persistence.
#[async_trait]
pub trait TestRunner: Send + Sync + fmt::Debug {
    /// Runs `cases` against `solution`.
    async fn run(&self, solution: &str, cases: &[TestCase]) -> TestReport;
}

/// Runs Python solutions in a child interpreter.
#[derive(Debug, Clone)]
pub struct PythonTestRunner {
    interpreter: PathBuf,
    timeout: Duration,
}

impl Default for PythonTestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonTestRunner {
    /// Uses `python3` from `PATH` and a 30s budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            timeout: DEFAULT_TEST_TIMEOUT,
        }
    }

    /// Sets the interpreter.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the time budget for one run.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the interpreter.
    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Builds the script fed to the interpreter.
    ///
    /// The payload is embedded as a JSON string literal, which Python parses
    /// as an ordinary string.
    pub fn harness(solution: &str, cases: &[TestCase]) -> Result<String, TestRunError> {
        let payload = serde_json::to_string(&json!({ "solution": solution, "cases": cases }))?;
        let literal = serde_json::to_string(&payload)?;
        Ok(HARNESS.replace("__PAYLOAD__", &literal))
    }

    async fn execute(&self, script: String) -> Result<Output, TestRunError> {
        let mut child = Command::new(&self.interpreter)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TestRunError::Spawn {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(script.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(TestRunError::Timeout(self.timeout)),
        }
    }

    async fn try_run(&self, solution: &str, cases: &[TestCase]) -> Result<TestReport, TestRunError> {
        let output = self.execute(Self::harness(solution, cases)?).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let reported = stdout.lines().any(|line| line.starts_with(RESULT_MARKER));
        if !reported && !output.status.success() {
            return Err(TestRunError::Exited {
                status: output.status.to_string(),
                stderr: last_line(&stderr).to_string(),
            });
        }
        Ok(parse_report(&stdout, &stderr, cases))
    }
}

#[async_trait]
impl TestRunner for PythonTestRunner {
    async fn run(&self, solution: &str, cases: &[TestCase]) -> TestReport {
        if solution.trim().is_empty() || cases.is_empty() {
            debug!("Nothing to test");
            return TestReport::NotRun {
                reason: "No solution code or test cases found.".to_string(),
            };
        }

        info!(cases = cases.len(), interpreter = %self.interpreter.display(), "Running test cases");
        match self.try_run(solution, cases).await {
            Ok(report) => {
                info!(passed = report.passed(), total = report.total(), "Test run finished");
                report
            }
            Err(err) => {
                warn!(error = %err, "Test run failed");
                TestReport::Error {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct HarnessRecord {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    passed: Option<bool>,
    #[serde(default)]
    actual: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    fatal: Option<String>,
}

/// Turns harness output into a report. Cases without a result line are
/// reported as errors.
fn parse_report(stdout: &str, stderr: &str, cases: &[TestCase]) -> TestReport {
    let mut outcomes: Vec<Option<CaseOutcome>> = vec![None; cases.len()];

    for line in stdout.lines() {
        let Some(body) = line.strip_prefix(RESULT_MARKER) else {
            continue;
        };
        let record: HarnessRecord = match serde_json::from_str(body) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "Unreadable harness line");
                continue;
            }
        };
        if let Some(message) = record.fatal {
            return TestReport::Error { message };
        }
        let Some(slot) = record
            .index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| outcomes.get_mut(i))
        else {
            continue;
        };
        let actual = record.actual.unwrap_or_default();
        *slot = Some(match (record.error, record.passed) {
            (Some(message), _) => CaseOutcome::Error { message },
            (None, Some(true)) => CaseOutcome::Passed { actual },
            (None, _) => CaseOutcome::Failed { actual },
        });
    }

    let missing = format!("no result reported ({})", last_line(stderr));
    let results = cases
        .iter()
        .zip(outcomes)
        .map(|(case, outcome)| CaseResult {
            case: case.clone(),
            outcome: outcome.unwrap_or_else(|| CaseOutcome::Error {
                message: missing.clone(),
            }),
        })
        .collect();
    TestReport::Completed { results }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}
