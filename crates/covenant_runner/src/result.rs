//! Test outcomes: assertion records, statuses, the result event wire format
//! and the aggregated run outcome.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use yansi::Paint;

/// The checks the data-compliance mode evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataContractKind {
    Equality,
    HashConsistency,
    Symmetry,
    Consistency,
    Reflexivity,
    NotNullEquality,
    Structure,
}

/// Which rule an assertion record was produced by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule_kind")]
pub enum AssertionRule {
    /// A declared constraint annotation.
    Annotation { name: String },
    /// Sanity of constructor invocation during setup.
    ConstructorSanity,
    /// A framework-initiated defensive check.
    DefensiveCheck,
    /// One of the data-contract rules.
    DataContract { kind: DataContractKind },
    /// A plain assertion inside a user test body.
    StandardAssertion,
    /// An exception type thrown by user code.
    UserException { type_name: String },
    /// A framework or platform error type.
    SystemError { type_name: String },
    /// Invalid user configuration.
    ConfigurationError,
}

impl fmt::Display for AssertionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation { name } => write!(f, "Annotation({name})"),
            Self::ConstructorSanity => f.write_str("ConstructorSanity"),
            Self::DefensiveCheck => f.write_str("DefensiveCheck"),
            Self::DataContract { kind } => write!(f, "DataContract({kind:?})"),
            Self::StandardAssertion => f.write_str("StandardAssertion"),
            Self::UserException { type_name } => write!(f, "UserException({type_name})"),
            Self::SystemError { type_name } => write!(f, "SystemError({type_name})"),
            Self::ConfigurationError => f.write_str("ConfigurationError"),
        }
    }
}

/// Where a record points in user code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceLocation {
    Exact {
        file: String,
        line: u32,
        class: String,
        method: String,
    },
    Approximate {
        class: String,
        display: String,
    },
    Unknown,
    NotCaptured,
}

impl SourceLocation {
    /// Clickable coordinate when one exists.
    pub fn render(&self) -> String {
        match self {
            Self::Exact {
                file, line, method, ..
            } => format!("{file}:{line} ({method})"),
            Self::Approximate { class, .. } => format!("~{class}"),
            Self::Unknown => "<unknown>".to_owned(),
            Self::NotCaptured => "<not captured>".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Passed,
    Failed,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

/// One evaluated assertion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub status: RecordStatus,
    pub rule: AssertionRule,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub location: SourceLocation,
}

impl AssertionRecord {
    pub fn passed(rule: AssertionRule, message: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Passed,
            rule,
            message: message.into(),
            expected: None,
            actual: None,
            location: SourceLocation::NotCaptured,
        }
    }

    pub fn failed(rule: AssertionRule, message: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Failed,
            rule,
            message: message.into(),
            expected: None,
            actual: None,
            location: SourceLocation::NotCaptured,
        }
    }

    pub fn with_comparison(
        mut self,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        self.expected = expected;
        self.actual = actual;
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == RecordStatus::Failed
    }
}

/// What one scenario execution produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionResult {
    pub records: Vec<AssertionRecord>,
    /// Namespaced argument snapshots in key code-point order. On a crash the
    /// scenario trace holds the authoritative copy; on success this one
    /// takes precedence.
    pub arguments: BTreeMap<String, String>,
    pub seed: i64,
}

/// Final classification of a test run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TestStatus {
    Passed,
    AssertionFailed {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    ExecutionError {
        cause: String,
        message: String,
    },
    Disabled,
    Aborted {
        reason: String,
    },
}

impl TestStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::AssertionFailed { .. } => "FAILED",
            Self::ExecutionError { .. } => "ERROR",
            Self::Disabled => "DISABLED",
            Self::Aborted { .. } => "ABORTED",
        }
    }
}

/// The published result of one run, serialized to JSON for subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultEvent {
    pub run_id: Uuid,
    pub test_name: String,
    pub worker_id: usize,
    pub seed: i64,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub journal_path: String,
    pub timestamp: i64,
}

/// The outcome of one target's run.
#[derive(Clone, Debug)]
pub struct TargetResult {
    pub test_name: String,
    pub status: TestStatus,
    pub execution: ExecutionResult,
    pub duration: Duration,
    pub journal_path: String,
    pub warnings: Vec<String>,
}

impl TargetResult {
    pub fn short_result(&self) -> String {
        let label = match &self.status {
            TestStatus::Passed => "[PASS]".green().to_string(),
            TestStatus::Disabled => "[SKIP]".yellow().to_string(),
            TestStatus::Aborted { reason } => format!("[ABORT: {reason}]").yellow().to_string(),
            TestStatus::AssertionFailed { message, .. } => {
                format!("[FAIL: {message}]").red().to_string()
            }
            TestStatus::ExecutionError { cause, message } => {
                format!("[ERROR: {cause}: {message}]").red().to_string()
            }
        };
        format!("{label} {} ({:.2?})", self.test_name, self.duration)
    }
}

/// The aggregated outcome of a whole run, keyed by target FQN.
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub results: BTreeMap<String, TargetResult>,
}

impl RunOutcome {
    pub fn new(results: BTreeMap<String, TargetResult>) -> Self {
        Self { results }
    }

    pub fn passed(&self) -> usize {
        self.statuses(TestStatus::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.statuses(|status| {
            matches!(
                status,
                TestStatus::AssertionFailed { .. } | TestStatus::ExecutionError { .. }
            )
        })
    }

    pub fn aborted(&self) -> usize {
        self.statuses(|status| matches!(status, TestStatus::Aborted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.statuses(|status| matches!(status, TestStatus::Disabled))
    }

    /// Sums up the durations of the individual runs. Not the wall clock time
    /// of the whole session, which fans out over workers.
    pub fn total_time(&self) -> Duration {
        self.results.values().map(|result| result.duration).sum()
    }

    pub fn summary(&self, wall_clock: Duration) -> String {
        let total = self.results.len();
        format!(
            "\nRan {} test{} in {:.2?} ({:.2?} CPU time): {} passed, {} failed, {} aborted, {} skipped",
            total,
            if total == 1 { "" } else { "s" },
            wall_clock,
            self.total_time(),
            self.passed().green(),
            self.failed().red(),
            self.aborted().yellow(),
            self.skipped().yellow(),
        )
    }

    fn statuses(&self, predicate: impl Fn(&TestStatus) -> bool) -> usize {
        self.results
            .values()
            .filter(|result| predicate(&result.status))
            .count()
    }
}
