//! The reporter contract and the bundled reporter implementations.
//!
//! The engine never formats anything itself: every outcome is delivered
//! through the [`Reporter`] trait, synchronously, on the calling thread.
//! Events arrive in tree order and each one carries the root-first chain of
//! enclosing blocks, so a reporter can reconstruct nesting without keeping
//! state of its own.
//!
//! Bundled implementations:
//! - [`NullReporter`] discards everything;
//! - [`RecordingReporter`] keeps an owned [`RunEvent`] log;
//! - [`ConsoleReporter`] streams indented text to any writer;
//! - [`ReportCollector`] gathers [`TestRecord`] rows and renders JUnit XML or
//!   JSON for CI consumption.

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::engine::RunSummary;
use crate::result::{DescribirError, DescribirResult};
use crate::tree::{Block, Hook, HookKind, Test};

/// Test outcome as visible to reporters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
    /// Test is pending
    Pending,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// What went wrong in a test or hook action.
///
/// Returned errors and panics are both captured into this one shape; the
/// engine does not distinguish assertion-style faults from any other fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Human-readable failure message
    pub message: String,
}

impl Failure {
    /// Create a failure from a message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Create a failure from an error value
    #[must_use]
    pub fn from_error(error: &DescribirError) -> Self {
        Self::new(error.to_string())
    }

    /// Create a failure from a caught panic payload
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&str>() {
            Self::new(*message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            Self::new(message.clone())
        } else {
            Self::new("panicked with a non-string payload")
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Observer of a single run.
///
/// Every callback has a no-op default body, so implementations override only
/// what they care about. For block events `ancestors` excludes the block
/// itself; for test events it ends with the owning block; for
/// [`test_hook_failed`](Reporter::test_hook_failed) it ends with the block
/// whose hook failed.
pub trait Reporter {
    /// The run is about to start; `root` is the filtered tree
    fn run_started(&mut self, _root: &Block) {}

    /// Entering a block
    fn block_started(&mut self, _block: &Block, _ancestors: &[&Block]) {}

    /// Leaving a block
    fn block_finished(&mut self, _block: &Block, _ancestors: &[&Block]) {}

    /// A test body is about to be invoked
    fn test_started(&mut self, _test: &Test, _ancestors: &[&Block]) {}

    /// The test body returned successfully
    fn test_passed(&mut self, _test: &Test, _ancestors: &[&Block], _duration: Duration) {}

    /// The test body failed or panicked
    fn test_failed(
        &mut self,
        _test: &Test,
        _ancestors: &[&Block],
        _failure: &Failure,
        _duration: Duration,
    ) {
    }

    /// The test body finished, pass or fail
    fn test_finished(&mut self, _test: &Test, _ancestors: &[&Block]) {}

    /// The test was not invoked because its scope is skipped
    fn test_skipped(&mut self, _test: &Test, _ancestors: &[&Block]) {}

    /// The test has no body
    fn test_pending(&mut self, _test: &Test, _ancestors: &[&Block]) {}

    /// A `Before` or `After` hook of `block` failed
    fn block_hook_failed(
        &mut self,
        _hook: &Hook,
        _block: &Block,
        _ancestors: &[&Block],
        _failure: &Failure,
    ) {
    }

    /// A `BeforeEach` or `AfterEach` hook failed while running `test`
    fn test_hook_failed(
        &mut self,
        _hook: &Hook,
        _test: &Test,
        _ancestors: &[&Block],
        _failure: &Failure,
    ) {
    }

    /// The run is over
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Join named ancestors and a leaf description into one display name
fn qualified_name(ancestors: &[&Block], leaf: &str) -> String {
    let mut name = String::new();
    for block in ancestors {
        if let Some(description) = block.description() {
            name.push_str(description);
            name.push_str(" > ");
        }
    }
    name.push_str(leaf);
    name
}

/// Indentation depth: one level per named enclosing block
fn indent_depth(ancestors: &[&Block]) -> usize {
    ancestors.iter().filter(|b| b.description().is_some()).count()
}

// ============================================================================
// NullReporter
// ============================================================================

/// Discards every event. Useful as a baseline and in benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

// ============================================================================
// RecordingReporter
// ============================================================================

/// One reporter callback, captured as plain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    /// Run began with this many tests in the filtered tree
    RunStarted {
        /// Tests the filtered tree contains
        total_tests: usize,
    },
    /// Entered a block; `None` names the root
    BlockStarted {
        /// Block description
        name: Option<String>,
        /// Named nesting depth
        depth: usize,
    },
    /// A test body is about to run
    TestStarted {
        /// Test description
        name: String,
    },
    /// A test body succeeded
    TestPassed {
        /// Test description
        name: String,
    },
    /// A test body failed
    TestFailed {
        /// Test description
        name: String,
        /// Failure message
        message: String,
    },
    /// A test body finished
    TestFinished {
        /// Test description
        name: String,
    },
    /// A test was skipped
    TestSkipped {
        /// Test description
        name: String,
    },
    /// A test is pending
    TestPending {
        /// Test description
        name: String,
    },
    /// A block-scoped hook failed
    BlockHookFailed {
        /// Owning block description; `None` for the root
        block: Option<String>,
        /// Lifecycle position of the failing hook
        kind: HookKind,
        /// Failure message
        message: String,
    },
    /// A test-scoped hook failed
    TestHookFailed {
        /// The test the hook was running for
        test: String,
        /// Lifecycle position of the failing hook
        kind: HookKind,
        /// Failure message
        message: String,
    },
    /// Left a block
    BlockFinished {
        /// Block description
        name: Option<String>,
        /// Named nesting depth
        depth: usize,
    },
    /// Run ended
    RunFinished,
}

/// Keeps every event as an owned [`RunEvent`].
///
/// The scenario tests are built on this, and host adapters can replay the log
/// into their own protocol.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Vec<RunEvent>,
}

impl RecordingReporter {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured events, in arrival order
    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Consume the recorder, returning the captured events
    #[must_use]
    pub fn into_events(self) -> Vec<RunEvent> {
        self.events
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self, root: &Block) {
        self.events.push(RunEvent::RunStarted {
            total_tests: root.test_count(),
        });
    }

    fn block_started(&mut self, block: &Block, ancestors: &[&Block]) {
        self.events.push(RunEvent::BlockStarted {
            name: block.description().map(String::from),
            depth: indent_depth(ancestors),
        });
    }

    fn block_finished(&mut self, block: &Block, ancestors: &[&Block]) {
        self.events.push(RunEvent::BlockFinished {
            name: block.description().map(String::from),
            depth: indent_depth(ancestors),
        });
    }

    fn test_started(&mut self, test: &Test, _ancestors: &[&Block]) {
        self.events.push(RunEvent::TestStarted {
            name: test.description().to_string(),
        });
    }

    fn test_passed(&mut self, test: &Test, _ancestors: &[&Block], _duration: Duration) {
        self.events.push(RunEvent::TestPassed {
            name: test.description().to_string(),
        });
    }

    fn test_failed(
        &mut self,
        test: &Test,
        _ancestors: &[&Block],
        failure: &Failure,
        _duration: Duration,
    ) {
        self.events.push(RunEvent::TestFailed {
            name: test.description().to_string(),
            message: failure.message.clone(),
        });
    }

    fn test_finished(&mut self, test: &Test, _ancestors: &[&Block]) {
        self.events.push(RunEvent::TestFinished {
            name: test.description().to_string(),
        });
    }

    fn test_skipped(&mut self, test: &Test, _ancestors: &[&Block]) {
        self.events.push(RunEvent::TestSkipped {
            name: test.description().to_string(),
        });
    }

    fn test_pending(&mut self, test: &Test, _ancestors: &[&Block]) {
        self.events.push(RunEvent::TestPending {
            name: test.description().to_string(),
        });
    }

    fn block_hook_failed(
        &mut self,
        hook: &Hook,
        block: &Block,
        _ancestors: &[&Block],
        failure: &Failure,
    ) {
        self.events.push(RunEvent::BlockHookFailed {
            block: block.description().map(String::from),
            kind: hook.kind(),
            message: failure.message.clone(),
        });
    }

    fn test_hook_failed(
        &mut self,
        hook: &Hook,
        test: &Test,
        _ancestors: &[&Block],
        failure: &Failure,
    ) {
        self.events.push(RunEvent::TestHookFailed {
            test: test.description().to_string(),
            kind: hook.kind(),
            message: failure.message.clone(),
        });
    }

    fn run_finished(&mut self, _summary: &RunSummary) {
        self.events.push(RunEvent::RunFinished);
    }
}

// ============================================================================
// ConsoleReporter
// ============================================================================

/// Streams an indented text rendition of the run to any writer.
///
/// Write errors are ignored; reporting is best effort and must never disturb
/// the run.
#[derive(Debug)]
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    /// Console reporter writing to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Console reporter writing to `out`
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer, e.g. a captured buffer in tests
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, depth: usize, text: &str) {
        let _ = writeln!(self.out, "{:indent$}{text}", "", indent = depth * 2);
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self, root: &Block) {
        self.line(0, &format!("running {} tests", root.test_count()));
    }

    fn block_started(&mut self, block: &Block, ancestors: &[&Block]) {
        if let Some(name) = block.description() {
            self.line(indent_depth(ancestors), name);
        }
    }

    fn test_passed(&mut self, test: &Test, ancestors: &[&Block], duration: Duration) {
        self.line(
            indent_depth(ancestors),
            &format!(
                "pass  {} ({:.1}ms)",
                test.description(),
                duration.as_secs_f64() * 1000.0
            ),
        );
    }

    fn test_failed(
        &mut self,
        test: &Test,
        ancestors: &[&Block],
        failure: &Failure,
        _duration: Duration,
    ) {
        self.line(
            indent_depth(ancestors),
            &format!("FAIL  {}: {}", test.description(), failure.message),
        );
    }

    fn test_skipped(&mut self, test: &Test, ancestors: &[&Block]) {
        self.line(indent_depth(ancestors), &format!("skip  {}", test.description()));
    }

    fn test_pending(&mut self, test: &Test, ancestors: &[&Block]) {
        self.line(indent_depth(ancestors), &format!("pend  {}", test.description()));
    }

    fn block_hook_failed(
        &mut self,
        hook: &Hook,
        block: &Block,
        ancestors: &[&Block],
        failure: &Failure,
    ) {
        let scope = block.description().unwrap_or("(root)");
        self.line(
            indent_depth(ancestors),
            &format!(
                "HOOK FAIL  {} hook{} in \"{}\": {}",
                hook.kind(),
                hook.label().map(|l| format!(" \"{l}\"")).unwrap_or_default(),
                scope,
                failure.message
            ),
        );
    }

    fn test_hook_failed(
        &mut self,
        hook: &Hook,
        test: &Test,
        ancestors: &[&Block],
        failure: &Failure,
    ) {
        self.line(
            indent_depth(ancestors),
            &format!(
                "HOOK FAIL  {} hook{} for \"{}\": {}",
                hook.kind(),
                hook.label().map(|l| format!(" \"{l}\"")).unwrap_or_default(),
                test.description(),
                failure.message
            ),
        );
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.line(
            0,
            &format!(
                "{} passed, {} failed, {} skipped, {} pending, {} hook failures in {:.2}s",
                summary.passed,
                summary.failed,
                summary.skipped,
                summary.pending,
                summary.hook_failures,
                summary.duration.as_secs_f64()
            ),
        );
    }
}

// ============================================================================
// ReportCollector
// ============================================================================

/// One finished test, as a report row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    /// Fully qualified test name, ancestors joined with `>`
    pub name: String,
    /// Final status
    pub status: TestStatus,
    /// Body duration; zero for skipped and pending tests
    pub duration: Duration,
    /// Failure message, if the test failed
    pub error: Option<String>,
    /// When the record was created
    pub timestamp: SystemTime,
}

impl TestRecord {
    /// Create a passing record
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration,
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a failing record
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            duration,
            error: Some(error.into()),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a skipped record
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Skipped,
            duration: Duration::ZERO,
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a pending record
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Pending,
            duration: Duration::ZERO,
            error: None,
            timestamp: SystemTime::now(),
        }
    }
}

/// Serialized shape of a JSON report
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    suite: &'a str,
    tests: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    pending: usize,
    records: &'a [TestRecord],
    hook_failures: &'a [String],
}

/// Collects test rows during a run and renders CI-friendly reports.
///
/// # Example
///
/// ```
/// use describir::{Block, ReportCollector, run};
///
/// let suite = Block::build(|root| {
///     root.test("works", || Ok(()));
/// });
/// let mut collector = ReportCollector::new().with_name("smoke");
/// run(&suite, &mut collector);
///
/// assert!(collector.all_passed());
/// assert!(collector.render_junit().contains(r#"<testsuite name="smoke""#));
/// ```
#[derive(Debug, Clone)]
pub struct ReportCollector {
    suite_name: String,
    records: Vec<TestRecord>,
    hook_failures: Vec<String>,
}

impl Default for ReportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            suite_name: "describir".to_string(),
            records: Vec::new(),
            hook_failures: Vec::new(),
        }
    }

    /// Set the suite name used in reports
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// The collected rows, in completion order
    #[must_use]
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Messages of every hook failure observed
    #[must_use]
    pub fn hook_failures(&self) -> &[String] {
        &self.hook_failures
    }

    fn count(&self, status: TestStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Number of passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Number of failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Number of skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    /// Number of pending tests
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(TestStatus::Pending)
    }

    /// Total number of rows
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.records.len()
    }

    /// True when nothing failed, hooks included
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0 && self.hook_failures.is_empty()
    }

    /// Sum of recorded body durations
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(|r| r.duration).sum()
    }

    /// One-line summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed, {} skipped, {} pending, {} hook failures",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.skipped_count(),
            self.pending_count(),
            self.hook_failures.len()
        )
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.skipped_count() + self.pending_count(),
            self.total_duration().as_secs_f64()
        ));
        xml.push('\n');

        for record in &self.records {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&record.name),
                record.duration.as_secs_f64()
            ));
            xml.push('\n');

            match record.status {
                TestStatus::Failed => {
                    let error = record.error.as_deref().unwrap_or("test failed");
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(error),
                        escape_xml(error)
                    ));
                    xml.push('\n');
                }
                TestStatus::Skipped => {
                    xml.push_str("    <skipped/>\n");
                }
                TestStatus::Pending => {
                    xml.push_str(r#"    <skipped message="pending"/>"#);
                    xml.push('\n');
                }
                TestStatus::Passed => {}
            }

            xml.push_str("  </testcase>\n");
        }

        if !self.hook_failures.is_empty() {
            xml.push_str("  <system-err>");
            for (i, message) in self.hook_failures.iter().enumerate() {
                if i > 0 {
                    xml.push('\n');
                }
                xml.push_str(&escape_xml(message));
            }
            xml.push_str("</system-err>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Write JUnit XML for CI integration
    ///
    /// # Errors
    ///
    /// Returns an error if file writing fails
    pub fn generate_junit(&self, output_path: &Path) -> DescribirResult<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }

    /// Render the report as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn render_json(&self) -> DescribirResult<String> {
        let report = JsonReport {
            suite: &self.suite_name,
            tests: self.total_count(),
            passed: self.passed_count(),
            failed: self.failed_count(),
            skipped: self.skipped_count(),
            pending: self.pending_count(),
            records: &self.records,
            hook_failures: &self.hook_failures,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Write the JSON report
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails
    pub fn generate_json(&self, output_path: &Path) -> DescribirResult<()> {
        std::fs::write(output_path, self.render_json()?)?;
        Ok(())
    }
}

impl Reporter for ReportCollector {
    fn test_passed(&mut self, test: &Test, ancestors: &[&Block], duration: Duration) {
        self.records.push(TestRecord::passed(
            qualified_name(ancestors, test.description()),
            duration,
        ));
    }

    fn test_failed(
        &mut self,
        test: &Test,
        ancestors: &[&Block],
        failure: &Failure,
        duration: Duration,
    ) {
        self.records.push(TestRecord::failed(
            qualified_name(ancestors, test.description()),
            duration,
            failure.message.clone(),
        ));
    }

    fn test_skipped(&mut self, test: &Test, ancestors: &[&Block]) {
        self.records.push(TestRecord::skipped(qualified_name(
            ancestors,
            test.description(),
        )));
    }

    fn test_pending(&mut self, test: &Test, ancestors: &[&Block]) {
        self.records.push(TestRecord::pending(qualified_name(
            ancestors,
            test.description(),
        )));
    }

    fn block_hook_failed(
        &mut self,
        hook: &Hook,
        block: &Block,
        _ancestors: &[&Block],
        failure: &Failure,
    ) {
        self.hook_failures.push(format!(
            "{} hook in \"{}\" failed: {}",
            hook.kind(),
            block.description().unwrap_or("(root)"),
            failure.message
        ));
    }

    fn test_hook_failed(
        &mut self,
        hook: &Hook,
        test: &Test,
        _ancestors: &[&Block],
        failure: &Failure,
    ) {
        self.hook_failures.push(format!(
            "{} hook for \"{}\" failed: {}",
            hook.kind(),
            test.description(),
            failure.message
        ));
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
