//! Tree execution: the runner walk, skip propagation, and run accounting.
//!
//! Execution mirrors the filtered tree with one runner per block. A runner
//! owns a single one-way flag: it starts `true` for blocks declared
//! [`Behavior::Skip`](crate::Behavior::Skip) and is set, permanently, the
//! first time one of the block's own `Before` or `BeforeEach` hooks fails.
//! A block is *active* when neither it nor any ancestor is flagged at entry.
//!
//! The walk is depth-first and fully synchronous. Per block: report
//! block-start, run `Before` hooks if active, run own tests, recurse into
//! children, run `After` hooks if active at entry, report block-end. Gating
//! `After` on the entry snapshot means a block whose own `Before` failed
//! still gets its `After`, while a block that was skipped on entry never
//! runs either.
//!
//! Each test walks the runner chain from the root: every level runs its
//! `BeforeEach` before descending and its own `AfterEach` on the way back
//! out, so teardown is onion-symmetric even when an inner level fails.
//! Failures inside hooks and tests are captured locally, returned errors and
//! panics alike, and converted into reporter events; nothing a test does can
//! abort the run.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::filter::TestFilter;
use crate::reporter::{Failure, Reporter};
use crate::result::DescribirResult;
use crate::tree::{Action, Block, HookKind, Test};

/// Aggregate outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests whose action completed successfully
    pub passed: usize,
    /// Tests whose action returned an error or panicked
    pub failed: usize,
    /// Tests skipped by behavior, scope, or an earlier hook failure
    pub skipped: usize,
    /// Tests declared without an action
    pub pending: usize,
    /// Hook actions that failed, at any lifecycle position
    pub hook_failures: usize,
    /// Wall-clock time for the whole run
    pub duration: Duration,
}

impl RunSummary {
    /// Number of tests the run accounted for
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.pending
    }

    /// True when no test and no hook failed
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failed == 0 && self.hook_failures == 0
    }

    /// Conventional process exit code: zero on success, one otherwise
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Execution-time counterpart of one block.
struct BlockRunner<'a> {
    block: &'a Block,
    /// One-way: set by this block's own `Before`/`BeforeEach` failing,
    /// never cleared
    skipped: Cell<bool>,
}

impl<'a> BlockRunner<'a> {
    fn new(block: &'a Block) -> Self {
        Self {
            block,
            skipped: Cell::new(block.behavior().is_skip()),
        }
    }
}

/// Invoke an action, capturing returned errors and panics uniformly
fn capture(run: impl FnOnce() -> DescribirResult<()>) -> Result<(), Failure> {
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(Failure::from_error(&error)),
        Err(payload) => Err(Failure::from_panic(payload.as_ref())),
    }
}

struct Engine<'r, R: Reporter> {
    reporter: &'r mut R,
    summary: RunSummary,
}

impl<'r, R: Reporter> Engine<'r, R> {
    /// One block: hooks, own tests, children, in that order. The last runner
    /// in `chain` is the block being executed.
    fn execute_block<'a>(&mut self, chain: &mut Vec<BlockRunner<'a>>) {
        let depth = chain.len() - 1;
        let block = chain[depth].block;
        let ancestors: Vec<&'a Block> = chain[..depth].iter().map(|r| r.block).collect();

        // Snapshot taken before any hook runs; After gating uses this value
        // even if this block's own Before fails below.
        let active = !chain.iter().any(|r| r.skipped.get());
        tracing::trace!(
            block = block.description().unwrap_or("(root)"),
            active,
            "entering block"
        );

        self.reporter.block_started(block, &ancestors);

        if active {
            for hook in block.hooks(HookKind::Before) {
                if let Err(failure) = capture(|| hook.invoke()) {
                    chain[depth].skipped.set(true);
                    self.summary.hook_failures += 1;
                    tracing::debug!(
                        block = block.description().unwrap_or("(root)"),
                        error = %failure,
                        "before hook failed, skipping remainder of block"
                    );
                    self.reporter
                        .block_hook_failed(hook, block, &ancestors, &failure);
                    break;
                }
            }
        }

        let scope: Vec<&'a Block> = chain.iter().map(|r| r.block).collect();
        for test in block.tests() {
            // Pending wins over skip: a bodiless test reports pending even
            // inside a skipped scope.
            let Some(action) = test.action() else {
                self.summary.pending += 1;
                self.reporter.test_pending(test, &scope);
                continue;
            };
            if chain.iter().any(|r| r.skipped.get()) || test.behavior().is_skip() {
                self.summary.skipped += 1;
                self.reporter.test_skipped(test, &scope);
                continue;
            }
            self.run_test(chain, 0, test, action);
        }

        for child in block.children() {
            chain.push(BlockRunner::new(child));
            self.execute_block(chain);
            chain.pop();
        }

        if active {
            for hook in block.hooks(HookKind::After) {
                if let Err(failure) = capture(|| hook.invoke()) {
                    self.summary.hook_failures += 1;
                    self.reporter
                        .block_hook_failed(hook, block, &ancestors, &failure);
                    break;
                }
            }
        }

        self.reporter.block_finished(block, &ancestors);
    }

    /// Walk the chain from the root toward the test's owner. Each level runs
    /// its `BeforeEach` on the way down and its own `AfterEach` on the way
    /// back out, whether or not anything deeper succeeded.
    fn run_test<'a>(
        &mut self,
        chain: &[BlockRunner<'a>],
        level: usize,
        test: &'a Test,
        action: &Action,
    ) {
        let runner = &chain[level];
        let block = runner.block;
        let hook_scope: Vec<&'a Block> = chain[..=level].iter().map(|r| r.block).collect();

        let mut entered = true;
        for hook in block.hooks(HookKind::BeforeEach) {
            if let Err(failure) = capture(|| hook.invoke()) {
                runner.skipped.set(true);
                self.summary.hook_failures += 1;
                tracing::debug!(
                    test = test.description(),
                    error = %failure,
                    "beforeEach hook failed, skipping test and remainder of block"
                );
                self.reporter
                    .test_hook_failed(hook, test, &hook_scope, &failure);

                let owner_scope: Vec<&'a Block> = chain.iter().map(|r| r.block).collect();
                self.summary.skipped += 1;
                self.reporter.test_skipped(test, &owner_scope);
                entered = false;
                break;
            }
        }

        if entered {
            if level + 1 < chain.len() {
                self.run_test(chain, level + 1, test, action);
            } else {
                self.invoke_test(test, action, &hook_scope);
            }
        }

        for hook in block.hooks(HookKind::AfterEach) {
            if let Err(failure) = capture(|| hook.invoke()) {
                self.summary.hook_failures += 1;
                self.reporter
                    .test_hook_failed(hook, test, &hook_scope, &failure);
                break;
            }
        }
    }

    fn invoke_test(&mut self, test: &Test, action: &Action, scope: &[&Block]) {
        tracing::trace!(test = test.description(), "invoking test action");
        self.reporter.test_started(test, scope);

        let started = Instant::now();
        let outcome = capture(|| (action)());
        let duration = started.elapsed();

        match outcome {
            Ok(()) => {
                self.summary.passed += 1;
                self.reporter.test_passed(test, scope, duration);
            }
            Err(failure) => {
                self.summary.failed += 1;
                self.reporter.test_failed(test, scope, &failure, duration);
            }
        }
        self.reporter.test_finished(test, scope);
    }
}

/// Execute a suite with only the implicit transforms applied.
///
/// `Only` focus and empty-block pruning still happen; no tag or expression
/// filter is involved. Equivalent to [`run_filtered`] with
/// [`TestFilter::All`].
///
/// # Example
///
/// ```
/// use describir::{Block, NullReporter, run};
///
/// let suite = Block::build(|root| {
///     root.block("math", |math| {
///         math.test("adds", || {
///             assert_eq!(2 + 2, 4);
///             Ok(())
///         });
///     });
/// });
///
/// let summary = run(&suite, &mut NullReporter);
/// assert_eq!(summary.passed, 1);
/// assert!(summary.success());
/// ```
pub fn run<R: Reporter>(root: &Block, reporter: &mut R) -> RunSummary {
    run_filtered(root, &TestFilter::All, reporter)
}

/// Apply `filter` to the suite, then execute whatever survives.
///
/// Tests removed by the filter produce no reporter events at all. The
/// reporter sees the filtered tree in [`Reporter::run_started`] and tree
/// order after that.
pub fn run_filtered<R: Reporter>(
    root: &Block,
    filter: &TestFilter,
    reporter: &mut R,
) -> RunSummary {
    let tree = filter.apply(root);
    tracing::debug!(
        declared = root.test_count(),
        surviving = tree.test_count(),
        "starting run"
    );

    let started = Instant::now();
    let mut engine = Engine {
        reporter,
        summary: RunSummary::default(),
    };
    engine.reporter.run_started(&tree);

    let mut chain = vec![BlockRunner::new(&tree)];
    engine.execute_block(&mut chain);

    engine.summary.duration = started.elapsed();
    engine.reporter.run_finished(&engine.summary);

    let summary = engine.summary;
    tracing::debug!(
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        pending = summary.pending,
        hook_failures = summary.hook_failures,
        "run finished"
    );
    summary
}
