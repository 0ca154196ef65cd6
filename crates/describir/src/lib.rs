//! Describir: declarative BDD-style test trees with hooks, tags, and a
//! pluggable reporter contract.
//!
//! A suite is declared as an immutable tree of nested blocks, each carrying
//! lifecycle hooks, a run behavior (`Normal`/`Skip`/`Only`), and tags. Pure
//! tree transforms narrow the suite before anything runs, and a synchronous
//! engine walks what survives, delivering every outcome through the
//! [`Reporter`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────┐
//! │ Block tree   │    │ Transforms    │    │ Engine       │
//! │ (builder,    │───►│ tag/expr →    │───►│ hooks, skip  │
//! │  immutable)  │    │ only → empty  │    │ propagation  │
//! └──────────────┘    └───────────────┘    └──────┬───────┘
//!                                                 │ events
//!                                          ┌──────▼───────┐
//!                                          │ Reporter     │
//!                                          │ console/JUnit│
//!                                          └──────────────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use describir::{Block, ConsoleReporter, run};
//!
//! let suite = Block::build(|root| {
//!     root.block("stack", |stack| {
//!         stack.test("push then pop", || {
//!             let mut v = vec![1];
//!             v.push(2);
//!             assert_eq!(v.pop(), Some(2));
//!             Ok(())
//!         });
//!         stack.pending("handles capacity overflow");
//!     });
//! });
//!
//! let summary = run(&suite, &mut ConsoleReporter::new(Vec::new()));
//! assert_eq!(summary.passed, 1);
//! assert_eq!(summary.pending, 1);
//! assert!(summary.success());
//! ```
//!
//! Filtering by tag or by boolean tag expression happens before execution;
//! tests a filter removes produce no events at all:
//!
//! ```
//! use describir::{Block, NullReporter, run_filtered, Test, TestFilter};
//!
//! let suite = Block::build(|root| {
//!     root.push_test(Test::new("fast").with_tag("smoke").with_action(|| Ok(())));
//!     root.push_test(Test::new("slow").with_tag("nightly").with_action(|| Ok(())));
//! });
//!
//! let filter = TestFilter::expression("not(nightly)").unwrap();
//! let summary = run_filtered(&suite, &filter, &mut NullReporter);
//! assert_eq!(summary.total(), 1);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod behavior;
mod engine;
mod expr;
mod filter;
mod reporter;
mod result;
mod tag;
mod tree;

pub use behavior::Behavior;
pub use engine::{run, run_filtered, RunSummary};
pub use expr::TagExpr;
pub use filter::{empty_filter, expression_filter, only_filter, tag_filter, TestFilter};
pub use reporter::{
    ConsoleReporter, Failure, NullReporter, RecordingReporter, ReportCollector, Reporter, RunEvent,
    TestRecord, TestStatus,
};
pub use result::{DescribirError, DescribirResult};
pub use tag::TagSet;
pub use tree::{Action, Block, BlockBuilder, Hook, HookKind, Test};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::behavior::Behavior;
    pub use super::engine::{run, run_filtered, RunSummary};
    pub use super::expr::TagExpr;
    pub use super::filter::{
        empty_filter, expression_filter, only_filter, tag_filter, TestFilter,
    };
    pub use super::reporter::{
        ConsoleReporter, Failure, NullReporter, RecordingReporter, ReportCollector, Reporter,
        RunEvent, TestRecord, TestStatus,
    };
    pub use super::result::{DescribirError, DescribirResult};
    pub use super::tag::TagSet;
    pub use super::tree::{Action, Block, BlockBuilder, Hook, HookKind, Test};
}
