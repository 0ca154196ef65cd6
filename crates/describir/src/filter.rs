//! Pre-execution tree transforms and the run filter configuration.
//!
//! Every transform is a pure `Block -> Block` function; the input tree is
//! never mutated. [`TestFilter::apply`] runs the full pipeline in its fixed
//! order: the caller's tag or expression filter, then [`only_filter`], then
//! [`empty_filter`]. Tests removed here are invisible to the engine and
//! produce no reporter events at all.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expr::TagExpr;
use crate::result::DescribirResult;
use crate::tag::TagSet;
use crate::tree::Block;

/// Apply focus-mode pruning.
///
/// When nothing in the tree is [`Only`](crate::Behavior::Only) the tree is
/// returned unchanged. Otherwise a block marked `Only` survives whole, and
/// any other block keeps only its own `Only` tests plus the pruned children
/// that contain an `Only` mark somewhere beneath them.
#[must_use]
pub fn only_filter(block: &Block) -> Block {
    if contains_only(block) {
        prune_to_only(block)
    } else {
        block.clone()
    }
}

fn contains_only(block: &Block) -> bool {
    block.behavior().is_only()
        || block.tests().iter().any(|t| t.behavior().is_only())
        || block.children().iter().any(contains_only)
}

fn prune_to_only(block: &Block) -> Block {
    // An Only block keeps its whole subtree, unfiltered.
    if block.behavior().is_only() {
        return block.clone();
    }
    let tests = block
        .tests()
        .iter()
        .filter(|t| t.behavior().is_only())
        .cloned()
        .collect();
    let children = block
        .children()
        .iter()
        .filter(|c| contains_only(c))
        .map(prune_to_only)
        .collect();
    block.with_contents(tests, children)
}

/// Remove blocks that contain no tests anywhere beneath them.
///
/// Works bottom-up and is idempotent. The root block is always returned, even
/// when it ends up empty.
#[must_use]
pub fn empty_filter(block: &Block) -> Block {
    let children = block
        .children()
        .iter()
        .map(empty_filter)
        .filter(|c| c.test_count() > 0)
        .collect();
    block.with_contents(block.tests().to_vec(), children)
}

/// Keep tests by tag-set inclusion and exclusion.
///
/// A test survives iff its effective tags intersect `include` (or `include`
/// is empty) and do not intersect `exclude`. Effective tags are the union of
/// the test's own tags with those of every enclosing block.
#[must_use]
pub fn tag_filter(block: &Block, include: &TagSet, exclude: &TagSet) -> Block {
    retain_tests(block, &TagSet::new(), &|effective| {
        (include.is_empty() || effective.intersects(include)) && !effective.intersects(exclude)
    })
}

/// Keep tests whose effective tags satisfy a parsed expression
#[must_use]
pub fn expression_filter(block: &Block, expr: &TagExpr) -> Block {
    retain_tests(block, &TagSet::new(), &|effective| expr.evaluate(effective))
}

fn retain_tests<F>(block: &Block, inherited: &TagSet, keep: &F) -> Block
where
    F: Fn(&TagSet) -> bool,
{
    let scope = inherited.union(block.tags());
    let tests = block
        .tests()
        .iter()
        .filter(|t| keep(&scope.union(t.tags())))
        .cloned()
        .collect();
    let children = block
        .children()
        .iter()
        .map(|c| retain_tests(c, &scope, keep))
        .collect();
    block.with_contents(tests, children)
}

/// Which tests a run selects.
///
/// Tag-set filtering and expression filtering are mutually exclusive per run,
/// which the enum makes structural rather than a runtime check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum TestFilter {
    /// Run everything
    #[default]
    All,
    /// Keep tests matching the include/exclude tag sets
    Tags {
        /// Tests must share a tag with this set, unless it is empty
        include: TagSet,
        /// Tests sharing a tag with this set are dropped
        exclude: TagSet,
    },
    /// Keep tests satisfying a tag expression
    Expression(TagExpr),
}

impl TestFilter {
    /// Build a tag-set filter
    #[must_use]
    pub fn tags(include: TagSet, exclude: TagSet) -> Self {
        Self::Tags { include, exclude }
    }

    /// Build an expression filter from its textual form.
    ///
    /// Parsing happens here, so a malformed expression fails before any test
    /// runs. Empty or whitespace-only input means "no filter".
    ///
    /// # Errors
    ///
    /// Returns [`DescribirError::ExpressionParse`](crate::DescribirError::ExpressionParse)
    /// when the input is non-empty and does not parse.
    pub fn expression(input: &str) -> DescribirResult<Self> {
        if input.trim().is_empty() {
            return Ok(Self::All);
        }
        Ok(Self::Expression(TagExpr::parse(input)?))
    }

    /// Run the full transform pipeline over a tree.
    ///
    /// Order is fixed: this filter, then focus-mode pruning, then empty-block
    /// removal.
    #[must_use]
    pub fn apply(&self, block: &Block) -> Block {
        let selected = match self {
            Self::All => block.clone(),
            Self::Tags { include, exclude } => tag_filter(block, include, exclude),
            Self::Expression(expr) => expression_filter(block, expr),
        };
        let filtered = empty_filter(&only_filter(&selected));
        debug!(
            declared = block.test_count(),
            selected = filtered.test_count(),
            "filter pipeline applied"
        );
        filtered
    }
}
