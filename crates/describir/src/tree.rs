//! The test tree data model and its declaration builder.
//!
//! A suite is a tree of [`Block`]s. Each block holds nested blocks, leaf
//! [`Test`]s, lifecycle [`Hook`]s grouped by kind, a [`Behavior`], and a
//! [`TagSet`]. Declaration order of hooks, tests, and children is preserved
//! and is the execution order.
//!
//! Trees are assembled through [`Block::build`] and are immutable afterwards:
//! the filters in [`crate::filter`] return new trees, and the engine only ever
//! reads the tree it is given. The builder is scoped to a closure, so no
//! declaration can happen outside a block or after a run has started.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::result::DescribirResult;
use crate::tag::TagSet;

/// A hook or test body: a zero-argument action that may fail.
///
/// Stored behind `Arc` so tree transforms can clone nodes without cloning the
/// captured state.
pub type Action = Arc<dyn Fn() -> DescribirResult<()> + Send + Sync>;

/// The four lifecycle positions a hook can occupy within its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKind {
    /// Runs once before the block's tests and children
    Before,
    /// Runs before every test in the block's subtree
    BeforeEach,
    /// Runs after every test in the block's subtree
    AfterEach,
    /// Runs once after the block's tests and children
    After,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::BeforeEach => "beforeEach",
            Self::AfterEach => "afterEach",
            Self::After => "after",
        };
        f.write_str(name)
    }
}

/// A lifecycle action scoped to a block.
#[derive(Clone)]
pub struct Hook {
    kind: HookKind,
    label: Option<String>,
    action: Action,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Hook {
    /// Create a hook of the given kind
    #[must_use]
    pub fn new<F>(kind: HookKind, action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        Self {
            kind,
            label: None,
            action: Arc::new(action),
        }
    }

    /// Create a `Before` hook
    #[must_use]
    pub fn before<F>(action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        Self::new(HookKind::Before, action)
    }

    /// Create a `BeforeEach` hook
    #[must_use]
    pub fn before_each<F>(action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        Self::new(HookKind::BeforeEach, action)
    }

    /// Create an `AfterEach` hook
    #[must_use]
    pub fn after_each<F>(action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        Self::new(HookKind::AfterEach, action)
    }

    /// Create an `After` hook
    #[must_use]
    pub fn after<F>(action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        Self::new(HookKind::After, action)
    }

    /// Attach a label used in failure reports
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The hook's lifecycle position
    #[must_use]
    pub fn kind(&self) -> HookKind {
        self.kind
    }

    /// The optional label
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Run the hook's action.
    ///
    /// # Errors
    ///
    /// Propagates whatever the action returns.
    pub fn invoke(&self) -> DescribirResult<()> {
        (self.action)()
    }
}

/// A leaf unit of verification.
///
/// A test without an action is *pending*: it is reported but never invoked.
///
/// # Example
///
/// ```
/// use describir::{Behavior, Test};
///
/// let test = Test::new("parses empty input")
///     .with_tag("unit")
///     .with_action(|| Ok(()));
/// assert!(!test.is_pending());
/// assert_eq!(test.behavior(), Behavior::Normal);
/// ```
#[derive(Clone)]
pub struct Test {
    description: String,
    behavior: Behavior,
    tags: TagSet,
    action: Option<Action>,
}

impl fmt::Debug for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("description", &self.description)
            .field("behavior", &self.behavior)
            .field("tags", &self.tags)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Test {
    /// Create a pending test with the given description
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            behavior: Behavior::Normal,
            tags: TagSet::new(),
            action: None,
        }
    }

    /// Set the run behavior
    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Add a single tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Add several tags
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.tags.insert(tag);
        }
        self
    }

    /// Set the test body, making the test non-pending
    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// The test description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The run behavior
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// The test's own tags, not including inherited ones
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Whether the test has no action
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.action.is_none()
    }

    /// The test body, if one was supplied
    #[must_use]
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }
}

/// A grouping node in the test tree.
///
/// The root block returned by [`Block::build`] has no description and
/// [`Behavior::Normal`]; every other block is named. Blocks are read-only once
/// built.
#[derive(Debug, Clone)]
pub struct Block {
    description: Option<String>,
    behavior: Behavior,
    tags: TagSet,
    before: Vec<Hook>,
    before_each: Vec<Hook>,
    after_each: Vec<Hook>,
    after: Vec<Hook>,
    tests: Vec<Test>,
    children: Vec<Block>,
}

impl Block {
    /// Declare a suite.
    ///
    /// The closure receives the root [`BlockBuilder`]; nested blocks open
    /// nested closures. The finished tree is immutable.
    ///
    /// # Example
    ///
    /// ```
    /// use describir::Block;
    ///
    /// let suite = Block::build(|root| {
    ///     root.block("arithmetic", |arith| {
    ///         arith.tag("unit");
    ///         arith.test("adds", || {
    ///             assert_eq!(2 + 2, 4);
    ///             Ok(())
    ///         });
    ///         arith.pending("multiplies");
    ///     });
    /// });
    /// assert_eq!(suite.test_count(), 2);
    /// ```
    pub fn build(f: impl FnOnce(&mut BlockBuilder)) -> Self {
        let mut builder = BlockBuilder::root();
        f(&mut builder);
        builder.finish()
    }

    fn empty(description: Option<String>, behavior: Behavior) -> Self {
        Self {
            description,
            behavior,
            tags: TagSet::new(),
            before: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            after: Vec::new(),
            tests: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The block description; `None` for the root
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The run behavior
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// The block's own tags, not including inherited ones
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The block's own tests, in declaration order
    #[must_use]
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Nested blocks, in declaration order
    #[must_use]
    pub fn children(&self) -> &[Block] {
        &self.children
    }

    /// Hooks of one kind, in declaration order
    #[must_use]
    pub fn hooks(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::Before => &self.before,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
            HookKind::After => &self.after,
        }
    }

    /// Total number of tests in this block and all blocks beneath it
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.children.iter().map(Block::test_count).sum::<usize>()
    }

    /// Copy of this block with the same identity and hooks but different
    /// tests and children. Used by the tree transforms.
    pub(crate) fn with_contents(&self, tests: Vec<Test>, children: Vec<Block>) -> Self {
        Self {
            description: self.description.clone(),
            behavior: self.behavior,
            tags: self.tags.clone(),
            before: self.before.clone(),
            before_each: self.before_each.clone(),
            after_each: self.after_each.clone(),
            after: self.after.clone(),
            tests,
            children,
        }
    }
}

/// Accumulates one block's contents during declaration.
///
/// Obtained only through [`Block::build`] and the nested-block methods, so a
/// builder cannot outlive the declaration phase and every hook and test is
/// guaranteed an enclosing block.
#[derive(Debug)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    fn root() -> Self {
        Self {
            block: Block::empty(None, Behavior::Normal),
        }
    }

    fn named(description: String, behavior: Behavior) -> Self {
        Self {
            block: Block::empty(Some(description), behavior),
        }
    }

    fn finish(self) -> Block {
        self.block
    }

    /// Open a nested block with [`Behavior::Normal`]
    pub fn block(&mut self, description: impl Into<String>, f: impl FnOnce(&mut BlockBuilder)) {
        self.block_with(description, Behavior::Normal, f);
    }

    /// Open a nested block with an explicit behavior
    pub fn block_with(
        &mut self,
        description: impl Into<String>,
        behavior: Behavior,
        f: impl FnOnce(&mut BlockBuilder),
    ) {
        let mut child = Self::named(description.into(), behavior);
        f(&mut child);
        self.block.children.push(child.finish());
    }

    /// Open a nested block that is skipped along with everything inside it
    pub fn skip_block(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut BlockBuilder),
    ) {
        self.block_with(description, Behavior::Skip, f);
    }

    /// Open a nested block that runs in focus mode
    pub fn only_block(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut BlockBuilder),
    ) {
        self.block_with(description, Behavior::Only, f);
    }

    /// Tag the current block; nested blocks and tests inherit it
    pub fn tag(&mut self, tag: impl Into<String>) {
        self.block.tags.insert(tag);
    }

    /// Declare a test with [`Behavior::Normal`]
    pub fn test<F>(&mut self, description: impl Into<String>, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_test(Test::new(description).with_action(action));
    }

    /// Declare a test with an explicit behavior
    pub fn test_with<F>(&mut self, description: impl Into<String>, behavior: Behavior, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_test(
            Test::new(description)
                .with_behavior(behavior)
                .with_action(action),
        );
    }

    /// Declare a pending test
    pub fn pending(&mut self, description: impl Into<String>) {
        self.push_test(Test::new(description));
    }

    /// Append an already-built test, for tagged or otherwise customized leaves
    pub fn push_test(&mut self, test: Test) {
        self.block.tests.push(test);
    }

    /// Declare a hook running once before this block's tests and children
    pub fn before<F>(&mut self, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_hook(Hook::before(action));
    }

    /// Declare a hook running before every test in this block's subtree
    pub fn before_each<F>(&mut self, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_hook(Hook::before_each(action));
    }

    /// Declare a hook running after every test in this block's subtree
    pub fn after_each<F>(&mut self, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_hook(Hook::after_each(action));
    }

    /// Declare a hook running once after this block's tests and children
    pub fn after<F>(&mut self, action: F)
    where
        F: Fn() -> DescribirResult<()> + Send + Sync + 'static,
    {
        self.push_hook(Hook::after(action));
    }

    /// Append an already-built hook, routed to its kind's group
    pub fn push_hook(&mut self, hook: Hook) {
        let group = match hook.kind() {
            HookKind::Before => &mut self.block.before,
            HookKind::BeforeEach => &mut self.block.before_each,
            HookKind::AfterEach => &mut self.block.after_each,
            HookKind::After => &mut self.block.after,
        };
        group.push(hook);
    }
}
