//! Tags for blocks and tests.
//!
//! Tags are plain strings attached to blocks. A test's effective tag set is
//! the union of the tags on every block from the root down to its owning
//! block, so tagging a block tags everything inside it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An unordered set of string tags.
///
/// Backed by a [`BTreeSet`] so iteration order is deterministic, which keeps
/// reporter output and serialized forms stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    /// Create an empty tag set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag; adding a tag twice is a no-op
    pub fn insert(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Merge all tags from `other` into this set
    pub fn extend_from(&mut self, other: &Self) {
        self.tags.extend(other.tags.iter().cloned());
    }

    /// Union of this set and `other`
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    /// Check whether `tag` is present
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check whether this set shares at least one tag with `other`
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|tag| large.contains(tag))
    }

    /// Check whether the set has no tags
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of tags in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Iterate over tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl fmt::Display for TagSet {
    /// Comma-joined tags in sorted order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}
