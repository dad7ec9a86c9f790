//! Expand/collapse state.
//!
//! An [`ExpansionState`] is an immutable snapshot: toggling returns a new
//! snapshot and leaves the old one untouched, so the assembler can take
//! it by reference without anyone changing it underneath.

use serde::{Deserialize, Serialize};
use stackscope_core::Resource;
use std::collections::BTreeSet;

/// The set of expanded node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    expanded: BTreeSet<String>,
}

impl ExpansionState {
    /// Nothing expanded: only roots are visible in structural mode.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every resource expanded.
    pub fn all_expanded(resources: &[Resource]) -> Self {
        Self {
            expanded: resources.iter().map(|r| r.id.clone()).collect(),
        }
    }

    /// Builds a snapshot from explicit ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expanded: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Flips one node.
    pub fn toggled(&self, id: &str) -> Self {
        if self.is_expanded(id) {
            self.collapsed(id)
        } else {
            self.expanded(id)
        }
    }

    pub fn expanded(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.expanded.insert(id.to_string());
        next
    }

    pub fn collapsed(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.expanded.remove(id);
        next
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
