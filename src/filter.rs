//! Item filter: narrows the enumerated collection by a title/creator pattern.

use regex::Regex;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::ItemDescriptor;

/// Compiled title/creator pattern
///
/// The pattern is a regular expression matched unanchored against the title
/// and the creator separately; an item is kept if either matches. Case rules
/// follow the pattern itself (use `(?i)` for case-insensitive matching).
#[derive(Clone, Debug)]
pub struct ItemFilter {
    pattern: Regex,
}

impl ItemFilter {
    /// Compile a filter pattern
    pub fn new(pattern: &str) -> Result<Self> {
        // Size limit keeps a hostile pattern from compiling into a huge automaton
        let compiled = regex::RegexBuilder::new(pattern)
            .size_limit(1024 * 1024)
            .build()
            .map_err(|e| Error::Filter {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { pattern: compiled })
    }

    /// The source pattern
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether the pattern matches the item's title or creator
    pub fn matches(&self, item: &ItemDescriptor) -> bool {
        self.pattern.is_match(&item.title) || self.pattern.is_match(&item.creator)
    }

    /// Keep matching items, preserving order
    pub fn apply(&self, items: &[ItemDescriptor]) -> Vec<ItemDescriptor> {
        items.iter().filter(|i| self.matches(i)).cloned().collect()
    }
}

/// Apply an optional filter; without one the items are returned unchanged
///
/// Logs the number of matches and each matched `creator-title` before
/// acquisition starts.
pub fn filter_items(items: Vec<ItemDescriptor>, filter: Option<&ItemFilter>) -> Vec<ItemDescriptor> {
    let Some(filter) = filter else {
        return items;
    };

    let total = items.len();
    let kept = filter.apply(&items);
    info!(
        pattern = filter.as_str(),
        matched = kept.len(),
        total,
        "Filtered collection"
    );
    for item in &kept {
        info!(item = %item.label(), "Matched");
    }
    kept
}
