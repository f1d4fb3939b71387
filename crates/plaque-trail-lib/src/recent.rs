//! Recently picked search results

use crate::search::SearchResult;
use serde::{Deserialize, Serialize};

/// Most-recent-first list of picked results, without duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSelections {
    items: Vec<SearchResult>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    5
}

impl Default for RecentSelections {
    fn default() -> Self {
        Self::with_capacity(default_capacity())
    }
}

impl RecentSelections {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from previously stored entries, re-applying the cap and de-duplication
    pub fn from_items(items: Vec<SearchResult>, capacity: usize) -> Self {
        let mut recent = Self::with_capacity(capacity);
        // Oldest first so the stored head ends up at the front again
        for item in items.into_iter().rev() {
            recent.push(item);
        }
        recent
    }

    /// Record a selection; an existing equal entry moves to the front
    pub fn push(&mut self, result: SearchResult) {
        let key = result.key();
        self.items.retain(|existing| existing.key() != key);
        self.items.insert(0, result);
        self.items.truncate(self.capacity);
    }

    pub fn items(&self) -> &[SearchResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
