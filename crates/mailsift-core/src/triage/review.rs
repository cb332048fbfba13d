//! Drill-down review of a classified run.

use super::model::{Category, ClassificationResult, MessageRef};
use super::pending::{PendingEntry, PendingRun};
use crate::{Error, Result};

/// One message under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    /// Account nickname.
    pub account: String,
    /// Fetched metadata.
    pub message: MessageRef,
    /// Current decision.
    pub result: ClassificationResult,
}

/// Editable view over one run, possibly spanning accounts.
#[derive(Debug, Clone, Default)]
pub struct ReviewSession {
    items: Vec<ReviewItem>,
}

impl ReviewSession {
    /// Creates a session over `items`.
    #[must_use]
    pub const fn new(items: Vec<ReviewItem>) -> Self {
        Self { items }
    }

    /// Appends items (e.g. another account's batch).
    pub fn extend(&mut self, items: impl IntoIterator<Item = ReviewItem>) {
        self.items.extend(items);
    }

    /// All items in fetch order.
    #[must_use]
    pub fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    /// Item by index.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&ReviewItem> {
        self.items.get(index)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to review.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item indices grouped by category, in first-seen category order.
    #[must_use]
    pub fn groups(&self) -> Vec<(Category, Vec<usize>)> {
        let mut groups: Vec<(Category, Vec<usize>)> = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            let category = item.result.category();
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, indices)) => indices.push(index),
                None => groups.push((category, vec![index])),
            }
        }
        groups
    }

    /// Moves an item to another category. Any category is allowed; clears skip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an out-of-range index.
    pub fn set_category(&mut self, index: usize, category: Category) -> Result<()> {
        self.item_mut(index)?.result.set_category(category);
        Ok(())
    }

    /// Marks an item to be left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an out-of-range index.
    pub fn set_skip(&mut self, index: usize) -> Result<()> {
        self.item_mut(index)?.result.set_skip();
        Ok(())
    }

    /// Item count per category in [`Category::ALL`] order, omitting empty ones.
    #[must_use]
    pub fn counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| {
                let n = self
                    .items
                    .iter()
                    .filter(|i| i.result.category() == c)
                    .count();
                (c, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Number of items marked skip.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|i| i.result.skip()).count()
    }

    /// Messages, index-aligned with [`ReviewSession::results`].
    #[must_use]
    pub fn messages(&self) -> Vec<MessageRef> {
        self.items.iter().map(|i| i.message.clone()).collect()
    }

    /// Results, index-aligned with [`ReviewSession::messages`].
    #[must_use]
    pub fn results(&self) -> Vec<ClassificationResult> {
        self.items.iter().map(|i| i.result.clone()).collect()
    }

    /// Builds a pending run from the current decisions.
    #[must_use]
    pub fn to_pending_run(&self) -> PendingRun {
        PendingRun {
            created_at: chrono::Utc::now(),
            entries: self
                .items
                .iter()
                .map(|i| PendingEntry {
                    account: i.account.clone(),
                    result: i.result.clone(),
                    subject: i.message.subject.clone(),
                    sender: i.message.sender.clone(),
                })
                .collect(),
        }
    }

    /// Consumes the session.
    #[must_use]
    pub fn into_items(self) -> Vec<ReviewItem> {
        self.items
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut ReviewItem> {
        let len = self.items.len();
        self.items.get_mut(index).ok_or_else(|| {
            Error::InvalidInput(format!("no review item {index} (have {len})"))
        })
    }
}
