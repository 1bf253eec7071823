//! Tracks which value columns appeared or disappeared between edits so the
//! per-column pipeline entries can follow the dataset.

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ColumnDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Remembers the column set seen by the previous call.
#[derive(Debug, Default)]
pub struct ColumnDiffTracker {
    previous: Option<Vec<String>>,
}

impl ColumnDiffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `next` against the previous call, then remember `next`.
    ///
    /// Membership is set-based; the order of `added` follows `next` and the
    /// order of `removed` follows the previous set.
    pub fn diff(&mut self, next: &[String]) -> ColumnDiff {
        let diff = self.peek(next);
        self.previous = Some(next.to_vec());
        diff
    }

    /// Same comparison as [`diff`](Self::diff) without touching the stored set.
    pub fn peek(&self, next: &[String]) -> ColumnDiff {
        let previous = self.previous.as_deref().unwrap_or(&[]);

        let before: HashSet<&str> = previous.iter().map(String::as_str).collect();
        let after: HashSet<&str> = next.iter().map(String::as_str).collect();

        ColumnDiff {
            added: next
                .iter()
                .filter(|column| !before.contains(column.as_str()))
                .cloned()
                .collect(),
            removed: previous
                .iter()
                .filter(|column| !after.contains(column.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn previous(&self) -> &[String] {
        self.previous.as_deref().unwrap_or(&[])
    }
}
