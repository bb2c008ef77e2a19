//! Column metadata resolution.
//!
//! Maps a result set's column labels to 1-based ordinal positions using a
//! normalization rule that makes lookup insensitive to case, underscore style
//! and most punctuation: `CREATED_AT`, `created_at` and `createdAt` all
//! resolve to the same slot.

use std::collections::HashMap;

use heck::ToSnakeCase;
use tracing::warn;

use crate::error::DecodeError;

/// Normalize a column label or field name for resolution.
///
/// Camel-case boundaries become underscores, the result is lowercased, and
/// every character that is not a lowercase ASCII letter or digit is stripped
/// (underscores included).
pub fn normalize(label: &str) -> String {
    label
        .to_snake_case()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Name-to-position metadata for one result set.
///
/// Built once immediately after a query executes, consumed during row
/// decoding, discarded with the result set.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    by_name: HashMap<String, usize>,
    labels: Vec<String>,
}

impl ColumnMeta {
    /// Build metadata from the original column labels, in result-set order.
    ///
    /// When two labels normalize to the same key the later column wins; the
    /// collision is reported through `tracing` but not treated as an error,
    /// since aliased projections legitimately shadow earlier columns.
    pub fn from_labels(labels: Vec<String>) -> Self {
        let mut by_name = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            let index = i + 1;
            if let Some(previous) = by_name.insert(normalize(label), index) {
                warn!(
                    column = %label,
                    shadowed = %labels[previous - 1],
                    "two columns normalize to the same name; the later one wins"
                );
            }
        }
        Self { by_name, labels }
    }

    /// Total number of columns.
    pub fn column_count(&self) -> usize {
        self.labels.len()
    }

    /// Resolve a field or column name to its 1-based position.
    pub fn resolve(&self, name: &str) -> Result<usize, DecodeError> {
        self.by_name
            .get(&normalize(name))
            .copied()
            .ok_or_else(|| DecodeError::ColumnNotFound {
                name: name.to_string(),
                available: self.sorted_labels(),
            })
    }

    /// Original label of the column at a 1-based position.
    pub fn label(&self, index: usize) -> Result<&str, DecodeError> {
        if index == 0 || index > self.labels.len() {
            return Err(DecodeError::InvalidColumnIndex {
                index,
                max: self.labels.len(),
            });
        }
        Ok(&self.labels[index - 1])
    }

    fn sorted_labels(&self) -> Vec<String> {
        let mut labels = self.labels.clone();
        labels.sort();
        labels
    }
}
