//! Class index to label bijection persisted next to the classifier.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::LabelMapError;

/// Label returned for class indices the registry does not know.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Immutable mapping between dense class indices `0..N` and label strings.
///
/// Built once from the sorted set of distinct corpus labels, so the same
/// corpus always produces the same indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRegistry {
    labels: Vec<String>,
    indices: HashMap<String, usize>,
}

impl LabelRegistry {
    /// Builds a registry from arbitrary labels.
    ///
    /// Labels are de-duplicated and sorted; indices follow the sorted order.
    #[must_use]
    pub fn build<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self::from_sorted(sorted.into_iter().collect())
    }

    fn from_sorted(labels: Vec<String>) -> Self {
        let indices = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self { labels, indices }
    }

    /// Returns the label for a class index, or `"Unknown"` if out of range.
    #[must_use]
    pub fn resolve(&self, index: usize) -> &str {
        self.labels.get(index).map_or(UNKNOWN_LABEL, String::as_str)
    }

    /// Returns the class index of a label.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in index order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the flat `label -> index` map written to disk.
    #[must_use]
    pub fn to_label_map(&self) -> BTreeMap<String, usize> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect()
    }

    /// Inverts a `label -> index` map.
    ///
    /// # Errors
    ///
    /// Returns an error if two labels share an index or the indices are not
    /// exactly `0..N`.
    pub fn from_label_map<S: std::hash::BuildHasher>(
        map: &HashMap<String, usize, S>,
    ) -> Result<Self, LabelMapError> {
        let mut slots: Vec<Option<String>> = vec![None; map.len()];

        for (label, &index) in map {
            let slot = slots.get_mut(index).ok_or(LabelMapError::NotContiguous {
                index,
                len: map.len(),
            })?;
            if let Some(existing) = slot {
                return Err(LabelMapError::DuplicateIndex {
                    index,
                    first: existing.clone(),
                    second: label.clone(),
                });
            }
            *slot = Some(label.clone());
        }

        // Every slot is filled: map.len() entries were placed into map.len()
        // distinct in-range slots.
        let labels = slots.into_iter().flatten().collect();
        Ok(Self::from_sorted(labels))
    }

    /// Loads a registry from a JSON label map file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON object of
    /// `label -> index`, or the indices do not form a bijection.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading label map from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read label map: {}", path.display()))?;
        let map: HashMap<String, usize> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse label map: {}", path.display()))?;

        Self::from_label_map(&map)
            .with_context(|| format!("Invalid label map: {}", path.display()))
    }

    /// Writes the registry as a JSON label map, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("Writing label map to {}", path.display());
        crate::artifacts::write_atomic(path, self.to_json()?.as_bytes())
    }

    /// Serializes the registry as a JSON label map.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_label_map()).context("Failed to serialize label map")
    }
}
