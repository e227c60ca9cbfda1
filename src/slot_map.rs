//! Bone mapping table: canonical character slots to skeleton joint labels.
//!
//! The table is loaded once and passed by reference to the characterization and batch stages.
//! Order is significant: slots are bound (and progress is reported) in table order.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{BatchError, BatchResult};

const DEFAULT_TABLE_JSON: &str = include_str!("../assets/slot_map.json");

/// One `slot -> label` entry. An empty label stands for the skeleton root itself.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlotEntry {
    pub slot: String,
    #[serde(default)]
    pub label: String,
}

impl SlotEntry {
    /// Return `true` when this slot binds the skeleton root rather than a named joint.
    pub fn is_root(&self) -> bool {
        self.label.is_empty()
    }
}

/// Immutable ordered mapping with globally unique slot names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotMap {
    entries: Vec<SlotEntry>,
}

impl SlotMap {
    /// Build a table, rejecting empty or duplicate slot names.
    pub fn new(entries: Vec<SlotEntry>) -> BatchResult<Self> {
        let mut seen = HashSet::with_capacity(entries.len());
        for e in &entries {
            if e.slot.trim().is_empty() {
                return Err(BatchError::configuration("slot map contains an empty slot name"));
            }
            if !seen.insert(e.slot.as_str()) {
                return Err(BatchError::configuration(format!(
                    "slot map contains duplicate slot '{}'",
                    e.slot
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Convenience constructor from `(slot, label)` pairs.
    pub fn from_pairs<S, L>(pairs: impl IntoIterator<Item = (S, L)>) -> BatchResult<Self>
    where
        S: Into<String>,
        L: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(slot, label)| SlotEntry {
                    slot: slot.into(),
                    label: label.into(),
                })
                .collect(),
        )
    }

    /// The table shipped with the crate (biped slots with BVH-style joint labels).
    pub fn builtin() -> BatchResult<Self> {
        Self::from_json_str(DEFAULT_TABLE_JSON)
    }

    /// Parse a JSON array of `{"slot": .., "label": ..}` objects.
    pub fn from_json_str(s: &str) -> BatchResult<Self> {
        let entries: Vec<SlotEntry> = serde_json::from_str(s)?;
        Self::new(entries)
    }

    pub fn from_path(path: impl AsRef<Path>) -> BatchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read slot map '{}'", path.display()))?;
        Self::from_json_str(&text)
            .map_err(|e| BatchError::configuration(format!("slot map '{}': {e}", path.display())))
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SlotEntry> {
        self.entries.iter()
    }

    /// Joint label bound to `slot`; empty for the root slot, `None` when the slot is unknown.
    pub fn label_for(&self, slot: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.slot == slot)
            .map(|e| e.label.as_str())
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.slot.as_str())
    }
}

impl<'a> IntoIterator for &'a SlotMap {
    type Item = &'a SlotEntry;
    type IntoIter = std::slice::Iter<'a, SlotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
