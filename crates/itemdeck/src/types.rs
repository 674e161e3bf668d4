//! Public value types handed out by the repository.
//!
//! Everything here is an owned copy: callers never receive handles into the
//! live catalog, order table or selection set. Result types serialize with
//! camelCase field names so a transport layer can emit them as-is.

use std::fmt;

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A compact 32-bit item identifier in `[1, N]`.
///
/// Zero is never a valid identifier. Identifiers map onto dense table slots
/// via `slot()`, which is what lets the order table keep its reverse index in
/// a plain vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ItemId(u32);

impl ItemId {
    /// Creates an identifier, returning `None` for zero.
    #[inline]
    pub fn new(value: u32) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    /// Returns the raw identifier value.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based slot used by dense per-item tables.
    #[inline]
    pub(crate) fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ItemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        Self::new(value).ok_or_else(|| D::Error::custom("ItemId cannot be 0"))
    }
}

/// An item of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub label: String,
}

/// An item annotated with its current selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageItem {
    #[serde(flatten)]
    pub item: Item,
    pub selected: bool,
}

/// One page of the (optionally filtered) listing, in current display order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPage {
    pub items: Vec<PageItem>,
    /// Number of items matching the search, across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    /// The search term as given by the caller.
    pub search: String,
}

impl ItemsPage {
    /// Identifiers of the page items, in order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|entry| entry.item.id).collect()
    }
}

/// Whether a selection call adds or removes ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionAction {
    Select,
    Deselect,
}

impl SelectionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Deselect => "deselect",
        }
    }
}

/// Outcome of a selection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutcome {
    pub action: SelectionAction,
    /// Selection set size after the call.
    pub selected_count: usize,
    /// Valid ids the call applied to, in input order without duplicates.
    pub affected_ids: Vec<ItemId>,
}

/// Outcome of a relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateOutcome {
    pub moved_id: ItemId,
    pub target_id: ItemId,
    pub from_position: usize,
    pub to_position: usize,
}

/// Full-state snapshot used for periodic reconciliation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    /// Selected ids, ascending.
    pub selected_ids: Vec<ItemId>,
    /// Every id in current display order.
    pub full_order: Vec<ItemId>,
    pub total_items: usize,
}

/// Search index status information.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Current build state of the search index.
    pub state: String,
    /// Number of items in the catalog.
    pub total_items: usize,
    /// Number of ids indexed so far by the current or last build.
    pub indexed_items: usize,
    /// Unix timestamp when the build started.
    pub started_at: Option<u64>,
    /// Unix timestamp when the build finished.
    pub finished_at: Option<u64>,
    /// Distinct substring keys, once the index is ready.
    pub distinct_keys: Option<usize>,
    /// Total (substring, id) associations, once the index is ready.
    pub associations: Option<usize>,
    /// Last error message if state is "error".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
