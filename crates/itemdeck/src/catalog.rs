//! Immutable item catalog.
//!
//! Labels for all items are packed into a single string buffer with an
//! offset table, so a million-item catalog costs two allocations instead of
//! a million.

use crate::types::{Item, ItemId};

/// Immutable mapping from identifier to item attributes for ids `1..=N`.
pub struct ItemCatalog {
    labels: String,
    /// `offsets[slot]..offsets[slot + 1]` is the label of `slot`.
    offsets: Vec<u32>,
}

impl std::fmt::Debug for ItemCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCatalog")
            .field("size", &self.size())
            .field("label_bytes", &self.labels.len())
            .finish()
    }
}

impl ItemCatalog {
    /// Builds the catalog for ids `1..=item_count`, labelling each item
    /// `"{label_prefix}{id}"`.
    pub fn build(item_count: u32, label_prefix: &str) -> Self {
        use std::fmt::Write;

        let count = item_count as usize;
        let mut labels = String::with_capacity(count * (label_prefix.len() + 7));
        let mut offsets = Vec::with_capacity(count + 1);
        offsets.push(0);
        for id in 1..=item_count {
            // Writing into a String cannot fail.
            let _ = write!(labels, "{label_prefix}{id}");
            offsets.push(label_offset(labels.len()));
        }

        Self { labels, offsets }
    }

    /// Number of items, `N`.
    pub fn size(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `N` as the identifier type's width.
    pub fn item_count(&self) -> u32 {
        // Bounded by `build`'s `u32` argument.
        self.size() as u32
    }

    /// Returns true when `id` names a catalog item.
    pub fn exists(&self, id: ItemId) -> bool {
        id.slot() < self.size()
    }

    /// Resolves a raw numeric id to a catalog identifier.
    pub fn resolve(&self, raw: u64) -> Option<ItemId> {
        u32::try_from(raw)
            .ok()
            .and_then(ItemId::new)
            .filter(|id| self.exists(*id))
    }

    /// Borrowed label of an item.
    pub fn label(&self, id: ItemId) -> Option<&str> {
        if !self.exists(id) {
            return None;
        }
        let slot = id.slot();
        let start = self.offsets[slot] as usize;
        let end = self.offsets[slot + 1] as usize;
        Some(&self.labels[start..end])
    }

    /// Owned copy of an item, or `None` when out of range.
    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.label(id).map(|label| Item {
            id,
            label: label.to_string(),
        })
    }
}

fn label_offset(len: usize) -> u32 {
    u32::try_from(len).expect("catalog labels exceed u32 offsets")
}
