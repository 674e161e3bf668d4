//! Set of selected items.

use fnv::FnvHashSet;

use crate::types::ItemId;

/// Ids currently flagged as selected. Independent of order and search.
#[derive(Debug, Default)]
pub struct SelectionSet {
    members: FnvHashSet<ItemId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every id in `ids`. Already-selected ids are left alone.
    pub fn select(&mut self, ids: &[ItemId]) {
        self.members.extend(ids.iter().copied());
    }

    /// Removes every id in `ids`. Unselected ids are left alone.
    pub fn deselect(&mut self, ids: &[ItemId]) {
        for id in ids {
            self.members.remove(id);
        }
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.members.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Selected ids, ascending.
    pub fn members(&self) -> Vec<ItemId> {
        let mut members: Vec<ItemId> = self.members.iter().copied().collect();
        members.sort_unstable();
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<ItemId> {
        values.iter().filter_map(|value| ItemId::new(*value)).collect()
    }

    #[test]
    fn starts_empty() {
        let selection = SelectionSet::new();
        assert_eq!(selection.count(), 0);
        assert!(selection.members().is_empty());
    }

    #[test]
    fn select_is_idempotent() {
        let mut selection = SelectionSet::new();
        selection.select(&ids(&[4, 2]));
        selection.select(&ids(&[2]));
        assert_eq!(selection.count(), 2);
        assert_eq!(selection.members(), ids(&[2, 4]));
    }

    #[test]
    fn deselect_absent_is_noop() {
        let mut selection = SelectionSet::new();
        selection.select(&ids(&[1]));
        selection.deselect(&ids(&[3]));
        assert_eq!(selection.members(), ids(&[1]));
    }

    #[test]
    fn select_then_deselect_restores_prior_state() {
        let mut selection = SelectionSet::new();
        selection.select(&ids(&[7, 8]));
        let before = selection.members();

        selection.select(&ids(&[1, 2, 3]));
        selection.deselect(&ids(&[1, 2, 3]));
        assert_eq!(selection.members(), before);
        assert!(selection.contains(ItemId::new(7).unwrap()));
        assert!(!selection.contains(ItemId::new(1).unwrap()));
    }
}
