//! Display order of all items.
//!
//! The order table keeps two mutually inverse views:
//! - `sequence`: the id at each position
//! - `positions`: the position of each id, indexed by id slot
//!
//! ## Relocation
//!
//! Moving an item from position `from` to `to` only disturbs the slice
//! between them: that slice is rotated by one and only its entries are
//! re-pointed in `positions`. A relocation therefore costs O(|from - to|)
//! instead of rebuilding a million-entry array and map.

use crate::error::{RepositoryError, Result};
use crate::types::ItemId;

/// Where a relocation took an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

/// A permutation of ids `1..=N` plus its inverse.
pub struct OrderTable {
    sequence: Vec<ItemId>,
    positions: Vec<u32>,
}

impl std::fmt::Debug for OrderTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderTable")
            .field("len", &self.sequence.len())
            .finish()
    }
}

impl OrderTable {
    /// Creates the initial ascending order `[1, 2, ..., item_count]`.
    pub fn new(item_count: u32) -> Self {
        let sequence = (1..=item_count).filter_map(ItemId::new).collect();
        let positions = (0..item_count).collect();
        Self {
            sequence,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Current position of `id`, or `None` if it is not in the order.
    #[inline]
    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.positions.get(id.slot()).map(|position| *position as usize)
    }

    /// Id at `position`.
    #[inline]
    pub fn id_at(&self, position: usize) -> Option<ItemId> {
        self.sequence.get(position).copied()
    }

    /// Borrowed view of the current order.
    pub fn as_slice(&self) -> &[ItemId] {
        &self.sequence
    }

    /// Owned copy of the current order.
    pub fn sequence(&self) -> Vec<ItemId> {
        self.sequence.clone()
    }

    /// Moves `moved` so it sits immediately before `target`.
    ///
    /// The item is removed first and then inserted at the target's position
    /// in the shortened list, so the rule is the same in both directions:
    /// moving forward lands at `target_position - 1`, moving backward at
    /// `target_position`. Moving an item onto itself is a no-op.
    pub fn relocate(&mut self, moved: ItemId, target: ItemId) -> Result<Relocation> {
        let from = self
            .position_of(moved)
            .ok_or(RepositoryError::UnknownItem(u64::from(moved.get())))?;
        let target_position = self
            .position_of(target)
            .ok_or(RepositoryError::UnknownItem(u64::from(target.get())))?;

        let to = if from < target_position {
            target_position - 1
        } else {
            target_position
        };

        if from < to {
            self.sequence[from..=to].rotate_left(1);
            self.remap(from, to);
        } else if to < from {
            self.sequence[to..=from].rotate_right(1);
            self.remap(to, from);
        }

        Ok(Relocation { from, to })
    }

    /// Re-points `positions` for every id in `sequence[start..=end]`.
    fn remap(&mut self, start: usize, end: usize) {
        for position in start..=end {
            let id = self.sequence[position];
            // Positions are bounded by the u32 id space.
            self.positions[id.slot()] = position as u32;
        }
    }

    /// Checks the permutation and inverse invariants. O(N).
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        if self.sequence.len() != self.positions.len() {
            return false;
        }
        let mut seen = vec![false; self.sequence.len()];
        for (position, id) in self.sequence.iter().enumerate() {
            let slot = id.slot();
            if slot >= seen.len() || seen[slot] {
                return false;
            }
            seen[slot] = true;
            if self.positions[slot] as usize != position {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(value: u32) -> ItemId {
        ItemId::new(value).unwrap()
    }

    fn values(table: &OrderTable) -> Vec<u32> {
        table.as_slice().iter().map(|id| id.get()).collect()
    }

    #[test]
    fn starts_ascending() {
        let table = OrderTable::new(5);
        assert_eq!(values(&table), vec![1, 2, 3, 4, 5]);
        assert_eq!(table.position_of(id(1)), Some(0));
        assert_eq!(table.position_of(id(5)), Some(4));
        assert_eq!(table.position_of(id(6)), None);
        assert!(table.is_consistent());
    }

    #[test]
    fn relocate_forward_inserts_before_target() {
        let mut table = OrderTable::new(5);
        let relocation = table.relocate(id(1), id(4)).unwrap();
        assert_eq!(values(&table), vec![2, 3, 1, 4, 5]);
        assert_eq!(relocation, Relocation { from: 0, to: 2 });
        assert!(table.is_consistent());
    }

    #[test]
    fn relocate_backward_inserts_before_target() {
        let mut table = OrderTable::new(5);
        let relocation = table.relocate(id(5), id(2)).unwrap();
        assert_eq!(values(&table), vec![1, 5, 2, 3, 4]);
        assert_eq!(relocation, Relocation { from: 4, to: 1 });
        assert!(table.is_consistent());
    }

    #[test]
    fn relocate_onto_self_is_noop() {
        let mut table = OrderTable::new(5);
        table.relocate(id(3), id(3)).unwrap();
        assert_eq!(values(&table), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn relocate_before_next_neighbour_is_noop() {
        let mut table = OrderTable::new(5);
        let relocation = table.relocate(id(2), id(3)).unwrap();
        assert_eq!(values(&table), vec![1, 2, 3, 4, 5]);
        assert_eq!(relocation.from, relocation.to);
    }

    #[test]
    fn relocate_to_front_and_back() {
        let mut table = OrderTable::new(4);
        table.relocate(id(4), id(1)).unwrap();
        assert_eq!(values(&table), vec![4, 1, 2, 3]);
        table.relocate(id(4), id(3)).unwrap();
        assert_eq!(values(&table), vec![1, 2, 4, 3]);
        assert!(table.is_consistent());
    }

    #[test]
    fn relocate_unknown_ids_fails() {
        let mut table = OrderTable::new(5);
        assert!(matches!(
            table.relocate(id(9), id(1)),
            Err(RepositoryError::UnknownItem(9))
        ));
        assert!(matches!(
            table.relocate(id(1), id(6)),
            Err(RepositoryError::UnknownItem(6))
        ));
        assert_eq!(values(&table), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sequence_is_a_snapshot() {
        let mut table = OrderTable::new(3);
        let before = table.sequence();
        table.relocate(id(3), id(1)).unwrap();
        assert_eq!(before, vec![id(1), id(2), id(3)]);
        assert_eq!(table.id_at(0), Some(id(3)));
    }

    /// Reference model: delete, then insert at the target's index in the
    /// shortened list.
    fn model_relocate(order: &mut Vec<u32>, moved: u32, target: u32) {
        if moved == target {
            return;
        }
        let from = order.iter().position(|value| *value == moved).unwrap();
        order.remove(from);
        let to = order.iter().position(|value| *value == target).unwrap();
        order.insert(to, moved);
    }

    proptest! {
        #[test]
        fn relocations_match_reference_model(
            item_count in 1u32..60,
            moves in prop::collection::vec((any::<u32>(), any::<u32>()), 1..40),
        ) {
            let mut table = OrderTable::new(item_count);
            let mut model: Vec<u32> = (1..=item_count).collect();
            for (a, b) in moves {
                let moved = a % item_count + 1;
                let target = b % item_count + 1;
                let target_before = table.position_of(id(target)).unwrap();
                let moved_before = table.position_of(id(moved)).unwrap();

                table.relocate(id(moved), id(target)).unwrap();
                model_relocate(&mut model, moved, target);

                if moved != target {
                    let expected = target_before - usize::from(moved_before < target_before);
                    prop_assert_eq!(table.position_of(id(moved)), Some(expected));
                }
                prop_assert_eq!(values(&table), model.clone());
                prop_assert!(table.is_consistent());
            }
        }
    }
}
