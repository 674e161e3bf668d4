//! Exhaustive substring index over decimal identifiers.
//!
//! Every contiguous digit run of every id `1..=N` maps to the ascending list
//! of ids containing it. For N = 1,000,000 that is about 19 million
//! (substring, id) associations over about 1.01 million distinct keys: a
//! few hundred megabytes and a few seconds of CPU, paid once before the
//! first query. In exchange a lookup is a single hash probe.
//!
//! ## Build
//!
//! Ids are split into fixed-size ascending chunks indexed in parallel with
//! rayon. Partial maps are merged in chunk order, so each posting list comes
//! out sorted without a sort pass.

use std::ops::RangeInclusive;

use fnv::FnvHashMap;
use rayon::prelude::*;
use thin_vec::ThinVec;

use super::build::IndexBuildProgress;
use super::key::{for_each_substring, SubstringKey};
use crate::types::ItemId;

/// Ids per parallel build chunk.
const BUILD_CHUNK_SIZE: u32 = 1 << 14;

// ---------------------------------------------------------------------------
// SortedIds
// ---------------------------------------------------------------------------

/// An ascending, duplicate-free posting list.
///
/// Wraps `ThinVec<ItemId>`: with over a million posting lists, the 8-byte
/// header (against `Vec`'s 24) adds up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct SortedIds {
    ids: ThinVec<ItemId>,
}

impl SortedIds {
    /// Returns the number of ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[ItemId] {
        &self.ids
    }

    /// Membership test by binary search.
    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }
}

impl FromIterator<ItemId> for SortedIds {
    /// Collects ids that are already ascending and unique.
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        let ids = ThinVec::from_iter(iter);
        debug_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        Self { ids }
    }
}

// ---------------------------------------------------------------------------
// SearchIndex
// ---------------------------------------------------------------------------

/// Size figures of a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub distinct_keys: usize,
    pub associations: usize,
}

/// Immutable substring index for ids `1..=item_count`.
pub struct SearchIndex {
    postings: FnvHashMap<SubstringKey, SortedIds>,
    item_count: u32,
    associations: usize,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("item_count", &self.item_count)
            .field("distinct_keys", &self.postings.len())
            .field("associations", &self.associations)
            .finish()
    }
}

impl SearchIndex {
    /// Builds the index for ids `1..=item_count`, reporting progress as
    /// chunks complete. Runs to completion; there is no partial index.
    pub fn build(item_count: u32, progress: &IndexBuildProgress) -> Self {
        let partials: Vec<FnvHashMap<SubstringKey, Vec<ItemId>>> = chunk_ranges(item_count)
            .into_par_iter()
            .map(|range| {
                let len = range.clone().count();
                let partial = index_chunk(range);
                progress.add_indexed(len);
                partial
            })
            .collect();

        let mut merged: FnvHashMap<SubstringKey, Vec<ItemId>> = FnvHashMap::default();
        for partial in partials {
            for (key, ids) in partial {
                merged.entry(key).or_default().extend(ids);
            }
        }

        let associations = merged.values().map(Vec::len).sum();
        let postings = merged
            .into_iter()
            .map(|(key, ids)| (key, ids.into_iter().collect::<SortedIds>()))
            .collect();

        Self {
            postings,
            item_count,
            associations,
        }
    }

    /// Number of ids the index was built over.
    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    /// Ids whose decimal form contains `substring`, ascending.
    ///
    /// Anything that is not 1 to 7 ASCII digits matches nothing.
    pub fn lookup(&self, substring: &str) -> &[ItemId] {
        SubstringKey::from_digits(substring)
            .map(|key| self.lookup_key(key))
            .unwrap_or(&[])
    }

    /// Ids containing the digit run `key`, ascending.
    pub fn lookup_key(&self, key: SubstringKey) -> &[ItemId] {
        self.postings
            .get(&key)
            .map(SortedIds::as_slice)
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            distinct_keys: self.postings.len(),
            associations: self.associations,
        }
    }
}

fn chunk_ranges(item_count: u32) -> Vec<RangeInclusive<u32>> {
    let mut ranges = Vec::new();
    let mut start = 1u32;
    while start <= item_count {
        let end = start.saturating_add(BUILD_CHUNK_SIZE - 1).min(item_count);
        ranges.push(start..=end);
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }
    ranges
}

fn index_chunk(range: RangeInclusive<u32>) -> FnvHashMap<SubstringKey, Vec<ItemId>> {
    let mut partial: FnvHashMap<SubstringKey, Vec<ItemId>> = FnvHashMap::default();
    for value in range {
        let Some(id) = ItemId::new(value) else {
            continue;
        };
        for_each_substring(value, |key| {
            let ids = partial.entry(key).or_default();
            // Ids arrive ascending, so a repeat can only be the last entry.
            if ids.last() != Some(&id) {
                ids.push(id);
            }
        });
    }
    partial
}
