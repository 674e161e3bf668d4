//! Paged, optionally filtered listing in current display order.
//!
//! Search hits come out of the index as id-ascending sets; results must
//! follow the display order instead. Two projections are used:
//! - small hit sets are ordered by sorting their current positions
//! - large hit sets are projected by scanning the order against a bitset,
//!   stopping as soon as the requested page is full
//!
//! Both produce the same page; the split only bounds the work per query.

use crate::catalog::ItemCatalog;
use crate::order::OrderTable;
use crate::request::PageRequest;
use crate::search::{SearchIndex, SearchTerm};
use crate::selection::SelectionSet;
use crate::types::{ItemId, ItemsPage, PageItem};

/// Hit sets up to `N / SORT_PROJECTION_DIVISOR` ids are position-sorted
/// instead of scanned.
const SORT_PROJECTION_DIVISOR: usize = 32;

/// One page of matching ids in display order, before annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIds {
    pub ids: Vec<ItemId>,
    /// Matches across all pages.
    pub total: usize,
}

/// Read-only query evaluation over the catalog and the search index.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    catalog: &'a ItemCatalog,
    index: &'a SearchIndex,
}

impl<'a> QueryEngine<'a> {
    pub fn new(catalog: &'a ItemCatalog, index: &'a SearchIndex) -> Self {
        Self { catalog, index }
    }

    /// Selects the ids of one page of `term`'s matches in `order`.
    pub fn page_ids(&self, order: &OrderTable, term: SearchTerm, request: PageRequest) -> PageIds {
        let offset = request.offset();
        let limit = request.page_size();

        match term {
            SearchTerm::All => {
                let sequence = order.as_slice();
                PageIds {
                    ids: sequence.iter().skip(offset).take(limit).copied().collect(),
                    total: sequence.len(),
                }
            }
            SearchTerm::Substring(key) => {
                let matches = self.index.lookup_key(key);
                PageIds {
                    ids: project(order, matches, offset, limit),
                    total: matches.len(),
                }
            }
            SearchTerm::Exact(id) if self.catalog.exists(id) => {
                let matches = [id];
                PageIds {
                    ids: project(order, &matches, offset, limit),
                    total: matches.len(),
                }
            }
            SearchTerm::Exact(_) | SearchTerm::Nothing => PageIds {
                ids: Vec::new(),
                total: 0,
            },
        }
    }

    /// Attaches item attributes and selection flags to a page of ids.
    pub fn annotate(
        &self,
        page_ids: PageIds,
        selection: &SelectionSet,
        request: PageRequest,
        search: &str,
    ) -> ItemsPage {
        let items = page_ids
            .ids
            .into_iter()
            .filter_map(|id| {
                self.catalog.get(id).map(|item| PageItem {
                    item,
                    selected: selection.contains(id),
                })
            })
            .collect();

        ItemsPage {
            items,
            total: page_ids.total,
            page: request.page(),
            page_size: request.page_size(),
            has_more: request.offset().saturating_add(request.page_size()) < page_ids.total,
            search: search.to_string(),
        }
    }

    /// Full query in one call: resolve, project, annotate.
    pub fn query(
        &self,
        order: &OrderTable,
        selection: &SelectionSet,
        request: PageRequest,
        search: &str,
    ) -> ItemsPage {
        let term = SearchTerm::parse(search, self.catalog.item_count());
        let page_ids = self.page_ids(order, term, request);
        self.annotate(page_ids, selection, request, search)
    }
}

/// Orders `matches` by display position and returns `limit` of them after
/// skipping `offset`.
fn project(order: &OrderTable, matches: &[ItemId], offset: usize, limit: usize) -> Vec<ItemId> {
    if offset >= matches.len() || limit == 0 {
        return Vec::new();
    }

    if matches.len() <= order.len() / SORT_PROJECTION_DIVISOR + 1 {
        let mut positioned: Vec<(usize, ItemId)> = matches
            .iter()
            .filter_map(|id| order.position_of(*id).map(|position| (position, *id)))
            .collect();
        let wanted = offset.saturating_add(limit);
        if wanted < positioned.len() {
            positioned.select_nth_unstable(wanted);
            positioned.truncate(wanted);
        }
        positioned.sort_unstable();
        return positioned
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, id)| id)
            .collect();
    }

    let members = IdBitset::from_ids(order.len(), matches);
    order
        .as_slice()
        .iter()
        .copied()
        .filter(|id| members.contains(*id))
        .skip(offset)
        .take(limit)
        .collect()
}

/// Membership bitset over id slots.
struct IdBitset {
    words: Vec<u64>,
}

impl IdBitset {
    fn from_ids(capacity: usize, ids: &[ItemId]) -> Self {
        let mut words = vec![0u64; capacity.div_ceil(64)];
        for id in ids {
            let slot = id.slot();
            if let Some(word) = words.get_mut(slot / 64) {
                *word |= 1 << (slot % 64);
            }
        }
        Self { words }
    }

    #[inline]
    fn contains(&self, id: ItemId) -> bool {
        let slot = id.slot();
        self.words
            .get(slot / 64)
            .is_some_and(|word| word & (1 << (slot % 64)) != 0)
    }
}
