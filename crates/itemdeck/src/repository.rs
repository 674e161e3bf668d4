//! ItemRepository - the shared in-memory state and its operations.
//!
//! ## Synchronization
//!
//! - Catalog: immutable, built in `new`
//! - Search index: published once through a `OnceLock` when the build
//!   finishes; until then queries fail with `IndexNotReady`
//! - Order table and selection set: each behind a `parking_lot::RwLock`
//!
//! A relocation holds the order write lock for the whole
//! remove-insert-remap step, so readers never observe the sequence and the
//! position map out of step, and concurrent relocations serialize. Queries
//! hold the order read lock only while selecting one page of ids. When both
//! locks are needed the order lock is taken first.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicU8;
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use fnv::FnvHashSet;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::catalog::ItemCatalog;
use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::observer::{ActionRecord, ObserverSet, Operation, OperationObserver, PerformanceRecord};
use crate::order::OrderTable;
use crate::query::QueryEngine;
use crate::request::{CallContext, PageRequest};
use crate::search::{unix_now_secs, IndexBuildProgress, IndexBuildState, SearchIndex, SearchTerm};
use crate::selection::SelectionSet;
use crate::types::{
    IndexStatus, ItemId, ItemsPage, RelocateOutcome, RepositorySnapshot, SelectionAction,
    SelectionOutcome,
};

/// The single owner of catalog, search index, order table and selection.
pub struct ItemRepository {
    config: RepositoryConfig,
    catalog: ItemCatalog,
    index: OnceLock<SearchIndex>,
    /// Current build state (atomic for lock-free reads).
    build_state: AtomicU8,
    build_progress: IndexBuildProgress,
    build_last_error: Mutex<Option<String>>,
    order: RwLock<OrderTable>,
    selection: RwLock<SelectionSet>,
    observers: ObserverSet,
}

impl std::fmt::Debug for ItemRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRepository")
            .field("catalog", &self.catalog)
            .field("index_state", &self.build_state().as_str())
            .field("observers", &self.observers)
            .finish()
    }
}

impl ItemRepository {
    /// Creates the catalog and the initial ascending order. The search index
    /// is not built yet; call `build_index` or `spawn_index_build`.
    ///
    /// Relocation, selection and snapshots are served right away, before the
    /// index is ready. Use `open` to serve nothing until the build is done.
    pub fn new(config: RepositoryConfig) -> Result<Self> {
        config.validate()?;
        let started = Instant::now();
        let catalog = ItemCatalog::build(config.item_count, &config.label_prefix);
        let order = OrderTable::new(config.item_count);

        log::info!(
            "item repository init item_count={} elapsed_ms={}",
            catalog.size(),
            started.elapsed().as_millis()
        );

        Ok(Self {
            config,
            catalog,
            index: OnceLock::new(),
            build_state: AtomicU8::new(IndexBuildState::Idle as u8),
            build_progress: IndexBuildProgress::default(),
            build_last_error: Mutex::new(None),
            order: RwLock::new(order),
            selection: RwLock::new(SelectionSet::new()),
            observers: ObserverSet::default(),
        })
    }

    /// Creates the repository and builds the search index before returning.
    pub fn open(config: RepositoryConfig) -> Result<Self> {
        let repository = Self::new(config)?;
        repository.build_index()?;
        Ok(repository)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Registers an observer for all subsequent calls.
    pub fn add_observer(&self, observer: Arc<dyn OperationObserver>) {
        self.observers.add(observer);
    }

    // -----------------------------------------------------------------------
    // Index build
    // -----------------------------------------------------------------------

    pub fn build_state(&self) -> IndexBuildState {
        IndexBuildState::load(&self.build_state)
    }

    pub fn is_ready(&self) -> bool {
        self.build_state() == IndexBuildState::Ready
    }

    /// Builds the search index on the calling thread.
    ///
    /// Returns immediately if the index is already ready. Fails with
    /// `IndexNotReady` if another build is in flight.
    pub fn build_index(&self) -> Result<()> {
        if !self.begin_build() {
            return self.ready_or_not();
        }
        self.run_build()
    }

    /// Builds the search index on a background thread.
    ///
    /// Returns `None` when no build was started because the index is ready
    /// or already building.
    pub fn spawn_index_build(self: &Arc<Self>) -> Result<Option<JoinHandle<Result<()>>>> {
        if !self.begin_build() {
            return Ok(None);
        }

        let repository = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("itemdeck-index-build".to_string())
            .spawn(move || repository.run_build());

        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(error) => {
                *self.build_last_error.lock() = Some(format!("unable to spawn build: {error}"));
                IndexBuildState::Error.store(&self.build_state);
                Err(RepositoryError::Io(error))
            }
        }
    }

    /// Current build state, progress and index size.
    pub fn status(&self) -> IndexStatus {
        let state = self.build_state();
        let progress = self.build_progress.snapshot();
        let stats = self.index.get().map(SearchIndex::stats);

        IndexStatus {
            state: state.as_str().to_string(),
            total_items: self.catalog.size(),
            indexed_items: progress.indexed_items,
            started_at: progress.started_at,
            finished_at: progress.finished_at,
            distinct_keys: stats.map(|stats| stats.distinct_keys),
            associations: stats.map(|stats| stats.associations),
            last_error: self.build_last_error.lock().clone(),
        }
    }

    /// Moves the state to `Building` unless a build is running or done.
    fn begin_build(&self) -> bool {
        loop {
            let state = self.build_state();
            if matches!(state, IndexBuildState::Building | IndexBuildState::Ready) {
                return false;
            }
            if self
                .build_state
                .compare_exchange(
                    state as u8,
                    IndexBuildState::Building as u8,
                    std::sync::atomic::Ordering::AcqRel,
                    std::sync::atomic::Ordering::Acquire,
                )
                .is_ok()
            {
                return true;
            }
        }
    }

    fn run_build(&self) -> Result<()> {
        self.run_build_with(SearchIndex::build)
    }

    fn run_build_with(
        &self,
        build: impl FnOnce(u32, &IndexBuildProgress) -> SearchIndex,
    ) -> Result<()> {
        let started = Instant::now();
        let item_count = self.catalog.item_count();
        self.build_progress.reset_for_build(unix_now_secs());
        *self.build_last_error.lock() = None;
        log::info!("search index build started item_count={item_count}");

        // Catch panics so the state always leaves `Building`.
        let built = catch_unwind(AssertUnwindSafe(|| build(item_count, &self.build_progress)));
        self.build_progress.finish(unix_now_secs());

        let index = match built {
            Ok(index) => index,
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "index build panicked".to_string()
                };
                return Err(self.fail_build(format!("panic during build: {panic_msg}")));
            }
        };

        let stats = index.stats();
        if self.index.set(index).is_err() {
            return Err(self.fail_build("search index was already published".to_string()));
        }
        IndexBuildState::Ready.store(&self.build_state);

        log::info!(
            "search index ready item_count={} distinct_keys={} associations={} elapsed_ms={}",
            item_count,
            stats.distinct_keys,
            stats.associations,
            started.elapsed().as_millis()
        );
        Ok(())
    }

    fn fail_build(&self, message: String) -> RepositoryError {
        log::warn!("search index build failed: {message}");
        *self.build_last_error.lock() = Some(message.clone());
        IndexBuildState::Error.store(&self.build_state);
        RepositoryError::Internal(message)
    }

    fn ready_or_not(&self) -> Result<()> {
        match self.build_state() {
            IndexBuildState::Ready => Ok(()),
            state => Err(RepositoryError::IndexNotReady {
                state: state.as_str(),
            }),
        }
    }

    fn ready_index(&self) -> Result<&SearchIndex> {
        self.index.get().ok_or(RepositoryError::IndexNotReady {
            state: self.build_state().as_str(),
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// One page of items matching `search`, in current display order.
    pub fn list_items(
        &self,
        request: PageRequest,
        search: &str,
        ctx: &CallContext,
    ) -> Result<ItemsPage> {
        self.observe(
            Operation::ListItems,
            ctx,
            || {
                json!({
                    "page": request.page(),
                    "pageSize": request.page_size(),
                    "search": search,
                })
            },
            || {
                if request.page_size() > self.config.max_page_size {
                    return Err(RepositoryError::InvalidArgument(format!(
                        "page size must be between 1 and {}",
                        self.config.max_page_size
                    )));
                }
                let index = self.ready_index()?;
                let engine = QueryEngine::new(&self.catalog, index);
                let term = SearchTerm::parse(search, self.catalog.item_count());

                let page_ids = {
                    let order = self.order.read();
                    engine.page_ids(&order, term, request)
                };
                let selection = self.selection.read();
                Ok(engine.annotate(page_ids, &selection, request, search))
            },
            |page| json!({ "total": page.total, "hasMore": page.has_more }),
        )
    }

    /// Moves `moved` to sit immediately before `target`.
    pub fn relocate_item(&self, moved: u64, target: u64, ctx: &CallContext) -> Result<RelocateOutcome> {
        self.observe(
            Operation::RelocateItem,
            ctx,
            || json!({ "movedId": moved, "targetId": target }),
            || {
                let moved_id = self.resolve(moved)?;
                let target_id = self.resolve(target)?;
                let relocation = self.order.write().relocate(moved_id, target_id)?;

                log::debug!(
                    "relocated item={} target={} from={} to={}",
                    moved_id,
                    target_id,
                    relocation.from,
                    relocation.to
                );

                Ok(RelocateOutcome {
                    moved_id,
                    target_id,
                    from_position: relocation.from,
                    to_position: relocation.to,
                })
            },
            |outcome| {
                json!({
                    "fromPosition": outcome.from_position,
                    "toPosition": outcome.to_position,
                })
            },
        )
    }

    /// Selects or deselects `ids`. Ids outside the catalog are dropped.
    pub fn set_selection(
        &self,
        ids: &[u64],
        action: SelectionAction,
        ctx: &CallContext,
    ) -> Result<SelectionOutcome> {
        self.observe(
            Operation::SetSelection,
            ctx,
            || json!({ "action": action.as_str(), "requestedCount": ids.len() }),
            || {
                let mut seen = FnvHashSet::default();
                let affected_ids: Vec<ItemId> = ids
                    .iter()
                    .filter_map(|raw| self.catalog.resolve(*raw))
                    .filter(|id| seen.insert(*id))
                    .collect();

                let mut selection = self.selection.write();
                match action {
                    SelectionAction::Select => selection.select(&affected_ids),
                    SelectionAction::Deselect => selection.deselect(&affected_ids),
                }

                Ok(SelectionOutcome {
                    action,
                    selected_count: selection.count(),
                    affected_ids,
                })
            },
            |outcome| {
                json!({
                    "selectedCount": outcome.selected_count,
                    "affectedCount": outcome.affected_ids.len(),
                })
            },
        )
    }

    /// Selected ids, full order and catalog size, read consistently.
    pub fn snapshot(&self, ctx: &CallContext) -> Result<RepositorySnapshot> {
        self.observe(
            Operation::GetSnapshot,
            ctx,
            || json!({}),
            || {
                let order = self.order.read();
                let selection = self.selection.read();
                Ok(RepositorySnapshot {
                    selected_ids: selection.members(),
                    full_order: order.sequence(),
                    total_items: self.catalog.size(),
                })
            },
            |snapshot| {
                json!({
                    "selectedCount": snapshot.selected_ids.len(),
                    "totalItems": snapshot.total_items,
                })
            },
        )
    }

    /// Current display position of a raw id.
    pub fn position_of(&self, id: u64) -> Option<usize> {
        let id = self.catalog.resolve(id)?;
        self.order.read().position_of(id)
    }

    fn resolve(&self, raw: u64) -> Result<ItemId> {
        self.catalog
            .resolve(raw)
            .ok_or(RepositoryError::UnknownItem(raw))
    }

    /// Runs `call`, then reports timing and (on success) the action to the
    /// observers. Observers see the result only after it is final.
    fn observe<T>(
        &self,
        operation: Operation,
        ctx: &CallContext,
        details: impl FnOnce() -> Value,
        call: impl FnOnce() -> Result<T>,
        summarize: impl FnOnce(&T) -> Value,
    ) -> Result<T> {
        if self.observers.is_empty() {
            return call();
        }

        let started = Instant::now();
        let result = call();
        let duration = started.elapsed();
        let timestamp = Utc::now();
        let details = details();

        self.observers.notify_performance(&PerformanceRecord {
            timestamp,
            operation,
            context: ctx.clone(),
            duration,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            details: details.clone(),
        });

        if let Ok(value) = &result {
            self.observers.notify_action(&ActionRecord {
                timestamp,
                operation,
                context: ctx.clone(),
                details: merge_details(details, summarize(value)),
            });
        }

        result
    }
}

fn merge_details(mut base: Value, extra: Value) -> Value {
    if let (Value::Object(base_map), Value::Object(extra_map)) = (&mut base, extra) {
        base_map.extend(extra_map);
    }
    base
}
