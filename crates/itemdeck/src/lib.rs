//! In-memory ordered item repository.
//!
//! This crate provides:
//! - An immutable catalog of up to a million numbered items
//! - Exhaustive substring search over decimal identifiers
//! - A user-defined display order with O(1) position lookup
//! - A selection set, paged listing and consistent snapshots
//! - Call observers and a JSON-lines audit log

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod observer;
pub mod order;
pub mod query;
pub mod repository;
pub mod request;
pub mod search;
pub mod selection;
pub mod types;

// Re-export main types
pub use audit::{JsonLinesLog, LogKind, LogStats, TimeRange};
pub use config::{AuditConfig, RepositoryConfig};
pub use error::{RepositoryError, Result};
pub use observer::{ActionRecord, Operation, OperationObserver, PerformanceRecord};
pub use repository::ItemRepository;
pub use request::{parse_item_id, CallContext, PageRequest};
pub use search::{IndexBuildState, SearchTerm};
pub use types::{
    IndexStatus, Item, ItemId, ItemsPage, PageItem, RelocateOutcome, RepositorySnapshot,
    SelectionAction, SelectionOutcome,
};
