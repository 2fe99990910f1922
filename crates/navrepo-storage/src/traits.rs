//! The [`StoreQuery`] trait defining the storage contract.
//!
//! Reads take a [`QuerySpec`] describing includes, tracking mode, filter,
//! ordering and paging. Writes forward single rows. All backends are async
//! and shared behind `Arc`, so every method takes `&self`.

use async_trait::async_trait;

use navrepo_core::{EntityType, Predicate, Record};

use crate::error::StorageError;
use crate::types::{Page, QuerySpec};

/// The storage contract consumed by the query layer.
#[async_trait]
pub trait StoreQuery: Send + Sync {
    /// Executes a read and returns the matching rows with includes loaded.
    async fn fetch(&self, query: &QuerySpec) -> Result<Vec<Record>, StorageError>;

    /// Executes a read and returns the requested page together with the
    /// total count of matching rows, both taken from the same execution.
    async fn fetch_page(&self, query: &QuerySpec) -> Result<Page<Record>, StorageError>;

    /// Inserts one row. Navigation slots are not written.
    async fn insert(&self, record: Record) -> Result<u64, StorageError>;

    /// Replaces the row with the same primary key. Returns rows affected.
    async fn update(&self, record: Record) -> Result<u64, StorageError>;

    /// Deletes every row matching `filter`. Returns rows affected.
    async fn delete(&self, entity_type: &EntityType, filter: &Predicate)
        -> Result<u64, StorageError>;
}
