//! Generic read and write operations over one entity type.
//!
//! Every read takes a [`LoadDepth`]. `Shallow` issues a single untracked
//! query without includes. `Full` eager-loads every discovered load-path and
//! runs under the [`CircularReferenceGuard`](crate::CircularReferenceGuard)
//! retry protocol. Store failures are logged and answered with an empty
//! result; configuration mistakes and cancellation are returned as
//! [`QueryError`].

use std::convert::identity;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use navrepo_core::{ConfigurationError, EntityType, OrderBy, Predicate, Record};
use navrepo_storage::{Page, QuerySpec, StorageError, StoreQuery};

use crate::context::QueryContext;
use crate::error::QueryError;
use crate::guard::cancellable;
use crate::key_predicate::KeyValues;

/// How much of the related graph a read loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadDepth {
    /// Root rows only.
    #[default]
    Shallow,
    /// Root rows plus every discovered load-path.
    Full,
}

pub struct Repository<S> {
    store: Arc<S>,
    context: Arc<QueryContext>,
    entity_type: EntityType,
}

impl<S> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Repository {
            store: Arc::clone(&self.store),
            context: Arc::clone(&self.context),
            entity_type: self.entity_type.clone(),
        }
    }
}

impl<S: StoreQuery> Repository<S> {
    pub fn new(store: Arc<S>, context: Arc<QueryContext>, entity_type: impl Into<EntityType>) -> Self {
        Repository {
            store,
            context,
            entity_type: entity_type.into(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.context
    }

    // -- by key --

    pub async fn get_by_key(
        &self,
        key: impl Into<KeyValues>,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>, QueryError> {
        self.get_by_key_as(key, depth, cancel, identity).await
    }

    /// Loads the entity with the given primary key and projects it.
    ///
    /// Key shape and kind are checked before the store is touched.
    pub async fn get_by_key_as<T, P>(
        &self,
        key: impl Into<KeyValues>,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Option<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let predicate = self.key_predicate(key.into())?;
        let spec = self.base_query().filter(predicate).take(1);
        let rows = self.fetch("get_by_key", depth, spec, cancel).await?;
        Ok(rows.into_iter().next().map(project))
    }

    /// Like [`get_by_key`](Self::get_by_key) but ignores the store's global
    /// query filters, so soft-deleted rows are found too.
    pub async fn get_by_key_unfiltered(
        &self,
        key: impl Into<KeyValues>,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>, QueryError> {
        self.get_by_key_unfiltered_as(key, depth, cancel, identity).await
    }

    pub async fn get_by_key_unfiltered_as<T, P>(
        &self,
        key: impl Into<KeyValues>,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Option<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let predicate = self.key_predicate(key.into())?;
        let spec = self
            .base_query()
            .filter(predicate)
            .ignore_query_filters()
            .take(1);
        let rows = self.fetch("get_by_key_unfiltered", depth, spec, cancel).await?;
        Ok(rows.into_iter().next().map(project))
    }

    // -- collections --

    pub async fn get_all(
        &self,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, QueryError> {
        self.get_all_as(depth, cancel, identity).await
    }

    pub async fn get_all_as<T, P>(
        &self,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Vec<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let rows = self.fetch("get_all", depth, self.base_query(), cancel).await?;
        Ok(rows.into_iter().map(project).collect())
    }

    pub async fn get_where(
        &self,
        predicate: Predicate,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, QueryError> {
        self.get_where_as(predicate, depth, cancel, identity).await
    }

    pub async fn get_where_as<T, P>(
        &self,
        predicate: Predicate,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Vec<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let spec = self.base_query().filter(predicate);
        let rows = self.fetch("get_where", depth, spec, cancel).await?;
        Ok(rows.into_iter().map(project).collect())
    }

    // -- extremes --

    /// The entity with the smallest `field`, optionally among those matching
    /// `filter`.
    pub async fn get_min_by(
        &self,
        field: &str,
        filter: Option<Predicate>,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>, QueryError> {
        self.get_min_by_as(field, filter, depth, cancel, identity).await
    }

    pub async fn get_min_by_as<T, P>(
        &self,
        field: &str,
        filter: Option<Predicate>,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Option<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        self.first_by("get_min_by", OrderBy::asc(field), filter, depth, cancel, project)
            .await
    }

    /// The entity with the largest `field`, optionally among those matching
    /// `filter`.
    pub async fn get_max_by(
        &self,
        field: &str,
        filter: Option<Predicate>,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>, QueryError> {
        self.get_max_by_as(field, filter, depth, cancel, identity).await
    }

    pub async fn get_max_by_as<T, P>(
        &self,
        field: &str,
        filter: Option<Predicate>,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Option<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        self.first_by("get_max_by", OrderBy::desc(field), filter, depth, cancel, project)
            .await
    }

    // -- paging --

    pub async fn get_page(
        &self,
        filter: Predicate,
        order: OrderBy,
        skip: usize,
        take: usize,
        depth: LoadDepth,
        cancel: &CancellationToken,
    ) -> Result<Page<Record>, QueryError> {
        self.get_page_as(filter, order, skip, take, depth, cancel, identity)
            .await
    }

    /// One ordered page plus the total match count, from a single store
    /// execution so both numbers describe the same snapshot.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_page_as<T, P>(
        &self,
        filter: Predicate,
        order: OrderBy,
        skip: usize,
        take: usize,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Page<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let spec = self
            .base_query()
            .filter(filter)
            .order_by(order)
            .skip(skip)
            .take(take);
        let page = self.fetch_page("get_page", depth, spec, cancel).await?;
        Ok(page.map(project))
    }

    // -- writes --

    /// Inserts `record`. Returns `false` when the store rejects it.
    pub async fn add(&self, record: Record, cancel: &CancellationToken) -> Result<bool, QueryError> {
        self.check_type(&record)?;
        let result = cancellable(cancel, self.store.insert(record)).await?;
        Ok(self.settle("add", result.map(|n| n > 0), false))
    }

    /// Replaces the stored row with `record`'s scalar fields.
    ///
    /// Navigations are cleared first so only the root row is written.
    pub async fn update(
        &self,
        mut record: Record,
        cancel: &CancellationToken,
    ) -> Result<bool, QueryError> {
        self.check_type(&record)?;
        self.context.clearer().clear(&mut record)?;
        let result = cancellable(cancel, self.store.update(record)).await?;
        Ok(self.settle("update", result.map(|n| n > 0), false))
    }

    pub async fn remove(&self, record: &Record, cancel: &CancellationToken) -> Result<bool, QueryError> {
        self.check_type(record)?;
        let predicate = self.context.keys().predicate_for_record(record)?;
        self.delete("remove", predicate, cancel).await
    }

    pub async fn remove_by_key(
        &self,
        key: impl Into<KeyValues>,
        cancel: &CancellationToken,
    ) -> Result<bool, QueryError> {
        let predicate = self.key_predicate(key.into())?;
        self.delete("remove_by_key", predicate, cancel).await
    }

    // -- plumbing --

    fn base_query(&self) -> QuerySpec {
        QuerySpec::new(self.entity_type.clone()).timeout(self.context.config().query_timeout)
    }

    fn key_predicate(&self, key: KeyValues) -> Result<Predicate, QueryError> {
        Ok(self.context.keys().predicate_for(&self.entity_type, &key)?)
    }

    fn check_type(&self, record: &Record) -> Result<(), QueryError> {
        if record.entity_type != self.entity_type {
            return Err(ConfigurationError::EntityTypeMismatch {
                expected: self.entity_type.clone(),
                actual: record.entity_type.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn with_includes(&self, spec: QuerySpec) -> QuerySpec {
        let paths = self.context.paths().get_or_compute_default(&self.entity_type);
        tracing::debug!(
            entity_type = %self.entity_type,
            includes = paths.len(),
            "full load"
        );
        spec.include(paths.iter().cloned())
    }

    async fn first_by<T, P>(
        &self,
        operation: &'static str,
        order: OrderBy,
        filter: Option<Predicate>,
        depth: LoadDepth,
        cancel: &CancellationToken,
        project: P,
    ) -> Result<Option<T>, QueryError>
    where
        P: Fn(Record) -> T,
    {
        let mut spec = self.base_query().order_by(order).take(1);
        if let Some(filter) = filter {
            spec = spec.filter(filter);
        }
        let rows = self.fetch(operation, depth, spec, cancel).await?;
        Ok(rows.into_iter().next().map(project))
    }

    async fn fetch(
        &self,
        operation: &'static str,
        depth: LoadDepth,
        spec: QuerySpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, QueryError> {
        match depth {
            LoadDepth::Shallow => {
                let result = cancellable(cancel, self.store.fetch(&spec)).await?;
                Ok(self.settle(operation, result, Vec::new()))
            }
            LoadDepth::Full => {
                let spec = self.with_includes(spec);
                let store = &self.store;
                let spec = &spec;
                self.context
                    .guard()
                    .execute(&self.entity_type, operation, Vec::new(), cancel, |mode| {
                        let query = spec.clone().tracking(mode);
                        async move { store.fetch(&query).await }
                    })
                    .await
            }
        }
    }

    async fn fetch_page(
        &self,
        operation: &'static str,
        depth: LoadDepth,
        spec: QuerySpec,
        cancel: &CancellationToken,
    ) -> Result<Page<Record>, QueryError> {
        match depth {
            LoadDepth::Shallow => {
                let result = cancellable(cancel, self.store.fetch_page(&spec)).await?;
                Ok(self.settle(operation, result, Page::empty()))
            }
            LoadDepth::Full => {
                let spec = self.with_includes(spec);
                let store = &self.store;
                let spec = &spec;
                self.context
                    .guard()
                    .execute(&self.entity_type, operation, Page::empty(), cancel, |mode| {
                        let query = spec.clone().tracking(mode);
                        async move { store.fetch_page(&query).await }
                    })
                    .await
            }
        }
    }

    async fn delete(
        &self,
        operation: &'static str,
        predicate: Predicate,
        cancel: &CancellationToken,
    ) -> Result<bool, QueryError> {
        let result = cancellable(cancel, self.store.delete(&self.entity_type, &predicate)).await?;
        Ok(self.settle(operation, result.map(|n| n > 0), false))
    }

    /// Logs a store failure and substitutes `default`.
    fn settle<T>(&self, operation: &'static str, result: Result<T, StorageError>, default: T) -> T {
        match result {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(
                    entity_type = %self.entity_type,
                    operation,
                    error = %error,
                    "store call failed"
                );
                default
            }
        }
    }
}
