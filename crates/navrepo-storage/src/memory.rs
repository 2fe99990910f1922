//! In-memory implementation of [`StoreQuery`].
//!
//! [`InMemoryStore`] is the reference backend for tests and for callers that
//! do not need persistence. Rows live in a `tokio::sync::RwLock`ed map from
//! entity type to rows; navigations are materialized on read by following
//! the [`Join`](navrepo_core::Join)s the metadata declares.
//!
//! It reproduces the behaviour the query layer has to cope with:
//! - untracked queries with a cyclic include path fail with
//!   [`StorageError::TrackingConflict`];
//! - global query filters per entity type, skipped when a query asks for it;
//! - optional simulated latency and per-query timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use navrepo_core::{EntityMetadataProvider, EntityType, Predicate, Record, Related};

use crate::error::StorageError;
use crate::include::{check_includes, IncludeTree};
use crate::traits::StoreQuery;
use crate::types::{Page, QuerySpec, TrackingMode};

type Tables = HashMap<EntityType, Vec<Record>>;

/// In-memory implementation of [`StoreQuery`].
pub struct InMemoryStore {
    metadata: Arc<dyn EntityMetadataProvider>,
    tables: RwLock<Tables>,
    query_filters: HashMap<EntityType, Predicate>,
    latency: Option<Duration>,
    untracked_executions: AtomicUsize,
    tracked_executions: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store resolving keys and joins through `metadata`.
    pub fn new(metadata: Arc<dyn EntityMetadataProvider>) -> Self {
        InMemoryStore {
            metadata,
            tables: RwLock::new(HashMap::new()),
            query_filters: HashMap::new(),
            latency: None,
            untracked_executions: AtomicUsize::new(0),
            tracked_executions: AtomicUsize::new(0),
        }
    }

    /// Registers a global query filter applied to every read of
    /// `entity_type` (including when it is reached through an include).
    pub fn with_query_filter(mut self, entity_type: impl Into<EntityType>, filter: Predicate) -> Self {
        self.query_filters.insert(entity_type.into(), filter);
        self
    }

    /// Delays every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of read executions started in `mode`.
    pub fn executions(&self, mode: TrackingMode) -> usize {
        match mode {
            TrackingMode::Untracked => self.untracked_executions.load(Ordering::SeqCst),
            TrackingMode::Tracked => self.tracked_executions.load(Ordering::SeqCst),
        }
    }

    /// Inserts rows directly, bypassing key checks. For fixtures.
    pub async fn seed<I>(&self, rows: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut tables = self.tables.write().await;
        for row in rows {
            tables
                .entry(row.entity_type.clone())
                .or_default()
                .push(strip(row));
        }
    }

    /// Number of rows stored for `entity_type`, ignoring query filters.
    pub async fn row_count(&self, entity_type: &EntityType) -> usize {
        self.tables
            .read()
            .await
            .get(entity_type)
            .map_or(0, Vec::len)
    }

    fn ensure_known(&self, entity_type: &EntityType) -> Result<(), StorageError> {
        if self.metadata.describe(entity_type).is_none() {
            return Err(StorageError::UnknownEntityType(entity_type.clone()));
        }
        Ok(())
    }

    fn visible(&self, record: &Record, ignore_query_filters: bool) -> bool {
        ignore_query_filters
            || self
                .query_filters
                .get(&record.entity_type)
                .map_or(true, |f| f.matches(record))
    }

    /// Runs `op` after the simulated latency, bounded by `timeout`.
    async fn run<T, F>(
        &self,
        entity_type: &EntityType,
        timeout: Option<Duration>,
        op: F,
    ) -> Result<T, StorageError>
    where
        F: std::future::Future<Output = Result<T, StorageError>>,
    {
        let latency = self.latency;
        let work = async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            op.await
        };
        match timeout {
            Some(after) => tokio::time::timeout(after, work)
                .await
                .map_err(|_| StorageError::Timeout {
                    entity_type: entity_type.clone(),
                    after,
                })?,
            None => work.await,
        }
    }

    /// Filters, sorts and counts rows, then pages and materializes includes.
    async fn execute(&self, query: &QuerySpec) -> Result<Page<Record>, StorageError> {
        match query.tracking {
            TrackingMode::Untracked => self.untracked_executions.fetch_add(1, Ordering::SeqCst),
            TrackingMode::Tracked => self.tracked_executions.fetch_add(1, Ordering::SeqCst),
        };
        tracing::debug!(
            entity_type = %query.entity_type,
            tracking = %query.tracking,
            includes = query.includes.len(),
            "executing query"
        );

        self.ensure_known(&query.entity_type)?;
        check_includes(
            self.metadata.as_ref(),
            &query.entity_type,
            &query.includes,
            query.tracking,
        )?;

        let tables = self.tables.read().await;
        let mut rows: Vec<&Record> = tables
            .get(&query.entity_type)
            .map(|rows| {
                rows.iter()
                    .filter(|r| self.visible(r, query.ignore_query_filters))
                    .filter(|r| query.filter.matches(r))
                    .collect()
            })
            .unwrap_or_default();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|o| o.compare(a, b))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let total = rows.len();
        let take = query.take.unwrap_or(usize::MAX);
        let tree = IncludeTree::from_paths(&query.includes);
        let items = rows
            .into_iter()
            .skip(query.skip)
            .take(take)
            .map(|row| {
                let mut row = row.clone();
                self.materialize(&tables, &mut row, &tree, query.ignore_query_filters);
                row
            })
            .collect();

        Ok(Page { total, items })
    }

    fn materialize(
        &self,
        tables: &Tables,
        record: &mut Record,
        tree: &IncludeTree,
        ignore_query_filters: bool,
    ) {
        for (name, subtree) in tree.children() {
            let Some(nav) = self
                .metadata
                .find_navigations(&record.entity_type)
                .iter()
                .find(|n| n.name == name)
            else {
                continue;
            };
            let Some(join) = &nav.join else {
                continue;
            };
            let local = record.get(&join.local).clone();
            let mut related: Vec<Record> = if local.is_null() {
                Vec::new()
            } else {
                tables
                    .get(&nav.target)
                    .map(|rows| {
                        rows.iter()
                            .filter(|r| r.get(&join.remote) == &local)
                            .filter(|r| self.visible(r, ignore_query_filters))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default()
            };
            for child in &mut related {
                self.materialize(tables, child, subtree, ignore_query_filters);
            }
            let slot = if nav.is_collection {
                Related::Many(related)
            } else {
                related
                    .into_iter()
                    .next()
                    .map_or(Related::Absent, |r| Related::One(Box::new(r)))
            };
            record.set_related(name, slot);
        }
    }

    fn key_matches(&self, stored: &Record, candidate: &Record) -> bool {
        let keys = self.metadata.find_primary_key(&candidate.entity_type);
        !keys.is_empty()
            && keys
                .iter()
                .all(|k| stored.get(&k.name) == candidate.get(&k.name))
    }

    fn describe_key(&self, record: &Record) -> String {
        self.metadata
            .find_primary_key(&record.entity_type)
            .iter()
            .map(|k| format!("{}={}", k.name, record.get(&k.name)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drops navigation slots; only the row itself is stored.
fn strip(mut record: Record) -> Record {
    record.navigations.clear();
    record
}

#[async_trait]
impl StoreQuery for InMemoryStore {
    async fn fetch(&self, query: &QuerySpec) -> Result<Vec<Record>, StorageError> {
        let page = self
            .run(&query.entity_type, query.timeout, self.execute(query))
            .await?;
        Ok(page.items)
    }

    async fn fetch_page(&self, query: &QuerySpec) -> Result<Page<Record>, StorageError> {
        self.run(&query.entity_type, query.timeout, self.execute(query))
            .await
    }

    async fn insert(&self, record: Record) -> Result<u64, StorageError> {
        let entity_type = record.entity_type.clone();
        self.run(&entity_type, None, async {
            self.ensure_known(&record.entity_type)?;
            let mut tables = self.tables.write().await;
            let rows = tables.entry(record.entity_type.clone()).or_default();
            if rows.iter().any(|r| self.key_matches(r, &record)) {
                return Err(StorageError::DuplicateKey {
                    entity_type: record.entity_type.clone(),
                    key: self.describe_key(&record),
                });
            }
            rows.push(strip(record));
            Ok(1)
        })
        .await
    }

    async fn update(&self, record: Record) -> Result<u64, StorageError> {
        let entity_type = record.entity_type.clone();
        self.run(&entity_type, None, async {
            self.ensure_known(&record.entity_type)?;
            let mut tables = self.tables.write().await;
            let Some(rows) = tables.get_mut(&record.entity_type) else {
                return Ok(0);
            };
            match rows.iter_mut().find(|r| self.key_matches(r, &record)) {
                Some(row) => {
                    *row = strip(record);
                    Ok(1)
                }
                None => Ok(0),
            }
        })
        .await
    }

    async fn delete(
        &self,
        entity_type: &EntityType,
        filter: &Predicate,
    ) -> Result<u64, StorageError> {
        self.run(entity_type, None, async {
            self.ensure_known(entity_type)?;
            let mut tables = self.tables.write().await;
            let Some(rows) = tables.get_mut(entity_type) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|r| !filter.matches(r));
            Ok((before - rows.len()) as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navrepo_core::{
        EntityTypeDescriptor, MetadataRegistry, NavigationDescriptor, NavigationPath, OrderBy,
        Value, ValueKind,
    };

    fn metadata() -> Arc<dyn EntityMetadataProvider> {
        Arc::new(
            MetadataRegistry::new()
                .with(
                    EntityTypeDescriptor::new("Order")
                        .key("id", ValueKind::Int)
                        .field("customer_id")
                        .field("deleted")
                        .navigation(
                            NavigationDescriptor::single("Customer", "Customer")
                                .with_join("customer_id", "id"),
                        )
                        .navigation(
                            NavigationDescriptor::collection("Lines", "OrderLine")
                                .with_join("id", "order_id"),
                        ),
                )
                .with(EntityTypeDescriptor::new("Customer").key("id", ValueKind::Int))
                .with(
                    EntityTypeDescriptor::new("OrderLine")
                        .key("id", ValueKind::Int)
                        .navigation(
                            NavigationDescriptor::single("Order", "Order")
                                .with_join("order_id", "id"),
                        ),
                ),
        )
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new(metadata())
            .with_query_filter("Order", Predicate::eq("deleted", false));
        store
            .seed(vec![
                Record::new("Customer").with("id", 1).with("name", "Ada"),
                Record::new("Order").with("id", 10).with("customer_id", 1).with("deleted", false),
                Record::new("Order").with("id", 11).with("customer_id", 1).with("deleted", true),
                Record::new("OrderLine").with("id", 100).with("order_id", 10),
                Record::new("OrderLine").with("id", 101).with("order_id", 10),
            ])
            .await;
        store
    }

    fn order() -> EntityType {
        EntityType::new("Order")
    }

    #[tokio::test]
    async fn query_filter_hides_soft_deleted_rows_unless_ignored() {
        let store = seeded().await;
        let visible = store.fetch(&QuerySpec::new(order())).await.unwrap();
        assert_eq!(visible.len(), 1);
        let all = store
            .fetch(&QuerySpec::new(order()).ignore_query_filters())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn includes_materialize_single_and_collection_navigations() {
        let store = seeded().await;
        let rows = store
            .fetch(&QuerySpec::new(order()).include(vec![
                NavigationPath::from("Customer"),
                NavigationPath::from("Lines"),
            ]))
            .await
            .unwrap();
        let order = &rows[0];
        assert_eq!(order.walk("Customer")[0].get("name"), &Value::from("Ada"));
        assert_eq!(order.walk("Lines").len(), 2);
    }

    #[tokio::test]
    async fn cyclic_include_fails_untracked_and_loads_tracked() {
        let store = seeded().await;
        let query = QuerySpec::new(order()).include(vec![NavigationPath::from("Lines.Order")]);
        let err = store.fetch(&query).await.unwrap_err();
        assert!(matches!(err, StorageError::TrackingConflict { .. }));

        let rows = store
            .fetch(&query.clone().tracking(TrackingMode::Tracked))
            .await
            .unwrap();
        let back = rows[0].walk("Lines.Order");
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].get("id"), &Value::Int(10));
        assert_eq!(store.executions(TrackingMode::Untracked), 1);
        assert_eq!(store.executions(TrackingMode::Tracked), 1);
    }

    #[tokio::test]
    async fn page_reports_total_before_skip_take() {
        let store = seeded().await;
        let page = store
            .fetch_page(
                &QuerySpec::new(EntityType::new("OrderLine"))
                    .order_by(OrderBy::desc("id"))
                    .skip(1)
                    .take(5),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].get("id"), &Value::Int(100));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let store = InMemoryStore::new(metadata()).with_latency(Duration::from_millis(200));
        let err = store
            .fetch(&QuerySpec::new(order()).timeout(Some(Duration::from_millis(10))))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unknown_entity_type_is_reported() {
        let store = seeded().await;
        let err = store
            .fetch(&QuerySpec::new(EntityType::new("Ghost")))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::UnknownEntityType(EntityType::new("Ghost")));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_key_and_strips_navigations() {
        let store = seeded().await;
        let mut dup = Record::new("Customer").with("id", 1);
        dup.set_related("Orders", Related::Many(vec![]));
        let err = store.insert(dup).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));

        let mut fresh = Record::new("Customer").with("id", 2);
        fresh.set_related("Orders", Related::Many(vec![Record::new("Order")]));
        assert_eq!(store.insert(fresh).await.unwrap(), 1);
        let rows = store
            .fetch(&QuerySpec::new(EntityType::new("Customer")).filter(Predicate::eq("id", 2)))
            .await
            .unwrap();
        assert!(rows[0].navigations.is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_report_rows_affected() {
        let store = seeded().await;
        let renamed = Record::new("Customer").with("id", 1).with("name", "Grace");
        assert_eq!(store.update(renamed).await.unwrap(), 1);
        let missing = Record::new("Customer").with("id", 99);
        assert_eq!(store.update(missing).await.unwrap(), 0);

        let removed = store
            .delete(&EntityType::new("OrderLine"), &Predicate::eq("order_id", 10))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.row_count(&EntityType::new("OrderLine")).await, 0);
    }
}
