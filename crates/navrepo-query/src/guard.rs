//! Circular-reference detection and the tracked-retry protocol.
//!
//! Untracked loads are cheaper, but a store may reject an untracked query
//! whose include graph loops back onto an entity type. The guard runs every
//! full-depth load untracked first; when the store reports that specific
//! conflict it flags the entity type and retries tracked. Flagged types go
//! straight to tracked loads afterwards.
//!
//! The flag is a one-way `Unflagged -> Flagged` transition under
//! [`FlagPolicy::Permanent`]. Under [`FlagPolicy::Reprobe`] a flag older than
//! the configured interval lets one untracked probe through again.

use std::future::Future;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use navrepo_core::EntityType;
use navrepo_storage::{StorageError, TrackingMode};

use crate::config::FlagPolicy;
use crate::error::QueryError;

/// Recognizes the store's circular-reference failure.
pub fn is_tracking_conflict(error: &StorageError) -> bool {
    matches!(error, StorageError::TrackingConflict { .. })
}

/// Classification of one store call.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    TrackingConflict(StorageError),
    Failure(StorageError),
}

impl<T> Outcome<T> {
    pub fn classify(result: Result<T, StorageError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) if is_tracking_conflict(&error) => Outcome::TrackingConflict(error),
            Err(error) => Outcome::Failure(error),
        }
    }
}

/// Races `fut` against `cancel`. Cancellation wins ties.
pub async fn cancellable<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output, QueryError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("store call cancelled");
            Err(QueryError::Cancelled)
        }
        output = fut => Ok(output),
    }
}

pub struct CircularReferenceGuard {
    policy: FlagPolicy,
    flagged: DashMap<EntityType, Instant>,
}

impl CircularReferenceGuard {
    pub fn new(policy: FlagPolicy) -> Self {
        CircularReferenceGuard {
            policy,
            flagged: DashMap::new(),
        }
    }

    pub fn policy(&self) -> FlagPolicy {
        self.policy
    }

    /// Whether loads of `entity_type` should skip the untracked attempt.
    pub fn is_flagged(&self, entity_type: &EntityType) -> bool {
        let Some(since) = self.flagged.get(entity_type).map(|e| *e.value()) else {
            return false;
        };
        match self.policy {
            FlagPolicy::Permanent => true,
            FlagPolicy::Reprobe { after } => since.elapsed() < after,
        }
    }

    /// Flags `entity_type`. Returns `true` when the type was not flagged
    /// before, or under `Reprobe` when its previous flag had expired. Under
    /// `Reprobe` the timestamp is refreshed.
    pub fn flag(&self, entity_type: &EntityType) -> bool {
        match self.policy {
            FlagPolicy::Permanent => {
                let mut fresh = false;
                self.flagged.entry(entity_type.clone()).or_insert_with(|| {
                    fresh = true;
                    Instant::now()
                });
                fresh
            }
            FlagPolicy::Reprobe { after } => self
                .flagged
                .insert(entity_type.clone(), Instant::now())
                .map_or(true, |since| since.elapsed() >= after),
        }
    }

    /// Snapshot of every flagged entity type.
    pub fn flagged(&self) -> Vec<EntityType> {
        self.flagged.iter().map(|e| e.key().clone()).collect()
    }

    /// Runs `exec` under the retry protocol.
    ///
    /// Store failures are logged and answered with `default`; only
    /// cancellation reaches the caller as an error.
    pub async fn execute<T, F, Fut>(
        &self,
        entity_type: &EntityType,
        operation: &'static str,
        default: T,
        cancel: &CancellationToken,
        exec: F,
    ) -> Result<T, QueryError>
    where
        F: Fn(TrackingMode) -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        if self.is_flagged(entity_type) {
            return match cancellable(cancel, exec(TrackingMode::Tracked)).await? {
                Ok(value) => Ok(value),
                Err(error) => {
                    tracing::error!(
                        entity_type = %entity_type,
                        operation,
                        error = %error,
                        "tracked load failed"
                    );
                    Ok(default)
                }
            };
        }

        let first = cancellable(cancel, exec(TrackingMode::Untracked)).await?;
        match Outcome::classify(first) {
            Outcome::Success(value) => Ok(value),
            Outcome::TrackingConflict(conflict) => {
                if self.flag(entity_type) {
                    tracing::warn!(
                        entity_type = %entity_type,
                        operation,
                        error = %conflict,
                        "circular reference detected, loading tracked from now on"
                    );
                }
                match cancellable(cancel, exec(TrackingMode::Tracked)).await? {
                    Ok(value) => Ok(value),
                    Err(fallback) => {
                        tracing::error!(
                            entity_type = %entity_type,
                            operation,
                            error = %conflict,
                            fallback_error = %fallback,
                            "tracked fallback failed"
                        );
                        Ok(default)
                    }
                }
            }
            Outcome::Failure(error) => {
                tracing::error!(
                    entity_type = %entity_type,
                    operation,
                    error = %error,
                    "load failed"
                );
                Ok(default)
            }
        }
    }
}
