//! Storage seam for integration records.
//!
//! Handlers never hold state between invocations; everything that must
//! survive from one request to the next (cookie jars, pending SMS
//! challenges) goes through this trait.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wsproxy_core::Integration;

use crate::DbError;

pub trait SessionStore: Send + Sync {
    fn get(&self, id: Uuid) -> impl Future<Output = Result<Option<Integration>, DbError>> + Send;

    /// Finds the inactive record parked on the given SMS challenge id.
    fn find_pending(
        &self,
        temp_id: &str,
    ) -> impl Future<Output = Result<Option<Integration>, DbError>> + Send;

    /// Inserts the record or replaces its credentials.
    ///
    /// Tenant context columns are written on insert only.
    fn upsert(
        &self,
        integration: &Integration,
    ) -> impl Future<Output = Result<Uuid, DbError>> + Send;

    /// Returns whether a record was removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Deletes pending challenges created before `cutoff`.
    fn purge_expired_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn health_check(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Store picked at startup: Postgres when a database is configured, memory otherwise.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Postgres(crate::PgSessionStore),
    Memory(crate::MemorySessionStore),
}

impl SessionStore for AnyStore {
    async fn get(&self, id: Uuid) -> Result<Option<Integration>, DbError> {
        match self {
            Self::Postgres(store) => store.get(id).await,
            Self::Memory(store) => store.get(id).await,
        }
    }

    async fn find_pending(&self, temp_id: &str) -> Result<Option<Integration>, DbError> {
        match self {
            Self::Postgres(store) => store.find_pending(temp_id).await,
            Self::Memory(store) => store.find_pending(temp_id).await,
        }
    }

    async fn upsert(&self, integration: &Integration) -> Result<Uuid, DbError> {
        match self {
            Self::Postgres(store) => store.upsert(integration).await,
            Self::Memory(store) => store.upsert(integration).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        match self {
            Self::Postgres(store) => store.delete(id).await,
            Self::Memory(store) => store.delete(id).await,
        }
    }

    async fn purge_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        match self {
            Self::Postgres(store) => store.purge_expired_pending(cutoff).await,
            Self::Memory(store) => store.purge_expired_pending(cutoff).await,
        }
    }

    async fn health_check(&self) -> Result<(), DbError> {
        match self {
            Self::Postgres(store) => store.health_check().await,
            Self::Memory(store) => store.health_check().await,
        }
    }
}
