//! Process-local [`SessionStore`] for development without a database and for tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;
use wsproxy_core::{Credentials, Integration};

use crate::store::SessionStore;
use crate::DbError;

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<Uuid, Integration>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Integration>, DbError> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn find_pending(&self, temp_id: &str) -> Result<Option<Integration>, DbError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .find(|record| record.pending().is_some_and(|p| p.temp_id == temp_id))
            .cloned())
    }

    async fn upsert(&self, integration: &Integration) -> Result<Uuid, DbError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&integration.id) {
            Some(existing) => existing.credentials = integration.credentials.clone(),
            None => {
                records.insert(integration.id, integration.clone());
            }
        }
        Ok(integration.id)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        Ok(self.records.lock().await.remove(&id).is_some())
    }

    async fn purge_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| match &record.credentials {
            Credentials::Pending2fa(pending) => pending.created_at >= cutoff,
            Credentials::Authenticated(_) => true,
        });
        Ok(u64::try_from(before - records.len()).unwrap_or(u64::MAX))
    }

    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }
}
