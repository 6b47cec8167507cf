use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use wsproxy_core::{Credentials, Integration, IntegrationContext};

use crate::store::SessionStore;
use crate::DbError;

const SELECT_COLUMNS: &str = "SELECT id, company_id, wholesaler_id, wholesaler_name, branza, \
     credentials, is_active, created_at, updated_at FROM wholesaler_integrations";

#[derive(Debug, sqlx::FromRow)]
pub struct IntegrationRow {
    pub id: Uuid,
    pub company_id: String,
    pub wholesaler_id: String,
    pub wholesaler_name: String,
    pub branza: String,
    pub credentials: Json<Credentials>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IntegrationRow> for Integration {
    fn from(row: IntegrationRow) -> Self {
        if row.is_active != matches!(row.credentials.0, Credentials::Authenticated(_)) {
            tracing::warn!(
                integration_id = %row.id,
                "is_active column disagrees with credential state; trusting credentials"
            );
        }
        Integration {
            id: row.id,
            context: IntegrationContext {
                company_id: row.company_id,
                wholesaler_id: row.wholesaler_id,
                wholesaler_name: row.wholesaler_name,
                branza: row.branza,
            },
            credentials: row.credentials.0,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed [`SessionStore`] over the `wholesaler_integrations` table.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SessionStore for PgSessionStore {
    async fn get(&self, id: Uuid) -> Result<Option<Integration>, DbError> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Integration::from))
    }

    async fn find_pending(&self, temp_id: &str) -> Result<Option<Integration>, DbError> {
        let row = sqlx::query_as::<_, IntegrationRow>(&format!(
            "{SELECT_COLUMNS} WHERE is_active = false \
             AND credentials->>'kind' = 'pending_2fa' \
             AND credentials->>'tempId' = $1 \
             LIMIT 1"
        ))
        .bind(temp_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Integration::from))
    }

    async fn upsert(&self, integration: &Integration) -> Result<Uuid, DbError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO wholesaler_integrations \
             (id, company_id, wholesaler_id, wholesaler_name, branza, credentials, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
               credentials = EXCLUDED.credentials, \
               is_active = EXCLUDED.is_active, \
               updated_at = NOW() \
             RETURNING id",
        )
        .bind(integration.id)
        .bind(&integration.context.company_id)
        .bind(&integration.context.wholesaler_id)
        .bind(&integration.context.wholesaler_name)
        .bind(&integration.context.branza)
        .bind(Json(&integration.credentials))
        .bind(integration.is_active())
        .bind(integration.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM wholesaler_integrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query(
            "DELETE FROM wholesaler_integrations \
             WHERE is_active = false \
               AND credentials->>'kind' = 'pending_2fa' \
               AND (credentials->>'createdAt')::timestamptz < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}
