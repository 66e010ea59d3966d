//! Parking table for webhook deliveries that ran out of attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{NotificationRepository, PendingNotification};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    id: i64,
    hotel_id: i64,
    endpoint: String,
    payload: serde_json::Value,
    tries: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PendingRow {
    fn into_pending(self) -> PendingNotification {
        PendingNotification {
            id: self.id,
            hotel_id: self.hotel_id,
            endpoint: self.endpoint,
            payload: self.payload,
            tries: self.tries,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn store_pending(&self, pending: &PendingNotification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO pending_notifications (id, hotel_id, endpoint, payload, tries, last_error)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(pending.id)
        .bind(pending.hotel_id)
        .bind(&pending.endpoint)
        .bind(&pending.payload)
        .bind(pending.tries)
        .bind(&pending.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<PendingNotification>, AppError> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT id, hotel_id, endpoint, payload, tries, last_error, created_at, updated_at
            FROM pending_notifications
            ORDER BY updated_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_pending()).collect())
    }

    async fn delete_pending(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM pending_notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE pending_notifications
            SET tries = tries + 1, last_error = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
