//! Hotel service repository (breakfast, parking and the like).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ServiceItem, ServiceItemRepository};
use crate::shared::error::AppError;

pub(super) const SERVICE_COLUMNS: &str = "s.id, s.hotel_id, s.name, s.description, s.price, s.created_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ServiceRow {
    id: i64,
    hotel_id: i64,
    name: String,
    description: Option<String>,
    price: i64,
    created_at: DateTime<Utc>,
}

impl ServiceRow {
    pub(super) fn into_service(self) -> ServiceItem {
        ServiceItem {
            id: self.id,
            hotel_id: self.hotel_id,
            name: self.name,
            description: self.description,
            price: self.price,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgServiceItemRepository {
    pool: PgPool,
}

impl PgServiceItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceItemRepository for PgServiceItemRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceItem>, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_service()))
    }

    async fn list_by_hotel(&self, hotel_id: i64) -> Result<Vec<ServiceItem>, AppError> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services s WHERE s.hotel_id = $1 ORDER BY s.name, s.id"
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_service()).collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<ServiceItem>, AppError> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services s WHERE s.id = ANY($1) ORDER BY s.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_service()).collect())
    }

    async fn create(&self, item: &ServiceItem) -> Result<ServiceItem, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            INSERT INTO services AS s (id, hotel_id, name, description, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING s.id, s.hotel_id, s.name, s.description, s.price, s.created_at
            "#,
        )
        .bind(item.id)
        .bind(item.hotel_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_service())
    }

    async fn update(&self, item: &ServiceItem) -> Result<ServiceItem, AppError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            UPDATE services AS s
            SET name = $2, description = $3, price = $4
            WHERE s.id = $1
            RETURNING s.id, s.hotel_id, s.name, s.description, s.price, s.created_at
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service with id {} not found", item.id)))?;

        Ok(row.into_service())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service with id {} not found", id)));
        }

        Ok(())
    }
}
