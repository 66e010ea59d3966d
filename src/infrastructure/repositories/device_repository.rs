//! Device Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Device, DeviceRepository};
use crate::shared::error::{map_constraint_violation, AppError};

const DEVICE_COLUMNS: &str = "id, hotel_id, name, token_hash, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    hotel_id: i64,
    name: Option<String>,
    token_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeviceRow {
    fn into_device(self) -> Device {
        Device {
            id: self.id,
            hotel_id: self.hotel_id,
            name: self.name,
            token_hash: self.token_hash,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgDeviceRepository {
    pool: PgPool,
}

impl PgDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for PgDeviceRepository {
    async fn list(&self) -> Result<Vec<Device>, AppError> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_device()).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Device>, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_device()))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Device>, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_device()))
    }

    async fn create(&self, device: &Device) -> Result<Device, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            INSERT INTO devices (id, hotel_id, name, token_hash, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(device.id)
        .bind(device.hotel_id)
        .bind(&device.name)
        .bind(&device.token_hash)
        .bind(device.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "This hotel already has a device"))?;

        Ok(row.into_device())
    }

    async fn update(&self, device: &Device) -> Result<Device, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            UPDATE devices
            SET name = $2, is_active = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(device.id)
        .bind(&device.name)
        .bind(device.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device with id {} not found", device.id)))?;

        Ok(row.into_device())
    }

    async fn rotate_token(&self, id: i64, token_hash: &str) -> Result<Device, AppError> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            r#"
            UPDATE devices
            SET token_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device with id {} not found", id)))?;

        Ok(row.into_device())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Device with id {} not found", id)));
        }

        Ok(())
    }
}
