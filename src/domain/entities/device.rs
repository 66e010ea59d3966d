//! Hotel terminals (door controllers, check-in kiosks) authenticated by token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maps to the `devices` table; one device credential per hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub hotel_id: i64,
    pub name: Option<String>,
    /// SHA-256 of the bearer token, which is shown once on creation
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Device>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Device>, AppError>;

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Device>, AppError>;

    async fn create(&self, device: &Device) -> Result<Device, AppError>;

    async fn update(&self, device: &Device) -> Result<Device, AppError>;

    async fn rotate_token(&self, id: i64, token_hash: &str) -> Result<Device, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
