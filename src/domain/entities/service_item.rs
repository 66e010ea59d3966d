//! Bookable extras offered by a hotel (breakfast, parking, spa).
//!
//! Maps to the `services` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A hotel service charged once per booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: i64,
    pub hotel_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for hotel services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceItemRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceItem>, AppError>;

    async fn list_by_hotel(&self, hotel_id: i64) -> Result<Vec<ServiceItem>, AppError>;

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<ServiceItem>, AppError>;

    async fn create(&self, item: &ServiceItem) -> Result<ServiceItem, AppError>;

    async fn update(&self, item: &ServiceItem) -> Result<ServiceItem, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
