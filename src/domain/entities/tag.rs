//! Service tags ("wifi", "pool") attached to hotels and rooms.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A tag. Maps to the `service_tags` table; `name` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTag {
    pub id: i64,
    pub name: String,
}

/// How often a tag is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
    pub tag: ServiceTag,
    pub hotel_count: i64,
    pub room_count: i64,
}

/// Repository trait for tags and their join tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ServiceTag>, AppError>;

    async fn usage(&self) -> Result<Vec<TagUsage>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceTag>, AppError>;

    async fn create(&self, tag: &ServiceTag) -> Result<ServiceTag, AppError>;

    async fn update(&self, tag: &ServiceTag) -> Result<ServiceTag, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    async fn attach_to_hotel(&self, hotel_id: i64, tag_id: i64) -> Result<(), AppError>;

    async fn detach_from_hotel(&self, hotel_id: i64, tag_id: i64) -> Result<(), AppError>;

    async fn attach_to_room(&self, room_id: i64, tag_id: i64) -> Result<(), AppError>;

    async fn detach_from_room(&self, room_id: i64, tag_id: i64) -> Result<(), AppError>;

    async fn list_for_hotel(&self, hotel_id: i64) -> Result<Vec<ServiceTag>, AppError>;

    async fn list_for_room(&self, room_id: i64) -> Result<Vec<ServiceTag>, AppError>;
}
