//! Images referenced by URL and linked to rooms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maps to the `images` table; rooms link through `room_images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: &Image) -> Result<Image, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Image>, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    async fn link_room(&self, room_id: i64, image_id: i64) -> Result<(), AppError>;

    async fn unlink_room(&self, room_id: i64, image_id: i64) -> Result<(), AppError>;

    async fn list_for_room(&self, room_id: i64) -> Result<Vec<Image>, AppError>;

    /// Hotel owning the rooms this image is linked to, if any.
    async fn owning_hotel(&self, image_id: i64) -> Result<Option<i64>, AppError>;
}
