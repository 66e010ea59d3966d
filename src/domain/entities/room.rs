//! Room entity and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A bookable room. Prices are in minor currency units.
///
/// Maps to the `rooms` table:
/// - id: BIGINT PRIMARY KEY
/// - hotel_id: BIGINT NOT NULL REFERENCES hotels(id) ON DELETE CASCADE
/// - price_per_night, base_price: BIGINT NOT NULL CHECK (>= 0)
/// - capacity: INTEGER NOT NULL CHECK (>= 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub hotel_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_per_night: i64,
    /// One-off charge per stay (cleaning, linen)
    pub base_price: i64,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Room {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            hotel_id: 0,
            name: String::new(),
            description: None,
            price_per_night: 0,
            base_price: 0,
            capacity: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for rooms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>, AppError>;

    async fn list_by_hotel(&self, hotel_id: i64) -> Result<Vec<Room>, AppError>;

    /// Fetch the given rooms; unknown ids are simply absent from the result.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<Room>, AppError>;

    async fn create(&self, room: &Room) -> Result<Room, AppError>;

    async fn update(&self, room: &Room) -> Result<Room, AppError>;

    /// Delete a room unless holding bookings still reference it.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}
