//! Hotel entity and repository trait.
//!
//! Maps to the `hotels` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use crate::shared::error::AppError;

/// Property type matching the `hotels.hotel_type` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HotelType {
    #[default]
    Hotel,
    Apartment,
    Villa,
    Other,
}

impl HotelType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hotel" => Self::Hotel,
            "apartment" => Self::Apartment,
            "villa" => Self::Villa,
            _ => Self::Other,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotel => "hotel",
            Self::Apartment => "apartment",
            Self::Villa => "villa",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for HotelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A property listed on the platform, owned by one hotel admin.
///
/// Maps to the `hotels` table:
/// - id: BIGINT PRIMARY KEY
/// - owner_id: BIGINT NOT NULL UNIQUE REFERENCES users(id)
/// - name: VARCHAR(100), location: VARCHAR(255)
/// - description: TEXT NULL
/// - hotel_type: VARCHAR(20)
/// - star_rating: SMALLINT NULL (1-5)
/// - cover_image: TEXT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub hotel_type: HotelType,
    pub star_rating: Option<i16>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

impl Default for Hotel {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner_id: 0,
            name: String::new(),
            location: String::new(),
            description: None,
            hotel_type: HotelType::default(),
            star_rating: None,
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for hotels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HotelRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Hotel>, AppError>;

    async fn find_by_owner(&self, owner_id: i64) -> Result<Option<Hotel>, AppError>;

    /// List hotels, optionally filtered by a case-insensitive location fragment.
    async fn list(&self, location: Option<String>) -> Result<Vec<Hotel>, AppError>;

    /// Insert the owner account and its hotel atomically.
    async fn create_with_owner(&self, owner: &User, hotel: &Hotel) -> Result<(User, Hotel), AppError>;

    async fn update(&self, hotel: &Hotel) -> Result<Hotel, AppError>;

    /// Delete a hotel unless it still has holding bookings that end after today.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Distinct hotel locations, sorted.
    async fn locations(&self) -> Result<Vec<String>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotel_type_round_trip_and_fallback() {
        for t in [HotelType::Hotel, HotelType::Apartment, HotelType::Villa, HotelType::Other] {
            assert_eq!(HotelType::from_str(t.as_str()), t);
        }
        assert_eq!(HotelType::from_str("castle"), HotelType::Other);
    }

    #[test]
    fn test_ownership() {
        let hotel = Hotel {
            owner_id: 7,
            ..Hotel::default()
        };
        assert!(hotel.is_owned_by(7));
        assert!(!hotel.is_owned_by(8));
    }
}
