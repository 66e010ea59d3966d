//! Read models for the public catalog, search and recommendations, and the
//! back-office statistics.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::hotel::Hotel;
use super::room::Room;
use super::service_item::ServiceItem;
use super::tag::ServiceTag;
use crate::domain::value_objects::StayPeriod;
use crate::shared::error::AppError;

/// A holding booking window on a room, exposed so clients can grey out dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRoom {
    pub room: Room,
    pub images: Vec<String>,
    pub tags: Vec<ServiceTag>,
    pub booked: Vec<BookedWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogHotel {
    pub hotel: Hotel,
    pub rooms: Vec<CatalogRoom>,
    pub services: Vec<ServiceItem>,
    pub tags: Vec<ServiceTag>,
    /// Confirmed and finished bookings
    pub booking_count: i64,
}

impl CatalogHotel {
    /// Lowest nightly price among the hotel's rooms.
    pub fn min_price(&self) -> Option<i64> {
        self.rooms.iter().map(|r| r.room.price_per_night).min()
    }
}

/// A hotel matching a search together with its rooms free for the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub hotel: Hotel,
    pub free_rooms: Vec<Room>,
}

/// Inputs of the recommendation ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub hotel: Hotel,
    pub min_price: Option<i64>,
    pub popularity: i64,
    pub cover_image: Option<String>,
    pub tags: Vec<ServiceTag>,
}

/// Back-office dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub users: i64,
    pub guests: i64,
    pub hotel_admins: i64,
    pub hotels: i64,
    pub rooms: i64,
    pub services: i64,
    pub bookings: i64,
    pub pending_bookings: i64,
    pub confirmed_bookings: i64,
    pub active_bookings: i64,
    pub cancelled_bookings: i64,
    pub finished_bookings: i64,
    pub invoices: i64,
    pub rfid_keys: i64,
    pub devices: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn catalog(&self) -> Result<Vec<CatalogHotel>, AppError>;

    /// Hotels whose location contains `city`, with rooms free for `period`.
    async fn search_candidates(
        &self,
        city: &str,
        period: StayPeriod,
    ) -> Result<Vec<SearchCandidate>, AppError>;

    async fn recommendation_candidates(&self) -> Result<Vec<RecommendationCandidate>, AppError>;

    async fn platform_stats(&self) -> Result<PlatformStats, AppError>;
}
