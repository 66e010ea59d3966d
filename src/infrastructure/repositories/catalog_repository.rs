//! Read-side queries for the public catalog, search, recommendations and
//! back-office statistics.
//!
//! Each read is a handful of set-based queries assembled in memory rather
//! than one query per hotel.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::holding_statuses;
use super::hotel_repository::{HotelRow, HOTEL_COLUMNS};
use super::room_repository::{RoomRow, ROOM_COLUMNS};
use super::service_item_repository::{ServiceRow, SERVICE_COLUMNS};
use crate::domain::{
    BookedWindow, BookingStatus, CatalogHotel, CatalogRepository, CatalogRoom, Hotel,
    PlatformStats, RecommendationCandidate, Room, SearchCandidate, ServiceTag, StayPeriod,
};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct TagLinkRow {
    owner_id: i64,
    id: i64,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ImageLinkRow {
    room_id: i64,
    url: String,
}

#[derive(Debug, sqlx::FromRow)]
struct WindowRow {
    room_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct RecommendationRow {
    #[sqlx(flatten)]
    hotel: HotelRow,
    min_price: Option<i64>,
    popularity: i64,
    first_room_image: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    users: i64,
    guests: i64,
    hotel_admins: i64,
    hotels: i64,
    rooms: i64,
    services: i64,
    bookings: i64,
    pending_bookings: i64,
    confirmed_bookings: i64,
    active_bookings: i64,
    cancelled_bookings: i64,
    finished_bookings: i64,
    invoices: i64,
    rfid_keys: i64,
    devices: i64,
}

fn group_tags(rows: Vec<TagLinkRow>) -> HashMap<i64, Vec<ServiceTag>> {
    let mut map: HashMap<i64, Vec<ServiceTag>> = HashMap::new();
    for row in rows {
        map.entry(row.owner_id).or_default().push(ServiceTag {
            id: row.id,
            name: row.name,
        });
    }
    map
}

fn popular_statuses() -> Vec<&'static str> {
    vec![BookingStatus::Confirmed.as_str(), BookingStatus::Finished.as_str()]
}

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hotel_tags(&self) -> Result<HashMap<i64, Vec<ServiceTag>>, AppError> {
        let rows = sqlx::query_as::<_, TagLinkRow>(
            r#"
            SELECT ht.hotel_id AS owner_id, t.id, t.name
            FROM hotel_tags ht
            JOIN service_tags t ON t.id = ht.tag_id
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(group_tags(rows))
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn catalog(&self) -> Result<Vec<CatalogHotel>, AppError> {
        let hotels = sqlx::query_as::<_, HotelRow>(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let rooms = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r ORDER BY r.hotel_id, r.name, r.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let services = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services s ORDER BY s.hotel_id, s.name, s.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut hotel_tags = self.hotel_tags().await?;

        let mut room_tags = group_tags(
            sqlx::query_as::<_, TagLinkRow>(
                r#"
                SELECT rt.room_id AS owner_id, t.id, t.name
                FROM room_tags rt
                JOIN service_tags t ON t.id = rt.tag_id
                ORDER BY t.name
                "#,
            )
            .fetch_all(&self.pool)
            .await?,
        );

        let mut room_images: HashMap<i64, Vec<String>> = HashMap::new();
        for row in sqlx::query_as::<_, ImageLinkRow>(
            r#"
            SELECT ri.room_id, i.url
            FROM room_images ri
            JOIN images i ON i.id = ri.image_id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        {
            room_images.entry(row.room_id).or_default().push(row.url);
        }

        let mut booked: HashMap<i64, Vec<BookedWindow>> = HashMap::new();
        for row in sqlx::query_as::<_, WindowRow>(
            r#"
            SELECT br.room_id, b.start_date, b.end_date
            FROM booking_rooms br
            JOIN bookings b ON b.id = br.booking_id
            WHERE b.status = ANY($1)
            ORDER BY b.start_date
            "#,
        )
        .bind(holding_statuses())
        .fetch_all(&self.pool)
        .await?
        {
            booked.entry(row.room_id).or_default().push(BookedWindow {
                start_date: row.start_date,
                end_date: row.end_date,
            });
        }

        let booking_counts: HashMap<i64, i64> = sqlx::query_as::<_, (i64, i64)>(
            "SELECT hotel_id, COUNT(*) FROM bookings WHERE status = ANY($1) GROUP BY hotel_id",
        )
        .bind(popular_statuses())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let mut rooms_by_hotel: HashMap<i64, Vec<CatalogRoom>> = HashMap::new();
        for row in rooms {
            let room = row.into_room();
            let entry = CatalogRoom {
                images: room_images.remove(&room.id).unwrap_or_default(),
                tags: room_tags.remove(&room.id).unwrap_or_default(),
                booked: booked.remove(&room.id).unwrap_or_default(),
                room,
            };
            rooms_by_hotel.entry(entry.room.hotel_id).or_default().push(entry);
        }

        let mut services_by_hotel: HashMap<i64, Vec<_>> = HashMap::new();
        for row in services {
            let service = row.into_service();
            services_by_hotel.entry(service.hotel_id).or_default().push(service);
        }

        Ok(hotels
            .into_iter()
            .map(|row| {
                let hotel = row.into_hotel();
                let id = hotel.id;
                CatalogHotel {
                    hotel,
                    rooms: rooms_by_hotel.remove(&id).unwrap_or_default(),
                    services: services_by_hotel.remove(&id).unwrap_or_default(),
                    tags: hotel_tags.remove(&id).unwrap_or_default(),
                    booking_count: booking_counts.get(&id).copied().unwrap_or(0),
                }
            })
            .collect())
    }

    async fn search_candidates(
        &self,
        city: &str,
        period: StayPeriod,
    ) -> Result<Vec<SearchCandidate>, AppError> {
        let hotels: Vec<Hotel> = sqlx::query_as::<_, HotelRow>(&format!(
            r#"
            SELECT {HOTEL_COLUMNS}
            FROM hotels
            WHERE location ILIKE '%' || $1 || '%'
            ORDER BY name, id
            "#
        ))
        .bind(city)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|r| r.into_hotel())
        .collect();

        if hotels.is_empty() {
            return Ok(Vec::new());
        }

        let hotel_ids: Vec<i64> = hotels.iter().map(|h| h.id).collect();
        let free_rooms = sqlx::query_as::<_, RoomRow>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms r
            WHERE r.hotel_id = ANY($1)
              AND NOT EXISTS (
                  SELECT 1
                  FROM booking_rooms br
                  JOIN bookings b ON b.id = br.booking_id
                  WHERE br.room_id = r.id
                    AND b.status = ANY($2)
                    AND b.start_date < $4
                    AND b.end_date > $3
              )
            ORDER BY r.hotel_id, r.id
            "#
        ))
        .bind(&hotel_ids)
        .bind(holding_statuses())
        .bind(period.start())
        .bind(period.end())
        .fetch_all(&self.pool)
        .await?;

        let mut by_hotel: HashMap<i64, Vec<Room>> = HashMap::new();
        for row in free_rooms {
            let room = row.into_room();
            by_hotel.entry(room.hotel_id).or_default().push(room);
        }

        Ok(hotels
            .into_iter()
            .filter_map(|hotel| {
                let free_rooms = by_hotel.remove(&hotel.id)?;
                Some(SearchCandidate { hotel, free_rooms })
            })
            .collect())
    }

    async fn recommendation_candidates(&self) -> Result<Vec<RecommendationCandidate>, AppError> {
        let rows = sqlx::query_as::<_, RecommendationRow>(&format!(
            r#"
            SELECT {HOTEL_COLUMNS},
                   (SELECT MIN(r.price_per_night) FROM rooms r WHERE r.hotel_id = h.id) AS min_price,
                   (SELECT COUNT(*) FROM bookings b
                     WHERE b.hotel_id = h.id AND b.status = ANY($1)) AS popularity,
                   (SELECT i.url
                      FROM rooms r
                      JOIN room_images ri ON ri.room_id = r.id
                      JOIN images i ON i.id = ri.image_id
                     WHERE r.hotel_id = h.id
                     ORDER BY r.id, i.id
                     LIMIT 1) AS first_room_image
            FROM hotels h
            "#
        ))
        .bind(popular_statuses())
        .fetch_all(&self.pool)
        .await?;

        let mut tags = self.hotel_tags().await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let hotel = row.hotel.into_hotel();
                let cover_image = hotel.cover_image.clone().or(row.first_room_image);
                RecommendationCandidate {
                    tags: tags.remove(&hotel.id).unwrap_or_default(),
                    hotel,
                    min_price: row.min_price,
                    popularity: row.popularity,
                    cover_image,
                }
            })
            .collect())
    }

    async fn platform_stats(&self) -> Result<PlatformStats, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE role = 'guest') AS guests,
                (SELECT COUNT(*) FROM users WHERE role = 'hotel') AS hotel_admins,
                (SELECT COUNT(*) FROM hotels) AS hotels,
                (SELECT COUNT(*) FROM rooms) AS rooms,
                (SELECT COUNT(*) FROM services) AS services,
                (SELECT COUNT(*) FROM bookings) AS bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS pending_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'confirmed') AS confirmed_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'active') AS active_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'cancelled') AS cancelled_bookings,
                (SELECT COUNT(*) FROM bookings WHERE status = 'finished') AS finished_bookings,
                (SELECT COUNT(*) FROM invoices) AS invoices,
                (SELECT COUNT(*) FROM rfid_keys) AS rfid_keys,
                (SELECT COUNT(*) FROM devices) AS devices
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            users: row.users,
            guests: row.guests,
            hotel_admins: row.hotel_admins,
            hotels: row.hotels,
            rooms: row.rooms,
            services: row.services,
            bookings: row.bookings,
            pending_bookings: row.pending_bookings,
            confirmed_bookings: row.confirmed_bookings,
            active_bookings: row.active_bookings,
            cancelled_bookings: row.cancelled_bookings,
            finished_bookings: row.finished_bookings,
            invoices: row.invoices,
            rfid_keys: row.rfid_keys,
            devices: row.devices,
        })
    }
}
