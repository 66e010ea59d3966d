//! Room Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::holding_statuses;
use crate::domain::{Room, RoomRepository};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::AppError;

pub(super) const ROOM_COLUMNS: &str = "r.id, r.hotel_id, r.name, r.description, r.price_per_night, \
     r.base_price, r.capacity, r.created_at, r.updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct RoomRow {
    id: i64,
    hotel_id: i64,
    name: String,
    description: Option<String>,
    price_per_night: i64,
    base_price: i64,
    capacity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoomRow {
    pub(super) fn into_room(self) -> Room {
        Room {
            id: self.id,
            hotel_id: self.hotel_id,
            name: self.name,
            description: self.description,
            price_per_night: self.price_per_night,
            base_price: self.base_price,
            capacity: self.capacity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL room repository implementation.
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_room()))
    }

    async fn list_by_hotel(&self, hotel_id: i64) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.hotel_id = $1 ORDER BY r.name, r.id"
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms r WHERE r.id = ANY($1) ORDER BY r.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn create(&self, room: &Room) -> Result<Room, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO rooms AS r (id, hotel_id, name, description, price_per_night, base_price, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING r.id, r.hotel_id, r.name, r.description, r.price_per_night,
                      r.base_price, r.capacity, r.created_at, r.updated_at
            "#,
        )
        .bind(room.id)
        .bind(room.hotel_id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.price_per_night)
        .bind(room.base_price)
        .bind(room.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_room())
    }

    async fn update(&self, room: &Room) -> Result<Room, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE rooms AS r
            SET name = $2,
                description = $3,
                price_per_night = $4,
                base_price = $5,
                capacity = $6,
                updated_at = NOW()
            WHERE r.id = $1
            RETURNING r.id, r.hotel_id, r.name, r.description, r.price_per_night,
                      r.base_price, r.capacity, r.created_at, r.updated_at
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.price_per_night)
        .bind(room.base_price)
        .bind(room.capacity)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Room with id {} not found", room.id)))?;

        Ok(row.into_room())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(ctx.conn())
                .await?;
            if locked.is_none() {
                return Err(AppError::NotFound(format!("Room with id {} not found", id)));
            }

            let busy = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM booking_rooms br
                    JOIN bookings b ON b.id = br.booking_id
                    WHERE br.room_id = $1 AND b.status = ANY($2)
                )
                "#,
            )
            .bind(id)
            .bind(holding_statuses())
            .fetch_one(ctx.conn())
            .await?;
            if busy {
                return Err(AppError::Conflict("Room has active bookings".to_string()));
            }

            sqlx::query("DELETE FROM rooms WHERE id = $1")
                .bind(id)
                .execute(ctx.conn())
                .await?;

            Ok(((), ctx))
        })
        .await
    }
}
