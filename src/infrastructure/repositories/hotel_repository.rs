//! Hotel Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::holding_statuses;
use super::user_repository::{UserRow, USER_COLUMNS};
use crate::domain::{Hotel, HotelRepository, HotelType, User};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::{map_constraint_violation, AppError};

pub(super) const HOTEL_COLUMNS: &str = "id, owner_id, name, location, description, hotel_type, \
     star_rating, cover_image, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct HotelRow {
    id: i64,
    owner_id: i64,
    name: String,
    location: String,
    description: Option<String>,
    hotel_type: String,
    star_rating: Option<i16>,
    cover_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl HotelRow {
    pub(super) fn into_hotel(self) -> Hotel {
        Hotel {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            location: self.location,
            description: self.description,
            hotel_type: HotelType::from_str(&self.hotel_type),
            star_rating: self.star_rating,
            cover_image: self.cover_image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL hotel repository implementation.
#[derive(Clone)]
pub struct PgHotelRepository {
    pool: PgPool,
}

impl PgHotelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HotelRepository for PgHotelRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Hotel>, AppError> {
        let row = sqlx::query_as::<_, HotelRow>(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_hotel()))
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Option<Hotel>, AppError> {
        let row = sqlx::query_as::<_, HotelRow>(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_hotel()))
    }

    async fn list(&self, location: Option<String>) -> Result<Vec<Hotel>, AppError> {
        let rows = sqlx::query_as::<_, HotelRow>(&format!(
            r#"
            SELECT {HOTEL_COLUMNS}
            FROM hotels
            WHERE ($1::TEXT IS NULL OR location ILIKE '%' || $1 || '%')
            ORDER BY name, id
            "#
        ))
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_hotel()).collect())
    }

    async fn create_with_owner(&self, owner: &User, hotel: &Hotel) -> Result<(User, Hotel), AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let user = sqlx::query_as::<_, UserRow>(&format!(
                r#"
                INSERT INTO users (id, name, email, password_hash, role, tax_number, bank_account, eu_tax_number)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(owner.id)
            .bind(&owner.name)
            .bind(&owner.email)
            .bind(&owner.password_hash)
            .bind(owner.role.as_str())
            .bind(&owner.tax_number)
            .bind(&owner.bank_account)
            .bind(&owner.eu_tax_number)
            .fetch_one(ctx.conn())
            .await
            .map_err(|e| map_constraint_violation(e, "User with this email already exists"))?;

            let created = sqlx::query_as::<_, HotelRow>(&format!(
                r#"
                INSERT INTO hotels (id, owner_id, name, location, description, hotel_type, star_rating, cover_image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {HOTEL_COLUMNS}
                "#
            ))
            .bind(hotel.id)
            .bind(owner.id)
            .bind(&hotel.name)
            .bind(&hotel.location)
            .bind(&hotel.description)
            .bind(hotel.hotel_type.as_str())
            .bind(hotel.star_rating)
            .bind(&hotel.cover_image)
            .fetch_one(ctx.conn())
            .await?;

            Ok(((user.into_user(), created.into_hotel()), ctx))
        })
        .await
    }

    async fn update(&self, hotel: &Hotel) -> Result<Hotel, AppError> {
        let row = sqlx::query_as::<_, HotelRow>(&format!(
            r#"
            UPDATE hotels
            SET name = $2,
                location = $3,
                description = $4,
                hotel_type = $5,
                star_rating = $6,
                cover_image = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {HOTEL_COLUMNS}
            "#
        ))
        .bind(hotel.id)
        .bind(&hotel.name)
        .bind(&hotel.location)
        .bind(&hotel.description)
        .bind(hotel.hotel_type.as_str())
        .bind(hotel.star_rating)
        .bind(&hotel.cover_image)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Hotel with id {} not found", hotel.id)))?;

        Ok(row.into_hotel())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM hotels WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(ctx.conn())
                .await?;
            if locked.is_none() {
                return Err(AppError::NotFound(format!("Hotel with id {} not found", id)));
            }

            let busy = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM bookings
                    WHERE hotel_id = $1 AND status = ANY($2) AND end_date > CURRENT_DATE
                )
                "#,
            )
            .bind(id)
            .bind(holding_statuses())
            .fetch_one(ctx.conn())
            .await?;
            if busy {
                return Err(AppError::Conflict(
                    "Hotel has active or upcoming bookings".to_string(),
                ));
            }

            sqlx::query("DELETE FROM hotels WHERE id = $1")
                .bind(id)
                .execute(ctx.conn())
                .await?;

            Ok(((), ctx))
        })
        .await
    }

    async fn locations(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT location FROM hotels ORDER BY location",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
