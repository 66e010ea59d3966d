//! Image repository and room image links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Image, ImageRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i64,
    url: String,
    created_at: DateTime<Utc>,
}

impl ImageRow {
    fn into_image(self) -> Image {
        Image {
            id: self.id,
            url: self.url,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn create(&self, image: &Image) -> Result<Image, AppError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "INSERT INTO images (id, url) VALUES ($1, $2) RETURNING id, url, created_at",
        )
        .bind(image.id)
        .bind(&image.url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_image())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Image>, AppError> {
        let row = sqlx::query_as::<_, ImageRow>("SELECT id, url, created_at FROM images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_image()))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Image with id {} not found", id)));
        }

        Ok(())
    }

    async fn link_room(&self, room_id: i64, image_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO room_images (room_id, image_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(image_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("Room or image not found".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(())
    }

    async fn unlink_room(&self, room_id: i64, image_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM room_images WHERE room_id = $1 AND image_id = $2")
            .bind(room_id)
            .bind(image_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Image is not linked to this room".to_string()));
        }

        Ok(())
    }

    async fn list_for_room(&self, room_id: i64) -> Result<Vec<Image>, AppError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT i.id, i.url, i.created_at
            FROM images i
            JOIN room_images ri ON ri.image_id = i.id
            WHERE ri.room_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_image()).collect())
    }

    async fn owning_hotel(&self, image_id: i64) -> Result<Option<i64>, AppError> {
        let hotel_id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT r.hotel_id
            FROM room_images ri
            JOIN rooms r ON r.id = ri.room_id
            WHERE ri.image_id = $1
            ORDER BY r.id
            LIMIT 1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hotel_id)
    }
}
