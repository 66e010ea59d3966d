//! Service tag repository and the hotel/room tag links.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{ServiceTag, TagRepository, TagUsage};
use crate::shared::error::{map_constraint_violation, AppError};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TagRow {
    id: i64,
    name: String,
}

impl TagRow {
    pub(super) fn into_tag(self) -> ServiceTag {
        ServiceTag {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TagUsageRow {
    id: i64,
    name: String,
    hotel_count: i64,
    room_count: i64,
}

#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn missing_link(err: sqlx::Error) -> AppError {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("Tag not found".to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self) -> Result<Vec<ServiceTag>, AppError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name FROM service_tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into_tag()).collect())
    }

    async fn usage(&self) -> Result<Vec<TagUsage>, AppError> {
        let rows = sqlx::query_as::<_, TagUsageRow>(
            r#"
            SELECT t.id, t.name,
                   (SELECT COUNT(*) FROM hotel_tags ht WHERE ht.tag_id = t.id) AS hotel_count,
                   (SELECT COUNT(*) FROM room_tags rt WHERE rt.tag_id = t.id) AS room_count
            FROM service_tags t
            ORDER BY t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TagUsage {
                tag: ServiceTag {
                    id: r.id,
                    name: r.name,
                },
                hotel_count: r.hotel_count,
                room_count: r.room_count,
            })
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ServiceTag>, AppError> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, name FROM service_tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_tag()))
    }

    async fn create(&self, tag: &ServiceTag) -> Result<ServiceTag, AppError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO service_tags (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(tag.id)
        .bind(&tag.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "Tag with this name already exists"))?;

        Ok(row.into_tag())
    }

    async fn update(&self, tag: &ServiceTag) -> Result<ServiceTag, AppError> {
        let row = sqlx::query_as::<_, TagRow>(
            "UPDATE service_tags SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(tag.id)
        .bind(&tag.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "Tag with this name already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("Tag with id {} not found", tag.id)))?;

        Ok(row.into_tag())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM service_tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tag with id {} not found", id)));
        }

        Ok(())
    }

    async fn attach_to_hotel(&self, hotel_id: i64, tag_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO hotel_tags (hotel_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(hotel_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(Self::missing_link)?;

        Ok(())
    }

    async fn detach_from_hotel(&self, hotel_id: i64, tag_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM hotel_tags WHERE hotel_id = $1 AND tag_id = $2")
            .bind(hotel_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tag is not attached to this hotel".to_string()));
        }

        Ok(())
    }

    async fn attach_to_room(&self, room_id: i64, tag_id: i64) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO room_tags (room_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(Self::missing_link)?;

        Ok(())
    }

    async fn detach_from_room(&self, room_id: i64, tag_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM room_tags WHERE room_id = $1 AND tag_id = $2")
            .bind(room_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tag is not attached to this room".to_string()));
        }

        Ok(())
    }

    async fn list_for_hotel(&self, hotel_id: i64) -> Result<Vec<ServiceTag>, AppError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name
            FROM service_tags t
            JOIN hotel_tags ht ON ht.tag_id = t.id
            WHERE ht.hotel_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_tag()).collect())
    }

    async fn list_for_room(&self, room_id: i64) -> Result<Vec<ServiceTag>, AppError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.name
            FROM service_tags t
            JOIN room_tags rt ON rt.tag_id = t.id
            WHERE rt.room_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_tag()).collect())
    }
}
