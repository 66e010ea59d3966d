//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the database schema and domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::holding_statuses;
use crate::domain::{User, UserRemoval, UserRepository, UserRole};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::{map_constraint_violation, AppError};

pub(super) const USER_COLUMNS: &str = "id, name, email, password_hash, role, tax_number, \
     bank_account, eu_tax_number, created_at, updated_at";

/// Database row representation matching the users table schema.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    tax_number: Option<String>,
    bank_account: Option<String>,
    eu_tax_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    pub(super) fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            // The CHECK constraint keeps this in range; guest is the least privileged fallback
            role: UserRole::from_str(&self.role).unwrap_or(UserRole::Guest),
            tax_number: self.tax_number,
            bank_account: self.bank_account,
            eu_tax_number: self.eu_tax_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, tax_number, bank_account, eu_tax_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.tax_number)
        .bind(&user.bank_account)
        .bind(&user.eu_tax_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "User with this email already exists"))?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = $2,
                role = $3,
                tax_number = $4,
                bank_account = $5,
                eu_tax_number = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.tax_number)
        .bind(&user.bank_account)
        .bind(&user.eu_tax_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;

        Ok(row.into_user())
    }

    async fn delete(&self, id: i64) -> Result<UserRemoval, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(ctx.conn())
                .await?;
            if locked.is_none() {
                return Err(AppError::NotFound(format!("User with id {} not found", id)));
            }

            // The owned hotel goes with the user, so it must be idle first
            let busy = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM bookings b
                    JOIN hotels h ON h.id = b.hotel_id
                    WHERE h.owner_id = $1 AND b.status = ANY($2) AND b.end_date > CURRENT_DATE
                )
                "#,
            )
            .bind(id)
            .bind(holding_statuses())
            .fetch_one(ctx.conn())
            .await?;
            if busy {
                return Err(AppError::Conflict(
                    "User's hotel has active or upcoming bookings".to_string(),
                ));
            }

            // Cascading the bookings would only null out booking_id and leave keys held
            let released = sqlx::query(
                r#"
                UPDATE rfid_assignments SET released_at = NOW()
                WHERE released_at IS NULL
                  AND booking_id IN (SELECT id FROM bookings WHERE user_id = $1)
                "#,
            )
            .bind(id)
            .execute(ctx.conn())
            .await?;

            let affected_hotels = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT DISTINCT b.hotel_id FROM bookings b
                JOIN hotels h ON h.id = b.hotel_id
                WHERE b.user_id = $1 AND h.owner_id <> $1
                ORDER BY b.hotel_id
                "#,
            )
            .bind(id)
            .fetch_all(ctx.conn())
            .await?;

            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(ctx.conn())
                .await?;

            Ok((
                UserRemoval {
                    released_assignments: released.rows_affected(),
                    affected_hotels,
                },
                ctx,
            ))
        })
        .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list(
        &self,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::TEXT IS NULL OR role = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(role.map(|r| r.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_user()).collect())
    }
}
