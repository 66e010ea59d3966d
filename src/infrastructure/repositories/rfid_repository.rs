//! RFID key and key assignment repository.
//!
//! Assignments are written with the key row locked `FOR UPDATE`, so two
//! requests for the same key are checked one after the other. The exclusion
//! constraint on `rfid_assignments` backs the same rule in storage.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::services::reservation::{self, ReservationError};
use crate::domain::{
    BookingStatus, CalendarEntry, KeyFilter, NewAssignment, RfidAssignment, RfidKey,
    RfidKeyStatus, RfidRepository,
};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::{map_constraint_violation, AppError};

const KEY_COLUMNS: &str = "id, hotel_id, uid, label, status, created_at, updated_at";

const ASSIGNMENT_COLUMNS: &str = "a.id, a.reservation_id, a.rfid_key_id, a.booking_id, a.room_id, \
     a.reserved_from, a.reserved_to, a.assigned_at, a.released_at";

const OVERLAP_MESSAGE: &str = "Key is already reserved for an overlapping period";

#[derive(Debug, sqlx::FromRow)]
struct KeyRow {
    id: i64,
    hotel_id: i64,
    uid: String,
    label: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl KeyRow {
    fn into_key(self) -> RfidKey {
        RfidKey {
            id: self.id,
            hotel_id: self.hotel_id,
            uid: self.uid,
            label: self.label,
            // Unknown values are treated as unusable
            status: RfidKeyStatus::from_str(&self.status).unwrap_or(RfidKeyStatus::Disabled),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: i64,
    reservation_id: i64,
    rfid_key_id: i64,
    booking_id: Option<i64>,
    room_id: i64,
    reserved_from: NaiveDate,
    reserved_to: Option<NaiveDate>,
    assigned_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    fn into_assignment(self) -> RfidAssignment {
        RfidAssignment {
            id: self.id,
            reservation_id: self.reservation_id,
            rfid_key_id: self.rfid_key_id,
            booking_id: self.booking_id,
            room_id: self.room_id,
            reserved_from: self.reserved_from,
            reserved_to: self.reserved_to,
            assigned_at: self.assigned_at,
            released_at: self.released_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CalendarRow {
    #[sqlx(flatten)]
    assignment: AssignmentRow,
    key_uid: String,
    key_label: Option<String>,
    room_name: String,
    guest_name: Option<String>,
}

async fn lock_key(conn: &mut PgConnection, id: i64) -> Result<RfidKey, AppError> {
    sqlx::query_as::<_, KeyRow>(&format!(
        "SELECT {KEY_COLUMNS} FROM rfid_keys WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .map(|r| r.into_key())
    .ok_or_else(|| AppError::NotFound(format!("RFID key with id {} not found", id)))
}

async fn unreleased_of(conn: &mut PgConnection, key_id: i64) -> Result<Vec<RfidAssignment>, AppError> {
    let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM rfid_assignments a \
         WHERE a.rfid_key_id = $1 AND a.released_at IS NULL"
    ))
    .bind(key_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|r| r.into_assignment()).collect())
}

/// PostgreSQL RFID repository implementation.
#[derive(Clone)]
pub struct PgRfidRepository {
    pool: PgPool,
}

impl PgRfidRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RfidRepository for PgRfidRepository {
    async fn list_keys(&self, filter: &KeyFilter) -> Result<Vec<RfidKey>, AppError> {
        let rows = sqlx::query_as::<_, KeyRow>(&format!(
            r#"
            SELECT {KEY_COLUMNS}
            FROM rfid_keys
            WHERE ($1::BIGINT IS NULL OR hotel_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR uid ILIKE '%' || $3 || '%' OR label ILIKE '%' || $3 || '%')
            ORDER BY uid
            "#
        ))
        .bind(filter.hotel_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(&filter.search)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_key()).collect())
    }

    async fn find_key(&self, id: i64) -> Result<Option<RfidKey>, AppError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM rfid_keys WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_key()))
    }

    async fn find_key_by_uid(&self, uid: &str) -> Result<Option<RfidKey>, AppError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {KEY_COLUMNS} FROM rfid_keys WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_key()))
    }

    async fn create_key(&self, key: &RfidKey) -> Result<RfidKey, AppError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            r#"
            INSERT INTO rfid_keys (id, hotel_id, uid, label, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {KEY_COLUMNS}
            "#
        ))
        .bind(key.id)
        .bind(key.hotel_id)
        .bind(&key.uid)
        .bind(&key.label)
        .bind(key.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "A key with this UID already exists"))?;

        Ok(row.into_key())
    }

    async fn update_key(&self, key: &RfidKey) -> Result<RfidKey, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let current = lock_key(ctx.conn(), key.id).await?;
            if key.status != current.status {
                let open = unreleased_of(ctx.conn(), key.id).await?;
                reservation::ensure_status_change_allowed(key.status, &open)
                    .map_err(AppError::from)?;
            }

            let row = sqlx::query_as::<_, KeyRow>(&format!(
                r#"
                UPDATE rfid_keys
                SET uid = $2, label = $3, status = $4, updated_at = NOW()
                WHERE id = $1
                RETURNING {KEY_COLUMNS}
                "#
            ))
            .bind(key.id)
            .bind(&key.uid)
            .bind(&key.label)
            .bind(key.status.as_str())
            .fetch_one(ctx.conn())
            .await
            .map_err(|e| map_constraint_violation(e, "A key with this UID already exists"))?;

            Ok((row.into_key(), ctx))
        })
        .await
    }

    async fn delete_key(&self, id: i64) -> Result<(), AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            lock_key(ctx.conn(), id).await?;
            let open = unreleased_of(ctx.conn(), id).await?;
            reservation::ensure_deletable(&open).map_err(AppError::from)?;

            sqlx::query("DELETE FROM rfid_keys WHERE id = $1")
                .bind(id)
                .execute(ctx.conn())
                .await?;

            Ok(((), ctx))
        })
        .await
    }

    async fn assign(
        &self,
        key_id: i64,
        assignments: &[NewAssignment],
    ) -> Result<Vec<RfidAssignment>, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let key = lock_key(ctx.conn(), key_id).await?;

            let mut room_ids: Vec<i64> = assignments.iter().map(|a| a.room_id).collect();
            room_ids.sort_unstable();
            room_ids.dedup();
            let own_rooms = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM rooms WHERE id = ANY($1) AND hotel_id = $2",
            )
            .bind(&room_ids)
            .bind(key.hotel_id)
            .fetch_one(ctx.conn())
            .await?;
            if own_rooms != room_ids.len() as i64 {
                return Err(AppError::BadRequest(
                    "Rooms must belong to the key's hotel".to_string(),
                ));
            }

            // A booking cancelled meanwhile must not receive a key.
            let mut booking_ids: Vec<i64> = assignments.iter().filter_map(|a| a.booking_id).collect();
            booking_ids.sort_unstable();
            booking_ids.dedup();
            for booking_id in booking_ids {
                let status = sqlx::query_scalar::<_, String>(
                    "SELECT status FROM bookings WHERE id = $1 FOR SHARE",
                )
                .bind(booking_id)
                .fetch_optional(ctx.conn())
                .await?
                .and_then(|s| BookingStatus::from_str(&s))
                .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))?;
                if !status.accepts_keys() {
                    return Err(AppError::from(ReservationError::BookingNotEligible(status)));
                }
            }

            let existing = unreleased_of(ctx.conn(), key_id).await?;
            reservation::check_key_reservation(&key, assignments, &existing).map_err(AppError::from)?;

            let mut created = Vec::with_capacity(assignments.len());
            for assignment in assignments {
                let row = sqlx::query_as::<_, AssignmentRow>(
                    r#"
                    INSERT INTO rfid_assignments AS a
                        (id, reservation_id, rfid_key_id, booking_id, room_id, reserved_from, reserved_to)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING a.id, a.reservation_id, a.rfid_key_id, a.booking_id, a.room_id,
                              a.reserved_from, a.reserved_to, a.assigned_at, a.released_at
                    "#,
                )
                .bind(assignment.id)
                .bind(assignment.reservation_id)
                .bind(key_id)
                .bind(assignment.booking_id)
                .bind(assignment.room_id)
                .bind(assignment.window.from)
                .bind(assignment.window.to)
                .fetch_one(ctx.conn())
                .await
                .map_err(|e| map_constraint_violation(e, OVERLAP_MESSAGE))?;
                created.push(row.into_assignment());
            }

            Ok((created, ctx))
        })
        .await
    }

    async fn release(
        &self,
        key_id: i64,
        assignment_id: Option<i64>,
    ) -> Result<Vec<RfidAssignment>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            UPDATE rfid_assignments AS a
            SET released_at = NOW()
            WHERE a.rfid_key_id = $1
              AND a.released_at IS NULL
              AND ($2::BIGINT IS NULL OR a.id = $2)
            RETURNING a.id, a.reservation_id, a.rfid_key_id, a.booking_id, a.room_id,
                      a.reserved_from, a.reserved_to, a.assigned_at, a.released_at
            "#,
        )
        .bind(key_id)
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(AppError::BadRequest(
                "Key has no unreleased assignment to release".to_string(),
            ));
        }

        Ok(rows.into_iter().map(|r| r.into_assignment()).collect())
    }

    async fn assignments_for_key(
        &self,
        key_id: i64,
        include_released: bool,
    ) -> Result<Vec<RfidAssignment>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM rfid_assignments a
            WHERE a.rfid_key_id = $1 AND ($2 OR a.released_at IS NULL)
            ORDER BY a.reserved_from, a.id
            "#
        ))
        .bind(key_id)
        .bind(include_released)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_assignment()).collect())
    }

    async fn unreleased_for_hotel(&self, hotel_id: i64) -> Result<Vec<RfidAssignment>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM rfid_assignments a
            JOIN rfid_keys k ON k.id = a.rfid_key_id
            WHERE k.hotel_id = $1 AND a.released_at IS NULL
            ORDER BY a.reserved_from, a.id
            "#
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_assignment()).collect())
    }

    async fn calendar(
        &self,
        hotel_id: i64,
        from: NaiveDate,
        to: NaiveDate,
        key_id: Option<i64>,
    ) -> Result<Vec<CalendarEntry>, AppError> {
        let rows = sqlx::query_as::<_, CalendarRow>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS},
                   k.uid AS key_uid,
                   k.label AS key_label,
                   r.name AS room_name,
                   COALESCE(d.full_name, u.name) AS guest_name
            FROM rfid_assignments a
            JOIN rfid_keys k ON k.id = a.rfid_key_id
            JOIN rooms r ON r.id = a.room_id
            LEFT JOIN bookings b ON b.id = a.booking_id
            LEFT JOIN booking_invoice_details d ON d.booking_id = b.id
            LEFT JOIN users u ON u.id = b.user_id
            WHERE k.hotel_id = $1
              AND ($4::BIGINT IS NULL OR k.id = $4)
              AND a.reserved_from < $3
              AND (a.reserved_to IS NULL OR a.reserved_to > $2)
            ORDER BY a.reserved_from, k.uid, a.id
            "#
        ))
        .bind(hotel_id)
        .bind(from)
        .bind(to)
        .bind(key_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CalendarEntry {
                assignment: r.assignment.into_assignment(),
                key_uid: r.key_uid,
                key_label: r.key_label,
                room_name: r.room_name,
                guest_name: r.guest_name,
            })
            .collect())
    }
}
