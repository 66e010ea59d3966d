//! Booking Repository Implementation
//!
//! Room reservation and status changes run in one transaction each. The
//! booked rooms (or the booking itself) are locked first, then the
//! reservation rules are checked against what the lock protects.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use super::holding_statuses;
use super::room_repository::{RoomRow, ROOM_COLUMNS};
use super::service_item_repository::{ServiceRow, SERVICE_COLUMNS};
use crate::domain::services::reservation;
use crate::domain::{
    Booking, BookingFilter, BookingRepository, BookingRoomLink, BookingStatus, CheckInStatus,
    CustomerType, Guest, InvoiceDetail, NewBooking, Room, RoomOccupancy, ServiceItem, StatusChange,
    StatusChangeOutcome,
};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::{map_constraint_violation, AppError};

pub(super) const BOOKING_COLUMNS: &str = "id, user_id, hotel_id, start_date, end_date, total_price, \
     status, check_in_token, check_in_status, check_in_time, check_out_time, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct BookingRow {
    id: i64,
    user_id: i64,
    hotel_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price: i64,
    status: String,
    check_in_token: Option<String>,
    check_in_status: Option<String>,
    check_in_time: Option<DateTime<Utc>>,
    check_out_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    pub(super) fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            hotel_id: self.hotel_id,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            status: BookingStatus::from_str(&self.status).unwrap_or_default(),
            check_in_token: self.check_in_token,
            check_in_status: self.check_in_status.as_deref().and_then(CheckInStatus::from_str),
            check_in_time: self.check_in_time,
            check_out_time: self.check_out_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OccupancyRow {
    room_id: i64,
    booking_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RoomLinkRow {
    booking_id: i64,
    #[sqlx(flatten)]
    room: RoomRow,
}

#[derive(Debug, sqlx::FromRow)]
struct GuestRow {
    id: i64,
    booking_id: i64,
    name: String,
    id_number: String,
    date_of_birth: Option<NaiveDate>,
}

impl GuestRow {
    fn into_guest(self) -> Guest {
        Guest {
            id: self.id,
            booking_id: self.booking_id,
            name: self.name,
            id_number: self.id_number,
            date_of_birth: self.date_of_birth,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceDetailRow {
    booking_id: i64,
    customer_type: String,
    full_name: String,
    email: String,
    company_name: Option<String>,
    tax_number: Option<String>,
    country: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    address_line: Option<String>,
    note: Option<String>,
}

impl InvoiceDetailRow {
    fn into_detail(self) -> InvoiceDetail {
        InvoiceDetail {
            booking_id: self.booking_id,
            customer_type: CustomerType::from_str(&self.customer_type),
            full_name: self.full_name,
            email: self.email,
            company_name: self.company_name,
            tax_number: self.tax_number,
            country: self.country,
            city: self.city,
            postal_code: self.postal_code,
            address_line: self.address_line,
            note: self.note,
        }
    }
}

async fn lock_booking(conn: &mut PgConnection, id: i64) -> Result<Booking, AppError> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .map(|r| r.into_booking())
    .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", id)))
}

async fn release_booking_keys(conn: &mut PgConnection, booking_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE rfid_assignments SET released_at = NOW() WHERE booking_id = $1 AND released_at IS NULL",
    )
    .bind(booking_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_guest(conn: &mut PgConnection, booking_id: i64, guest: &Guest) -> Result<Guest, AppError> {
    let row = sqlx::query_as::<_, GuestRow>(
        r#"
        INSERT INTO guests (id, booking_id, name, id_number, date_of_birth)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, booking_id, name, id_number, date_of_birth
        "#,
    )
    .bind(guest.id)
    .bind(booking_id)
    .bind(&guest.name)
    .bind(&guest.id_number)
    .bind(guest.date_of_birth)
    .fetch_one(conn)
    .await?;

    Ok(row.into_guest())
}

/// PostgreSQL booking repository implementation.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn reserve(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        let mut room_ids = booking.room_ids.clone();
        room_ids.sort_unstable();
        room_ids.dedup();

        with_transaction(&self.pool, |mut ctx| async move {
            // Ascending id order keeps concurrent reservations from deadlocking.
            let locked = sqlx::query_as::<_, (i64, i64)>(
                "SELECT id, hotel_id FROM rooms WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            )
            .bind(&room_ids)
            .fetch_all(ctx.conn())
            .await?;

            if locked.len() != room_ids.len() {
                return Err(AppError::BadRequest("Unknown room in booking".to_string()));
            }
            if locked.iter().any(|(_, hotel_id)| *hotel_id != booking.hotel_id) {
                return Err(AppError::BadRequest(
                    "All rooms must belong to the same hotel".to_string(),
                ));
            }

            let occupancies: Vec<RoomOccupancy> = sqlx::query_as::<_, OccupancyRow>(
                r#"
                SELECT br.room_id, b.id AS booking_id, b.start_date, b.end_date, b.status
                FROM booking_rooms br
                JOIN bookings b ON b.id = br.booking_id
                WHERE br.room_id = ANY($1)
                  AND b.status = ANY($2)
                  AND b.start_date < $4
                  AND b.end_date > $3
                "#,
            )
            .bind(&room_ids)
            .bind(holding_statuses())
            .bind(booking.period.start())
            .bind(booking.period.end())
            .fetch_all(ctx.conn())
            .await?
            .into_iter()
            .filter_map(|r| {
                Some(RoomOccupancy {
                    room_id: r.room_id,
                    booking_id: r.booking_id,
                    start_date: r.start_date,
                    end_date: r.end_date,
                    status: BookingStatus::from_str(&r.status)?,
                })
            })
            .collect();

            reservation::ensure_rooms_free(&room_ids, &booking.period, &occupancies)
                .map_err(AppError::from)?;

            let created = sqlx::query_as::<_, BookingRow>(&format!(
                r#"
                INSERT INTO bookings (id, user_id, hotel_id, start_date, end_date, total_price, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {BOOKING_COLUMNS}
                "#
            ))
            .bind(booking.id)
            .bind(booking.user_id)
            .bind(booking.hotel_id)
            .bind(booking.period.start())
            .bind(booking.period.end())
            .bind(booking.total_price)
            .bind(BookingStatus::Pending.as_str())
            .fetch_one(ctx.conn())
            .await?;

            sqlx::query(
                "INSERT INTO booking_rooms (booking_id, room_id) SELECT $1, UNNEST($2::BIGINT[])",
            )
            .bind(booking.id)
            .bind(&room_ids)
            .execute(ctx.conn())
            .await?;

            if !booking.service_ids.is_empty() {
                sqlx::query(
                    r#"
                    INSERT INTO booking_services (booking_id, service_id)
                    SELECT $1, s.id FROM services s WHERE s.id = ANY($2) AND s.hotel_id = $3
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(booking.id)
                .bind(&booking.service_ids)
                .bind(booking.hotel_id)
                .execute(ctx.conn())
                .await?;
            }

            for guest in &booking.guests {
                insert_guest(ctx.conn(), booking.id, guest).await?;
            }

            if let Some(detail) = &booking.invoice_detail {
                sqlx::query(
                    r#"
                    INSERT INTO booking_invoice_details
                        (booking_id, customer_type, full_name, email, company_name, tax_number,
                         country, city, postal_code, address_line, note)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(booking.id)
                .bind(detail.customer_type.as_str())
                .bind(&detail.full_name)
                .bind(&detail.email)
                .bind(&detail.company_name)
                .bind(&detail.tax_number)
                .bind(&detail.country)
                .bind(&detail.city)
                .bind(&detail.postal_code)
                .bind(&detail.address_line)
                .bind(&detail.note)
                .execute(ctx.conn())
                .await?;
            }

            Ok((created.into_booking(), ctx))
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_booking()))
    }

    async fn find_by_check_in_token(&self, token: &str) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE check_in_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_booking()))
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::BIGINT IS NULL OR hotel_id = $2)
              AND (CARDINALITY($3::TEXT[]) = 0 OR status = ANY($3))
            ORDER BY start_date DESC, id DESC
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.hotel_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_booking()).collect())
    }

    async fn rooms_of(&self, booking_id: i64) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            r#"
            SELECT {ROOM_COLUMNS}
            FROM rooms r
            JOIN booking_rooms br ON br.room_id = r.id
            WHERE br.booking_id = $1
            ORDER BY r.id
            "#
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn room_links(&self, booking_ids: &[i64]) -> Result<Vec<BookingRoomLink>, AppError> {
        let rows = sqlx::query_as::<_, RoomLinkRow>(&format!(
            r#"
            SELECT br.booking_id, {ROOM_COLUMNS}
            FROM booking_rooms br
            JOIN rooms r ON r.id = br.room_id
            WHERE br.booking_id = ANY($1)
            ORDER BY br.booking_id, r.id
            "#
        ))
        .bind(booking_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BookingRoomLink {
                booking_id: r.booking_id,
                room: r.room.into_room(),
            })
            .collect())
    }

    async fn services_of(&self, booking_id: i64) -> Result<Vec<ServiceItem>, AppError> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            r#"
            SELECT {SERVICE_COLUMNS}
            FROM services s
            JOIN booking_services bs ON bs.service_id = s.id
            WHERE bs.booking_id = $1
            ORDER BY s.id
            "#
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_service()).collect())
    }

    async fn transition(&self, change: &StatusChange) -> Result<StatusChangeOutcome, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let current = lock_booking(ctx.conn(), change.booking_id).await?;
            if current.status != change.from {
                return Err(AppError::Conflict(format!(
                    "Booking is now {}, expected {}",
                    current.status, change.from
                )));
            }
            reservation::ensure_transition(current.status, change.to).map_err(AppError::from)?;

            let updated = sqlx::query_as::<_, BookingRow>(&format!(
                r#"
                UPDATE bookings
                SET status = $2,
                    check_in_token = COALESCE($3, check_in_token),
                    check_in_status = COALESCE($4, check_in_status),
                    check_in_time = COALESCE($5, check_in_time),
                    check_out_time = COALESCE($6, check_out_time),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {BOOKING_COLUMNS}
                "#
            ))
            .bind(change.booking_id)
            .bind(change.to.as_str())
            .bind(&change.check_in_token)
            .bind(change.check_in_status.map(|s| s.as_str()))
            .bind(change.check_in_time)
            .bind(change.check_out_time)
            .fetch_one(ctx.conn())
            .await
            .map_err(|e| map_constraint_violation(e, "Check-in token collision"))?;

            let released_assignments = if change.to.releases_keys() {
                release_booking_keys(ctx.conn(), change.booking_id).await?
            } else {
                0
            };

            Ok((
                StatusChangeOutcome {
                    booking: updated.into_booking(),
                    released_assignments,
                },
                ctx,
            ))
        })
        .await
    }

    async fn record_check_in(
        &self,
        booking_id: i64,
        check_in_status: Option<CheckInStatus>,
        check_in_time: Option<DateTime<Utc>>,
        check_out_time: Option<DateTime<Utc>>,
    ) -> Result<Booking, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET check_in_status = COALESCE($2, check_in_status),
                check_in_time = COALESCE($3, check_in_time),
                check_out_time = COALESCE($4, check_out_time),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(check_in_status.map(|s| s.as_str()))
        .bind(check_in_time)
        .bind(check_out_time)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking with id {} not found", booking_id)))?;

        Ok(row.into_booking())
    }

    async fn delete(&self, id: i64) -> Result<StatusChangeOutcome, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            let booking = lock_booking(ctx.conn(), id).await?;
            let released_assignments = release_booking_keys(ctx.conn(), id).await?;

            sqlx::query("DELETE FROM bookings WHERE id = $1")
                .bind(id)
                .execute(ctx.conn())
                .await?;

            Ok((
                StatusChangeOutcome {
                    booking,
                    released_assignments,
                },
                ctx,
            ))
        })
        .await
    }

    async fn list_guests(&self, booking_id: i64) -> Result<Vec<Guest>, AppError> {
        let rows = sqlx::query_as::<_, GuestRow>(
            r#"
            SELECT id, booking_id, name, id_number, date_of_birth
            FROM guests
            WHERE booking_id = $1
            ORDER BY id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_guest()).collect())
    }

    async fn add_guests(
        &self,
        booking_id: i64,
        guests: &[Guest],
        max_guests: i64,
    ) -> Result<Vec<Guest>, AppError> {
        with_transaction(&self.pool, |mut ctx| async move {
            lock_booking(ctx.conn(), booking_id).await?;

            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM guests WHERE booking_id = $1",
            )
            .bind(booking_id)
            .fetch_one(ctx.conn())
            .await?;

            if existing + guests.len() as i64 > max_guests {
                return Err(AppError::BadRequest(format!(
                    "Booking allows at most {} guests, {} already registered",
                    max_guests, existing
                )));
            }

            let mut created = Vec::with_capacity(guests.len());
            for guest in guests {
                created.push(insert_guest(ctx.conn(), booking_id, guest).await?);
            }

            Ok((created, ctx))
        })
        .await
    }

    async fn find_guest(&self, id: i64) -> Result<Option<Guest>, AppError> {
        let row = sqlx::query_as::<_, GuestRow>(
            "SELECT id, booking_id, name, id_number, date_of_birth FROM guests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_guest()))
    }

    async fn update_guest(&self, guest: &Guest) -> Result<Guest, AppError> {
        let row = sqlx::query_as::<_, GuestRow>(
            r#"
            UPDATE guests
            SET name = $2, id_number = $3, date_of_birth = $4
            WHERE id = $1
            RETURNING id, booking_id, name, id_number, date_of_birth
            "#,
        )
        .bind(guest.id)
        .bind(&guest.name)
        .bind(&guest.id_number)
        .bind(guest.date_of_birth)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Guest with id {} not found", guest.id)))?;

        Ok(row.into_guest())
    }

    async fn delete_guest(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Guest with id {} not found", id)));
        }

        Ok(())
    }

    async fn invoice_detail(&self, booking_id: i64) -> Result<Option<InvoiceDetail>, AppError> {
        let row = sqlx::query_as::<_, InvoiceDetailRow>(
            r#"
            SELECT booking_id, customer_type, full_name, email, company_name, tax_number,
                   country, city, postal_code, address_line, note
            FROM booking_invoice_details
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_detail()))
    }
}
