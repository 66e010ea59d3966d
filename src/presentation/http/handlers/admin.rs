//! Super Admin Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AdminBookingQuery, AdminUpdateUserRequest, KeyListQuery, UserListQuery,
};
use crate::application::dto::response::{
    BookingResponse, HotelResponse, KeyViewResponse, UserResponse,
};
use crate::application::services::{
    AdminService, AdminServiceImpl, AdminUpdateUserDto, RfidService, UserQuery,
};
use crate::domain::PlatformStats;
use crate::infrastructure::repositories::{
    PgBookingRepository, PgCatalogRepository, PgHotelRepository, PgSessionRepository,
    PgUserRepository,
};
use crate::presentation::http::handlers::rfid::{key_query, rfid_service};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

type Service = AdminServiceImpl<
    PgCatalogRepository,
    PgUserRepository,
    PgHotelRepository,
    PgBookingRepository,
    PgSessionRepository,
>;

fn admin_service(state: &AppState) -> Service {
    AdminServiceImpl::new(
        Arc::new(PgCatalogRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        state.notifier.clone(),
        state.catalog_cache.clone(),
    )
}

/// Platform-wide counters
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<PlatformStats>, AppError> {
    Ok(Json(admin_service(&state).stats(auth.actor()).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let query = UserQuery {
        role: query.role,
        limit: query.limit,
        offset: query.offset,
    };
    let users = admin_service(&state).list_users(auth.actor(), query).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_id(&user_id, "user ID")?;
    let user = admin_service(&state).get_user(auth.actor(), user_id).await?;
    Ok(Json(user.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_body(&body)?;
    let user_id = parse_id(&user_id, "user ID")?;
    let update = AdminUpdateUserDto {
        name: body.name,
        role: body.role,
    };
    let user = admin_service(&state)
        .update_user(auth.actor(), user_id, update)
        .await?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_id(&user_id, "user ID")?;
    admin_service(&state).delete_user(auth.actor(), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_hotels(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<HotelResponse>>, AppError> {
    let hotels = admin_service(&state).list_hotels(auth.actor()).await?;
    Ok(Json(hotels.into_iter().map(Into::into).collect()))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<AdminBookingQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = admin_service(&state)
        .list_bookings(auth.actor(), query.status)
        .await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

/// Keys of every hotel, or of one with `hotel_id`
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<KeyListQuery>,
) -> Result<Json<Vec<KeyViewResponse>>, AppError> {
    let actor = auth.actor();
    if !actor.is_super_admin() {
        return Err(AppError::Forbidden("Super admin access required".into()));
    }
    let keys = rfid_service(&state).list_keys(actor, key_query(query)?).await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}
