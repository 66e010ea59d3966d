//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    LoginRequest, RefreshTokenRequest, RegisterHotelRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::application::services::{
    AuthService, AuthServiceImpl, RegisterDto, RegisterHotelDto, UpdateProfileDto,
};
use crate::infrastructure::repositories::{PgHotelRepository, PgSessionRepository, PgUserRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

type Service = AuthServiceImpl<PgUserRepository, PgSessionRepository, PgHotelRepository>;

pub(crate) fn auth_service(state: &AppState) -> Service {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        state.snowflake.clone(),
        state.settings.jwt.clone(),
    )
}

/// Register a guest account
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_body(&body)?;

    let (user, tokens) = auth_service(&state)
        .register(RegisterDto {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, None, tokens))))
}

/// Register a hotel admin together with their hotel
pub async fn register_hotel(
    State(state): State<AppState>,
    Json(body): Json<RegisterHotelRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate_body(&body)?;

    let (user, hotel, tokens) = auth_service(&state)
        .register_hotel(RegisterHotelDto {
            name: body.name,
            email: body.email,
            password: body.password,
            hotel_name: body.hotel_name,
            location: body.location,
            description: body.description,
            hotel_type: body.hotel_type,
            star_rating: body.star_rating,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, Some(hotel), tokens))))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_body(&body)?;

    let (user, tokens) = auth_service(&state)
        .authenticate(&body.email, &body.password)
        .await?;

    Ok(Json(AuthResponse::new(user, None, tokens)))
}

/// Refresh access token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = auth_service(&state).refresh_token(&body.refresh_token).await?;
    Ok(Json(TokenResponse::from(tokens)))
}

/// Logout (revoke refresh token)
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<StatusCode, AppError> {
    // Unknown or already revoked tokens are not an error for logout
    if let Err(e) = auth_service(&state).revoke_token(&body.refresh_token).await {
        tracing::debug!(error = %e, "Logout with unknown refresh token");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Current user profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service(&state).get_user(auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Update own name and billing data
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate_body(&body)?;

    let user = auth_service(&state)
        .update_profile(
            auth.user_id,
            UpdateProfileDto {
                name: body.name,
                tax_number: body.tax_number,
                bank_account: body.bank_account,
                eu_tax_number: body.eu_tax_number,
            },
        )
        .await?;

    Ok(Json(user.into()))
}
