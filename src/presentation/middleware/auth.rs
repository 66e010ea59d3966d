//! Authentication Middleware
//!
//! JWT validation for user routes and token validation for hotel terminals.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::application::services::{decode_claims, DeviceService};
use crate::domain::{Actor, UserRole};
use crate::presentation::http::extractors::BearerToken;
use crate::presentation::http::handlers::device::device_service;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = decode_claims(&state.settings.jwt.secret, &token)?;
    let user_id = claims.user_id()?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Resolves the terminal behind a device token and stores it as a request
/// extension for the device handlers.
pub async fn device_auth_middleware(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let device = device_service(&state).authenticate(&token).await?;
    tracing::debug!(device_id = device.id, hotel_id = device.hotel_id, "Device authenticated");
    request.extensions_mut().insert(device);

    Ok(next.run(request).await)
}
