//! Custom Extractors
//!
//! Axum extractors for authentication and request parsing.

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::shared::error::AppError;

/// Raw bearer token from the `Authorization` header.
///
/// Used by both the JWT and the device token middleware.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Missing authorization header".into()))?;

        let token = bearer.token().trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("Invalid authorization header format".into()));
        }

        Ok(BearerToken(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request};

    async fn extract(header: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let BearerToken(token) = extract(Some("Bearer abc123")).await.unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_basic_scheme_is_rejected() {
        assert!(matches!(
            extract(Some("Basic dXNlcjpwYXNz")).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
