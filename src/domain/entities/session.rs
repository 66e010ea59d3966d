//! Refresh-token session entity and repository trait.
//!
//! Maps to the `sessions` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A refresh token session.
///
/// Maps to the `sessions` table:
/// - id: UUID PRIMARY KEY
/// - user_id: BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - refresh_token_hash: VARCHAR(64) NOT NULL UNIQUE (SHA-256 hash)
/// - expires_at: TIMESTAMPTZ NOT NULL
/// - created_at, last_used_at: TIMESTAMPTZ
/// - revoked_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,

    /// SHA-256 hash of the refresh token (raw tokens are never stored)
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session with a v7 id.
    pub fn new(user_id: i64, refresh_token_hash: String, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            refresh_token_hash,
            expires_at,
            created_at: now,
            last_used_at: now,
            revoked_at: None,
        }
    }

    /// Not revoked and not expired.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Repository trait for sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session, AppError>;

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AppError>;

    async fn revoke(&self, id: Uuid) -> Result<(), AppError>;

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, AppError>;
}
