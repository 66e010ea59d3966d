//! Authentication Service
//!
//! Handles registration, login, JWT issuing and refresh-token sessions.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::JwtSettings;
use crate::domain::{
    Hotel, HotelRepository, HotelType, Session, SessionRepository, User, UserRepository, UserRole,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::tokens::sha256_hex;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a guest account
    async fn register(&self, request: RegisterDto) -> Result<(User, AuthTokens), AuthError>;

    /// Register a hotel admin together with their hotel
    async fn register_hotel(
        &self,
        request: RegisterHotelDto,
    ) -> Result<(User, Hotel, AuthTokens), AuthError>;

    /// Authenticate user with credentials
    async fn authenticate(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError>;

    /// Exchange a refresh token for a new token pair; the old one is revoked
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;

    /// Revoke refresh token (logout)
    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError>;

    async fn get_user(&self, user_id: i64) -> Result<User, AuthError>;

    async fn update_profile(&self, user_id: i64, update: UpdateProfileDto) -> Result<User, AuthError>;

    /// Create the configured super admin unless the email is already taken
    async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<User>, AuthError>;
}

/// Authentication tokens response
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at issue time
    pub role: UserRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Decode and validate an access token.
pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[derive(Debug, Clone)]
pub struct RegisterDto {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RegisterHotelDto {
    pub name: String,
    pub email: String,
    pub password: String,
    pub hotel_name: String,
    pub location: String,
    pub description: Option<String>,
    pub hotel_type: HotelType,
    pub star_rating: Option<i16>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileDto {
    pub name: Option<String>,
    pub tax_number: Option<String>,
    pub bank_account: Option<String>,
    pub eu_tax_number: Option<String>,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailExists,

    #[error("Session not found or expired")]
    SessionNotFound,

    #[error(transparent)]
    Repository(#[from] AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid token".into()),
            AuthError::SessionNotFound => {
                AppError::Unauthorized("Session not found or expired".into())
            }
            AuthError::UserNotFound => AppError::NotFound("User not found".into()),
            AuthError::EmailExists => AppError::Conflict("Email already exists".into()),
            AuthError::Repository(e) => e,
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// AuthService implementation
pub struct AuthServiceImpl<U, S, H>
where
    U: UserRepository,
    S: SessionRepository,
    H: HotelRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    hotel_repo: Arc<H>,
    id_generator: Arc<SnowflakeGenerator>,
    jwt_settings: JwtSettings,
}

impl<U, S, H> AuthServiceImpl<U, S, H>
where
    U: UserRepository,
    S: SessionRepository,
    H: HotelRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        session_repo: Arc<S>,
        hotel_repo: Arc<H>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            hotel_repo,
            id_generator,
            jwt_settings,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn generate_tokens(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let now = Utc::now();
        let access_expiry = now + Duration::minutes(self.jwt_settings.access_token_expiry_minutes);

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: access_expiry.timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))?;

        // Opaque refresh token, only its hash is stored
        let refresh_token = format!("{}.{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt_settings.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }

    /// Issue tokens and persist the refresh session.
    async fn start_session(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let tokens = self.generate_tokens(user)?;
        let session = Session::new(
            user.id,
            sha256_hex(&tokens.refresh_token),
            Utc::now() + Duration::days(self.jwt_settings.refresh_token_expiry_days),
        );
        self.session_repo.create(&session).await?;
        Ok(tokens)
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), AuthError> {
        if self.user_repo.email_exists(email).await? {
            return Err(AuthError::EmailExists);
        }
        Ok(())
    }

    fn new_user(&self, name: &str, email: &str, password: &str, role: UserRole) -> Result<User, AuthError> {
        let now = Utc::now();
        Ok(User {
            id: self.id_generator.generate(),
            name: name.trim().to_string(),
            email: email.to_string(),
            password_hash: self.hash_password(password)?,
            role,
            created_at: now,
            updated_at: now,
            ..User::default()
        })
    }
}

#[async_trait]
impl<U, S, H> AuthService for AuthServiceImpl<U, S, H>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
    H: HotelRepository + 'static,
{
    async fn register(&self, request: RegisterDto) -> Result<(User, AuthTokens), AuthError> {
        let email = normalize_email(&request.email);
        self.ensure_email_free(&email).await?;

        let user = self.new_user(&request.name, &email, &request.password, UserRole::Guest)?;
        let created = self.user_repo.create(&user).await?;
        let tokens = self.start_session(&created).await?;

        info!(user_id = created.id, "Guest registered");
        Ok((created, tokens))
    }

    async fn register_hotel(
        &self,
        request: RegisterHotelDto,
    ) -> Result<(User, Hotel, AuthTokens), AuthError> {
        let email = normalize_email(&request.email);
        self.ensure_email_free(&email).await?;

        let owner = self.new_user(&request.name, &email, &request.password, UserRole::Hotel)?;
        let now = Utc::now();
        let hotel = Hotel {
            id: self.id_generator.generate(),
            owner_id: owner.id,
            name: request.hotel_name.trim().to_string(),
            location: request.location.trim().to_string(),
            description: request.description,
            hotel_type: request.hotel_type,
            star_rating: request.star_rating,
            cover_image: None,
            created_at: now,
            updated_at: now,
        };

        let (owner, hotel) = self.hotel_repo.create_with_owner(&owner, &hotel).await?;
        let tokens = self.start_session(&owner).await?;

        info!(user_id = owner.id, hotel_id = hotel.id, "Hotel admin registered");
        Ok((owner, hotel, tokens))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(&user).await?;
        Ok((user, tokens))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&sha256_hex(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !session.is_active() {
            return Err(AuthError::SessionNotFound);
        }

        let user = self
            .user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Rotation: the presented token stops working
        self.session_repo.revoke(session.id).await?;
        self.start_session(&user).await
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        let session = self
            .session_repo
            .find_by_token_hash(&sha256_hex(refresh_token))
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        self.session_repo.revoke(session.id).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_profile(&self, user_id: i64, update: UpdateProfileDto) -> Result<User, AuthError> {
        let mut user = self.get_user(user_id).await?;

        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if update.tax_number.is_some() {
            user.tax_number = update.tax_number;
        }
        if update.bank_account.is_some() {
            user.bank_account = update.bank_account;
        }
        if update.eu_tax_number.is_some() {
            user.eu_tax_number = update.eu_tax_number;
        }

        Ok(self.user_repo.update(&user).await?)
    }

    async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<User>, AuthError> {
        let email = normalize_email(email);
        if self.user_repo.email_exists(&email).await? {
            return Ok(None);
        }

        let admin = self.new_user(name, &email, password, UserRole::SuperAdmin)?;
        let created = self.user_repo.create(&admin).await?;
        info!(user_id = created.id, "Super admin created");
        Ok(Some(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockHotelRepository, MockSessionRepository, MockUserRepository};

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn jwt() -> JwtSettings {
        JwtSettings {
            secret: SECRET.to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionRepository,
    ) -> AuthServiceImpl<MockUserRepository, MockSessionRepository, MockHotelRepository> {
        AuthServiceImpl::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(MockHotelRepository::new()),
            Arc::new(SnowflakeGenerator::new(1)),
            jwt(),
        )
    }

    fn register_dto() -> RegisterDto {
        RegisterDto {
            name: "Alex".into(),
            email: " Alex@Example.com ".into(),
            password: "correct horse".into(),
        }
    }

    #[tokio::test]
    async fn test_register_issues_tokens_with_guest_role() {
        let mut users = MockUserRepository::new();
        users
            .expect_email_exists()
            .withf(|email| email == "alex@example.com")
            .returning(|_| Ok(false));
        users.expect_create().returning(|u| Ok(u.clone()));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_create().times(1).returning(|s| Ok(s.clone()));

        let (user, tokens) = service(users, sessions).register(register_dto()).await.unwrap();

        assert_eq!(user.role, UserRole::Guest);
        assert_eq!(user.email, "alex@example.com");
        assert_ne!(user.password_hash, "correct horse");

        let claims = decode_claims(SECRET, &tokens.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, UserRole::Guest);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let mut users = MockUserRepository::new();
        users.expect_email_exists().returning(|_| Ok(true));
        users.expect_create().never();

        let result = service(users, MockSessionRepository::new())
            .register(register_dto())
            .await;

        assert!(matches!(result, Err(AuthError::EmailExists)));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_fails() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        let hash = svc.hash_password("right password").unwrap();

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(move |_| {
            Ok(Some(User {
                id: 1,
                email: "alex@example.com".into(),
                password_hash: hash.clone(),
                ..User::default()
            }))
        });

        let result = service(users, MockSessionRepository::new())
            .authenticate("alex@example.com", "wrong password")
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_revoked_session() {
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|hash| {
            let mut session = Session::new(1, hash.to_string(), Utc::now() + Duration::days(1));
            session.revoked_at = Some(Utc::now());
            Ok(Some(session))
        });
        sessions.expect_revoke().never();

        let result = service(MockUserRepository::new(), sessions)
            .refresh_token("a.b")
            .await;

        assert!(matches!(result, Err(AuthError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_session() {
        let mut sessions = MockSessionRepository::new();
        sessions
            .expect_find_by_token_hash()
            .returning(|hash| Ok(Some(Session::new(7, hash.to_string(), Utc::now() + Duration::days(1)))));
        sessions.expect_revoke().times(1).returning(|_| Ok(()));
        sessions.expect_create().times(1).returning(|s| Ok(s.clone()));

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                role: UserRole::Hotel,
                ..User::default()
            }))
        });

        let tokens = service(users, sessions).refresh_token("a.b").await.unwrap();
        let claims = decode_claims(SECRET, &tokens.access_token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, UserRole::Hotel);
    }

    #[test]
    fn test_decode_rejects_foreign_signature() {
        let svc = service(MockUserRepository::new(), MockSessionRepository::new());
        let tokens = svc.generate_tokens(&User { id: 3, ..User::default() }).unwrap();

        let result = decode_claims("another-secret-that-is-also-long-enough", &tokens.access_token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
