//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Account role matching the `users.role` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Guest,
    /// Hotel administrator, owns exactly one hotel
    Hotel,
    SuperAdmin,
}

impl UserRole {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "hotel" => Some(Self::Hotel),
            "super_admin" | "superadmin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Hotel => "hotel",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - role: VARCHAR(20) NOT NULL
/// - tax_number, bank_account, eu_tax_number: VARCHAR NULL (invoice seller data)
/// - created_at, updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: UserRole,
    pub tax_number: Option<String>,
    pub bank_account: Option<String>,
    pub eu_tax_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            role: UserRole::default(),
            tax_number: None,
            bank_account: None,
            eu_tax_number: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    pub fn is_hotel_admin(&self) -> bool {
        self.role == UserRole::Hotel
    }
}

/// What a user deletion took with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRemoval {
    /// Key assignments released from the user's bookings
    pub released_assignments: u64,
    /// Hotels that lost bookings of the deleted user
    pub affected_hotels: Vec<i64>,
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find a user by their email address (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Create a new user in the database.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Update name, role and billing fields.
    async fn update(&self, user: &User) -> Result<User, AppError>;

    /// Delete a user by ID, releasing the keys of their bookings first.
    ///
    /// A hotel administrator whose hotel still has active or upcoming
    /// bookings cannot be deleted.
    async fn delete(&self, id: i64) -> Result<UserRemoval, AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Page through users, optionally filtered by role.
    async fn list(
        &self,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("guest", Some(UserRole::Guest))]
    #[test_case("HOTEL", Some(UserRole::Hotel))]
    #[test_case("super_admin", Some(UserRole::SuperAdmin))]
    #[test_case("superadmin", Some(UserRole::SuperAdmin))]
    #[test_case("owner", None)]
    fn test_role_from_str(input: &str, expected: Option<UserRole>) {
        assert_eq!(UserRole::from_str(input), expected);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "secret-hash".into(),
            ..User::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"guest\""));
    }

    #[test]
    fn test_actor_roles() {
        assert!(Actor::new(1, UserRole::SuperAdmin).is_super_admin());
        assert!(Actor::new(1, UserRole::Hotel).is_hotel_admin());
        assert!(!Actor::new(1, UserRole::Guest).is_hotel_admin());
    }
}
