//! Application settings and configuration structures.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration, optional
    #[serde(default)]
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Outbound hotel webhook notifications
    pub notifications: NotificationSettings,

    /// Invoice numbering, tax and PDF storage
    pub invoice: InvoiceSettings,

    /// Public catalog caching
    pub catalog: CatalogSettings,

    /// Bootstrap super admin account
    #[serde(default)]
    pub admin: AdminSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration. Without a URL the catalog cache and rate limiting are off.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisSettings {
    pub url: Option<String>,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-1023)
    pub machine_id: u16,
}

/// Rate limiting for auth and device endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per window on auth endpoints
    pub auth_requests_per_window: u32,

    /// Requests allowed per window on device endpoints
    pub device_requests_per_window: u32,

    /// Window length in seconds
    pub window_seconds: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Hotel webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// Endpoint base; requests go to `{base_url}/{hotel_id}`. Unset disables delivery.
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Attempts before a notification is parked in `pending_notifications`
    pub max_attempts: u32,

    /// Delay before each retry, in seconds
    pub backoff_secs: Vec<u64>,

    /// How often parked notifications are re-dispatched
    pub retry_sweep_interval_secs: u64,

    /// Bounded queue between request handlers and the dispatcher
    pub queue_capacity: usize,
}

/// Invoice settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSettings {
    /// VAT percentage applied to the booking subtotal
    pub tax_rate_percent: i64,

    /// Days between issue date and due date
    pub payment_due_days: i64,

    /// Invoice number prefix, e.g. `SZ000042/2026`
    pub number_prefix: String,

    /// Directory where rendered PDFs are stored
    pub storage_dir: String,
}

/// Public catalog cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub cache_ttl_secs: u64,
}

/// Optional super admin created at startup when no account with that email exists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. `APP__SECTION__KEY` environment variables
    /// 5. plain environment variables such as `DATABASE_URL` (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let builder = Self::default_builder(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("notifications.backoff_secs")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .set_override_option(
                "notifications.base_url",
                std::env::var("NOTIFY_BASE_URL").ok(),
            )?;

        Self::from_builder(builder)
    }

    /// Builder pre-populated with every default value.
    ///
    /// `database.url` and `jwt.secret` have no default and must be supplied by a later source.
    pub fn default_builder(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.access_token_expiry_minutes", 15)?
            .set_default("jwt.refresh_token_expiry_days", 7)?
            .set_default("snowflake.machine_id", 1)?
            .set_default("rate_limit.auth_requests_per_window", 10)?
            .set_default("rate_limit.device_requests_per_window", 120)?
            .set_default("rate_limit.window_seconds", 60)?
            .set_default("cors.allowed_origins", vec!["http://localhost:5173"])?
            .set_default("notifications.request_timeout_secs", 30)?
            .set_default("notifications.max_attempts", 5)?
            .set_default("notifications.backoff_secs", vec![10_i64, 30, 60, 300])?
            .set_default("notifications.retry_sweep_interval_secs", 300)?
            .set_default("notifications.queue_capacity", 1024)?
            .set_default("invoice.tax_rate_percent", 27)?
            .set_default("invoice.payment_due_days", 8)?
            .set_default("invoice.number_prefix", "SZ")?
            .set_default("invoice.storage_dir", "storage/invoices")?
            .set_default("catalog.cache_ttl_secs", 600)
    }

    /// Finish a builder into validated settings.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| settings.validate())
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.notifications.max_attempts == 0 {
            return Err(ConfigError::Message(
                "notifications.max_attempts must be at least 1".into(),
            ));
        }
        if !(0..=100).contains(&self.invoice.tax_rate_percent) {
            return Err(ConfigError::Message(format!(
                "invoice.tax_rate_percent must be between 0 and 100, got {}",
                self.invoice.tax_rate_percent
            )));
        }
        Ok(self)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl NotificationSettings {
    /// Delay before retry number `attempt` (1-based); the last entry repeats.
    pub fn backoff_for(&self, attempt: u32) -> std::time::Duration {
        let idx = (attempt.saturating_sub(1) as usize).min(self.backoff_secs.len().saturating_sub(1));
        let secs = self.backoff_secs.get(idx).copied().unwrap_or(60);
        std::time::Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with_required() -> ConfigBuilder<DefaultState> {
        Settings::default_builder("test")
            .unwrap()
            .set_override("database.url", "postgres://localhost/hotelflow_test")
            .unwrap()
    }

    #[test]
    fn test_defaults_are_loaded() {
        let settings = Settings::from_builder(
            builder_with_required()
                .set_override("jwt.secret", "a".repeat(32))
                .unwrap(),
        )
        .unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.invoice.tax_rate_percent, 27);
        assert_eq!(settings.invoice.payment_due_days, 8);
        assert_eq!(settings.notifications.backoff_secs, vec![10, 30, 60, 300]);
        assert!(settings.redis.url.is_none());
        assert!(settings.notifications.base_url.is_none());
    }

    #[test]
    fn test_short_jwt_secret_is_rejected() {
        let result = Settings::from_builder(
            builder_with_required().set_override("jwt.secret", "short").unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_backoff_repeats_last_entry() {
        let settings = NotificationSettings {
            base_url: None,
            request_timeout_secs: 30,
            max_attempts: 5,
            backoff_secs: vec![10, 30, 60, 300],
            retry_sweep_interval_secs: 300,
            queue_capacity: 16,
        };
        assert_eq!(settings.backoff_for(1).as_secs(), 10);
        assert_eq!(settings.backoff_for(4).as_secs(), 300);
        assert_eq!(settings.backoff_for(9).as_secs(), 300);
    }
}
