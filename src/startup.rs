//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::AuthService;
use crate::config::Settings;
use crate::domain::Notifier;
use crate::infrastructure::cache::{self, keys, CatalogCache, RedisCache};
use crate::infrastructure::database;
use crate::infrastructure::invoices::{
    FileInvoiceStorage, InvoiceRenderer, InvoiceStorage, PdfInvoiceRenderer,
};
use crate::infrastructure::notifications::NotificationDispatcher;
use crate::infrastructure::repositories::PgNotificationRepository;
use crate::presentation::http::handlers::{auth::auth_service, health};
use crate::presentation::http::routes;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Absent when no Redis URL is configured
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub catalog_cache: CatalogCache,
    pub notifier: Arc<dyn Notifier>,
    pub invoice_renderer: Arc<dyn InvoiceRenderer>,
    pub invoice_storage: Arc<dyn InvoiceStorage>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        let redis = match settings.redis.url.as_deref() {
            Some(url) => match cache::create_redis_client(url).await {
                Ok(conn) => Some(conn),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable; catalog cache and rate limiting disabled");
                    None
                }
            },
            None => {
                tracing::info!("No Redis URL configured; catalog cache and rate limiting disabled");
                None
            }
        };

        let catalog_cache = CatalogCache::new(
            redis
                .clone()
                .map(|conn| RedisCache::with_prefix(conn, keys::PREFIX)),
            settings.catalog.cache_ttl_secs,
        );

        let snowflake = Arc::new(SnowflakeGenerator::new(u64::from(
            settings.snowflake.machine_id,
        )));

        let notifier = NotificationDispatcher::spawn(
            settings.notifications.clone(),
            Arc::new(PgNotificationRepository::new(db.clone())),
            snowflake.clone(),
        );

        let state = AppState {
            db,
            redis,
            snowflake,
            catalog_cache,
            notifier: Arc::new(notifier),
            invoice_renderer: Arc::new(PdfInvoiceRenderer),
            invoice_storage: Arc::new(FileInvoiceStorage::new(settings.invoice.storage_dir.clone())),
            settings: Arc::new(settings),
        };

        bootstrap_admin(&state).await?;
        health::init_server_start();

        let router = build_router(state.clone());

        let addr = state.settings.server_addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Router with every route and global layer applied
pub fn build_router(state: AppState) -> Router {
    routes::create_router(state)
}

/// Create the configured super admin unless that email is already registered
async fn bootstrap_admin(state: &AppState) -> Result<()> {
    let admin = &state.settings.admin;
    let (Some(email), Some(password)) = (admin.email.as_deref(), admin.password.as_deref()) else {
        return Ok(());
    };
    let name = admin.name.as_deref().unwrap_or("Super Admin");

    match auth_service(state)
        .bootstrap_super_admin(email, password, name)
        .await?
    {
        Some(user) => tracing::info!(user_id = user.id, "Super admin account created"),
        None => tracing::debug!("Super admin account already exists"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
