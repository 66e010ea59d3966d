//! Admin Service
//!
//! Back-office views and user management for super admins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::domain::{
    Actor, Booking, BookingFilter, BookingRepository, BookingStatus, CatalogRepository, Hotel,
    HotelRepository, Notification, Notifier, PlatformStats, SessionRepository, User, UserRemoval,
    UserRepository, UserRole,
};
use crate::infrastructure::cache::CatalogCache;
use crate::shared::error::AppError;

const MAX_PAGE_SIZE: i64 = 200;

/// Admin service trait
#[async_trait]
pub trait AdminService: Send + Sync {
    async fn stats(&self, actor: Actor) -> Result<PlatformStats, AdminError>;

    async fn list_users(&self, actor: Actor, query: UserQuery) -> Result<Vec<User>, AdminError>;

    async fn get_user(&self, actor: Actor, user_id: i64) -> Result<User, AdminError>;

    async fn update_user(&self, actor: Actor, user_id: i64, update: AdminUpdateUserDto) -> Result<User, AdminError>;

    async fn delete_user(&self, actor: Actor, user_id: i64) -> Result<UserRemoval, AdminError>;

    async fn list_hotels(&self, actor: Actor) -> Result<Vec<Hotel>, AdminError>;

    async fn list_bookings(&self, actor: Actor, status: Option<BookingStatus>) -> Result<Vec<Booking>, AdminError>;
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminUpdateUserDto {
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

/// Admin service errors
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("User not found")]
    UserNotFound,

    #[error("Super admin access required")]
    Forbidden,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::UserNotFound => AppError::NotFound("User not found".into()),
            AdminError::Forbidden => AppError::Forbidden("Super admin access required".into()),
            AdminError::Invalid(msg) => AppError::BadRequest(msg),
            AdminError::Repository(e) => e,
        }
    }
}

fn require_super_admin(actor: &Actor) -> Result<(), AdminError> {
    if actor.is_super_admin() {
        Ok(())
    } else {
        Err(AdminError::Forbidden)
    }
}

/// AdminService implementation
pub struct AdminServiceImpl<C, U, H, B, S>
where
    C: CatalogRepository,
    U: UserRepository,
    H: HotelRepository,
    B: BookingRepository,
    S: SessionRepository,
{
    catalog_repo: Arc<C>,
    user_repo: Arc<U>,
    hotel_repo: Arc<H>,
    booking_repo: Arc<B>,
    session_repo: Arc<S>,
    notifier: Arc<dyn Notifier>,
    catalog_cache: CatalogCache,
}

impl<C, U, H, B, S> AdminServiceImpl<C, U, H, B, S>
where
    C: CatalogRepository,
    U: UserRepository,
    H: HotelRepository,
    B: BookingRepository,
    S: SessionRepository,
{
    pub fn new(
        catalog_repo: Arc<C>,
        user_repo: Arc<U>,
        hotel_repo: Arc<H>,
        booking_repo: Arc<B>,
        session_repo: Arc<S>,
        notifier: Arc<dyn Notifier>,
        catalog_cache: CatalogCache,
    ) -> Self {
        Self {
            catalog_repo,
            user_repo,
            hotel_repo,
            booking_repo,
            session_repo,
            notifier,
            catalog_cache,
        }
    }

    async fn find_user(&self, user_id: i64) -> Result<User, AdminError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)
    }
}

#[async_trait]
impl<C, U, H, B, S> AdminService for AdminServiceImpl<C, U, H, B, S>
where
    C: CatalogRepository + 'static,
    U: UserRepository + 'static,
    H: HotelRepository + 'static,
    B: BookingRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn stats(&self, actor: Actor) -> Result<PlatformStats, AdminError> {
        require_super_admin(&actor)?;
        Ok(self.catalog_repo.platform_stats().await?)
    }

    async fn list_users(&self, actor: Actor, query: UserQuery) -> Result<Vec<User>, AdminError> {
        require_super_admin(&actor)?;
        let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0).max(0);
        Ok(self.user_repo.list(query.role, limit, offset).await?)
    }

    async fn get_user(&self, actor: Actor, user_id: i64) -> Result<User, AdminError> {
        require_super_admin(&actor)?;
        self.find_user(user_id).await
    }

    async fn update_user(&self, actor: Actor, user_id: i64, update: AdminUpdateUserDto) -> Result<User, AdminError> {
        require_super_admin(&actor)?;
        let mut user = self.find_user(user_id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AdminError::Invalid("Name cannot be empty".into()));
            }
            user.name = name.to_string();
        }
        let mut role_changed = false;
        if let Some(role) = update.role {
            if user_id == actor.user_id && role != UserRole::SuperAdmin {
                return Err(AdminError::Invalid("You cannot demote yourself".into()));
            }
            if role != user.role {
                info!(user_id, from = %user.role, to = %role, "User role changed");
                role_changed = true;
            }
            user.role = role;
        }
        user.updated_at = Utc::now();

        let user = self.user_repo.update(&user).await?;
        if role_changed {
            // Refresh tokens would otherwise mint access tokens with the old role
            let revoked = self.session_repo.revoke_all_for_user(user_id).await?;
            info!(user_id, revoked, "Sessions revoked after role change");
        }
        Ok(user)
    }

    async fn delete_user(&self, actor: Actor, user_id: i64) -> Result<UserRemoval, AdminError> {
        require_super_admin(&actor)?;
        if user_id == actor.user_id {
            return Err(AdminError::Invalid("You cannot delete your own account".into()));
        }
        self.find_user(user_id).await?;
        let removal = self.user_repo.delete(user_id).await?;
        info!(
            user_id,
            released_assignments = removal.released_assignments,
            "User deleted"
        );

        for hotel_id in &removal.affected_hotels {
            self.notifier
                .notify(Notification::hotel_sync(*hotel_id, "booking.deleted", None));
        }
        self.catalog_cache.invalidate().await;
        Ok(removal)
    }

    async fn list_hotels(&self, actor: Actor) -> Result<Vec<Hotel>, AdminError> {
        require_super_admin(&actor)?;
        Ok(self.hotel_repo.list(None).await?)
    }

    async fn list_bookings(&self, actor: Actor, status: Option<BookingStatus>) -> Result<Vec<Booking>, AdminError> {
        require_super_admin(&actor)?;
        let filter = BookingFilter {
            statuses: status.into_iter().collect(),
            ..BookingFilter::default()
        };
        Ok(self.booking_repo.list(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockBookingRepository, MockCatalogRepository, MockHotelRepository, MockNotifier,
        MockSessionRepository, MockUserRepository,
    };

    type Service = AdminServiceImpl<
        MockCatalogRepository,
        MockUserRepository,
        MockHotelRepository,
        MockBookingRepository,
        MockSessionRepository,
    >;

    struct Mocks {
        catalog: MockCatalogRepository,
        users: MockUserRepository,
        bookings: MockBookingRepository,
        sessions: MockSessionRepository,
        notifier: MockNotifier,
        cache: CatalogCache,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                catalog: MockCatalogRepository::new(),
                users: MockUserRepository::new(),
                bookings: MockBookingRepository::new(),
                sessions: MockSessionRepository::new(),
                notifier: MockNotifier::new(),
                cache: CatalogCache::disabled(),
            }
        }

        fn with_user(mut self, role: UserRole) -> Self {
            self.users.expect_find_by_id().returning(move |id| {
                Ok(Some(User {
                    id,
                    role,
                    ..User::default()
                }))
            });
            self
        }

        fn build(self) -> Service {
            AdminServiceImpl::new(
                Arc::new(self.catalog),
                Arc::new(self.users),
                Arc::new(MockHotelRepository::new()),
                Arc::new(self.bookings),
                Arc::new(self.sessions),
                Arc::new(self.notifier),
                self.cache,
            )
        }
    }

    fn admin() -> Actor {
        Actor::new(1, UserRole::SuperAdmin)
    }

    #[tokio::test]
    async fn test_stats_require_super_admin() {
        let mut m = Mocks::new();
        m.catalog.expect_platform_stats().never();

        let result = m.build().stats(Actor::new(2, UserRole::Hotel)).await;
        assert!(matches!(result, Err(AdminError::Forbidden)));
    }

    #[tokio::test]
    async fn test_user_page_is_clamped() {
        let mut m = Mocks::new();
        m.users
            .expect_list()
            .withf(|role, limit, offset| *role == Some(UserRole::Hotel) && *limit == 200 && *offset == 0)
            .returning(|_, _, _| Ok(vec![]));

        let query = UserQuery {
            role: Some(UserRole::Hotel),
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert!(m.build().list_users(admin(), query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let mut m = Mocks::new().with_user(UserRole::SuperAdmin);
        m.users.expect_update().never();

        let update = AdminUpdateUserDto {
            name: None,
            role: Some(UserRole::Guest),
        };
        let result = m.build().update_user(admin(), 1, update).await;
        assert!(matches!(result, Err(AdminError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_role_change_revokes_sessions() {
        let mut m = Mocks::new().with_user(UserRole::Guest);
        m.users.expect_update().returning(|u| Ok(u.clone()));
        m.sessions
            .expect_revoke_all_for_user()
            .withf(|id| *id == 7)
            .times(1)
            .returning(|_| Ok(2));

        let update = AdminUpdateUserDto {
            name: None,
            role: Some(UserRole::Hotel),
        };
        let user = m.build().update_user(admin(), 7, update).await.unwrap();
        assert_eq!(user.role, UserRole::Hotel);
    }

    #[tokio::test]
    async fn test_rename_keeps_sessions() {
        let mut m = Mocks::new().with_user(UserRole::Guest);
        m.users.expect_update().returning(|u| Ok(u.clone()));
        m.sessions.expect_revoke_all_for_user().never();

        let update = AdminUpdateUserDto {
            name: Some("  Ada  ".into()),
            role: Some(UserRole::Guest),
        };
        let user = m.build().update_user(admin(), 7, update).await.unwrap();
        assert_eq!(user.name, "Ada");
    }

    #[tokio::test]
    async fn test_delete_user_releases_keys_and_notifies_hotels() {
        let mut m = Mocks::new().with_user(UserRole::Guest);
        m.users.expect_delete().withf(|id| *id == 7).times(1).returning(|_| {
            Ok(UserRemoval {
                released_assignments: 3,
                affected_hotels: vec![100, 200],
            })
        });
        m.notifier
            .expect_notify()
            .withf(|n| n.payload["reason"] == "booking.deleted")
            .times(2)
            .return_const(());
        let cache = m.cache.clone();

        let removal = m.build().delete_user(admin(), 7).await.unwrap();
        assert_eq!(removal.released_assignments, 3);
        assert_eq!(removal.affected_hotels, vec![100, 200]);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn test_delete_busy_hotel_admin_conflicts() {
        let mut m = Mocks::new().with_user(UserRole::Hotel);
        m.users.expect_delete().returning(|_| {
            Err(AppError::Conflict("User's hotel has active or upcoming bookings".into()))
        });
        m.notifier.expect_notify().never();

        let result = m.build().delete_user(admin(), 7).await;
        assert!(matches!(
            result.map_err(AppError::from),
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let mut m = Mocks::new();
        m.users.expect_delete().never();

        let result = m.build().delete_user(admin(), 1).await;
        assert!(matches!(result, Err(AdminError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_bookings_filtered_by_status() {
        let mut m = Mocks::new();
        m.bookings
            .expect_list()
            .withf(|f| f.statuses == vec![BookingStatus::Cancelled] && f.hotel_id.is_none())
            .returning(|_| Ok(vec![]));

        let result = m.build().list_bookings(admin(), Some(BookingStatus::Cancelled)).await;
        assert!(result.unwrap().is_empty());
    }
}
