//! Tag and Image Service
//!
//! Platform-wide service tags (curated by super admins) and room images.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::can_manage;
use crate::domain::{
    Actor, HotelRepository, Image, ImageRepository, Room, RoomRepository, ServiceTag,
    TagRepository, TagUsage,
};
use crate::infrastructure::cache::CatalogCache;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

#[async_trait]
pub trait TagService: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<ServiceTag>, TagError>;

    async fn tag_usage(&self, actor: Actor) -> Result<Vec<TagUsage>, TagError>;

    async fn create_tag(&self, actor: Actor, name: &str) -> Result<ServiceTag, TagError>;

    async fn rename_tag(&self, actor: Actor, tag_id: i64, name: &str) -> Result<ServiceTag, TagError>;

    async fn delete_tag(&self, actor: Actor, tag_id: i64) -> Result<(), TagError>;

    async fn attach_hotel_tag(&self, actor: Actor, hotel_id: i64, tag_id: i64) -> Result<Vec<ServiceTag>, TagError>;

    async fn detach_hotel_tag(&self, actor: Actor, hotel_id: i64, tag_id: i64) -> Result<(), TagError>;

    async fn attach_room_tag(&self, actor: Actor, room_id: i64, tag_id: i64) -> Result<Vec<ServiceTag>, TagError>;

    async fn detach_room_tag(&self, actor: Actor, room_id: i64, tag_id: i64) -> Result<(), TagError>;

    /// Store an image url, optionally linking it to a room straight away
    async fn create_image(&self, actor: Actor, url: &str, room_id: Option<i64>) -> Result<Image, TagError>;

    async fn get_image(&self, image_id: i64) -> Result<Image, TagError>;

    async fn delete_image(&self, actor: Actor, image_id: i64) -> Result<(), TagError>;

    async fn room_images(&self, room_id: i64) -> Result<Vec<Image>, TagError>;

    async fn link_room_image(&self, actor: Actor, room_id: i64, image_id: i64) -> Result<Vec<Image>, TagError>;

    async fn unlink_room_image(&self, actor: Actor, room_id: i64, image_id: i64) -> Result<(), TagError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Permission denied")]
    Forbidden,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<TagError> for AppError {
    fn from(e: TagError) -> Self {
        match e {
            TagError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            TagError::Forbidden => AppError::Forbidden("Permission denied".into()),
            TagError::Repository(e) => e,
        }
    }
}

pub struct TagServiceImpl<T, I, H, R>
where
    T: TagRepository,
    I: ImageRepository,
    H: HotelRepository,
    R: RoomRepository,
{
    tag_repo: Arc<T>,
    image_repo: Arc<I>,
    hotel_repo: Arc<H>,
    room_repo: Arc<R>,
    catalog_cache: CatalogCache,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<T, I, H, R> TagServiceImpl<T, I, H, R>
where
    T: TagRepository,
    I: ImageRepository,
    H: HotelRepository,
    R: RoomRepository,
{
    pub fn new(
        tag_repo: Arc<T>,
        image_repo: Arc<I>,
        hotel_repo: Arc<H>,
        room_repo: Arc<R>,
        catalog_cache: CatalogCache,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            tag_repo,
            image_repo,
            hotel_repo,
            room_repo,
            catalog_cache,
            id_generator,
        }
    }

    fn require_super_admin(actor: &Actor) -> Result<(), TagError> {
        if actor.is_super_admin() {
            Ok(())
        } else {
            Err(TagError::Forbidden)
        }
    }

    async fn ensure_manages_hotel(&self, actor: Actor, hotel_id: i64) -> Result<(), TagError> {
        let hotel = self
            .hotel_repo
            .find_by_id(hotel_id)
            .await?
            .ok_or(TagError::NotFound("Hotel"))?;
        if !can_manage(&actor, &hotel) {
            return Err(TagError::Forbidden);
        }
        Ok(())
    }

    async fn managed_room(&self, actor: Actor, room_id: i64) -> Result<Room, TagError> {
        let room = self
            .room_repo
            .find_by_id(room_id)
            .await?
            .ok_or(TagError::NotFound("Room"))?;
        self.ensure_manages_hotel(actor, room.hotel_id).await?;
        Ok(room)
    }

    async fn ensure_tag_exists(&self, tag_id: i64) -> Result<ServiceTag, TagError> {
        self.tag_repo
            .find_by_id(tag_id)
            .await?
            .ok_or(TagError::NotFound("Tag"))
    }
}

#[async_trait]
impl<T, I, H, R> TagService for TagServiceImpl<T, I, H, R>
where
    T: TagRepository + 'static,
    I: ImageRepository + 'static,
    H: HotelRepository + 'static,
    R: RoomRepository + 'static,
{
    async fn list_tags(&self) -> Result<Vec<ServiceTag>, TagError> {
        Ok(self.tag_repo.list().await?)
    }

    async fn tag_usage(&self, actor: Actor) -> Result<Vec<TagUsage>, TagError> {
        Self::require_super_admin(&actor)?;
        Ok(self.tag_repo.usage().await?)
    }

    async fn create_tag(&self, actor: Actor, name: &str) -> Result<ServiceTag, TagError> {
        Self::require_super_admin(&actor)?;
        let tag = ServiceTag {
            id: self.id_generator.generate(),
            name: name.trim().to_string(),
        };
        Ok(self.tag_repo.create(&tag).await?)
    }

    async fn rename_tag(&self, actor: Actor, tag_id: i64, name: &str) -> Result<ServiceTag, TagError> {
        Self::require_super_admin(&actor)?;
        let mut tag = self.ensure_tag_exists(tag_id).await?;
        tag.name = name.trim().to_string();

        let updated = self.tag_repo.update(&tag).await?;
        self.catalog_cache.invalidate().await;
        Ok(updated)
    }

    async fn delete_tag(&self, actor: Actor, tag_id: i64) -> Result<(), TagError> {
        Self::require_super_admin(&actor)?;
        self.tag_repo.delete(tag_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }

    async fn attach_hotel_tag(&self, actor: Actor, hotel_id: i64, tag_id: i64) -> Result<Vec<ServiceTag>, TagError> {
        self.ensure_manages_hotel(actor, hotel_id).await?;
        self.ensure_tag_exists(tag_id).await?;
        self.tag_repo.attach_to_hotel(hotel_id, tag_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(self.tag_repo.list_for_hotel(hotel_id).await?)
    }

    async fn detach_hotel_tag(&self, actor: Actor, hotel_id: i64, tag_id: i64) -> Result<(), TagError> {
        self.ensure_manages_hotel(actor, hotel_id).await?;
        self.tag_repo.detach_from_hotel(hotel_id, tag_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }

    async fn attach_room_tag(&self, actor: Actor, room_id: i64, tag_id: i64) -> Result<Vec<ServiceTag>, TagError> {
        self.managed_room(actor, room_id).await?;
        self.ensure_tag_exists(tag_id).await?;
        self.tag_repo.attach_to_room(room_id, tag_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(self.tag_repo.list_for_room(room_id).await?)
    }

    async fn detach_room_tag(&self, actor: Actor, room_id: i64, tag_id: i64) -> Result<(), TagError> {
        self.managed_room(actor, room_id).await?;
        self.tag_repo.detach_from_room(room_id, tag_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }

    async fn create_image(&self, actor: Actor, url: &str, room_id: Option<i64>) -> Result<Image, TagError> {
        if let Some(room_id) = room_id {
            self.managed_room(actor, room_id).await?;
        } else if !(actor.is_hotel_admin() || actor.is_super_admin()) {
            return Err(TagError::Forbidden);
        }

        let image = Image {
            id: self.id_generator.generate(),
            url: url.trim().to_string(),
            created_at: Utc::now(),
        };
        let created = self.image_repo.create(&image).await?;

        if let Some(room_id) = room_id {
            self.image_repo.link_room(room_id, created.id).await?;
            self.catalog_cache.invalidate().await;
        }
        Ok(created)
    }

    async fn get_image(&self, image_id: i64) -> Result<Image, TagError> {
        self.image_repo
            .find_by_id(image_id)
            .await?
            .ok_or(TagError::NotFound("Image"))
    }

    async fn delete_image(&self, actor: Actor, image_id: i64) -> Result<(), TagError> {
        self.get_image(image_id).await?;

        match self.image_repo.owning_hotel(image_id).await? {
            Some(hotel_id) => self.ensure_manages_hotel(actor, hotel_id).await?,
            None if actor.is_hotel_admin() || actor.is_super_admin() => {}
            None => return Err(TagError::Forbidden),
        }

        self.image_repo.delete(image_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }

    async fn room_images(&self, room_id: i64) -> Result<Vec<Image>, TagError> {
        if self.room_repo.find_by_id(room_id).await?.is_none() {
            return Err(TagError::NotFound("Room"));
        }
        Ok(self.image_repo.list_for_room(room_id).await?)
    }

    async fn link_room_image(&self, actor: Actor, room_id: i64, image_id: i64) -> Result<Vec<Image>, TagError> {
        self.managed_room(actor, room_id).await?;
        self.get_image(image_id).await?;
        self.image_repo.link_room(room_id, image_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(self.image_repo.list_for_room(room_id).await?)
    }

    async fn unlink_room_image(&self, actor: Actor, room_id: i64, image_id: i64) -> Result<(), TagError> {
        self.managed_room(actor, room_id).await?;
        self.image_repo.unlink_room(room_id, image_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Hotel, MockHotelRepository, MockImageRepository, MockRoomRepository, MockTagRepository,
        UserRole,
    };

    fn service(
        tags: MockTagRepository,
        images: MockImageRepository,
        hotels: MockHotelRepository,
        rooms: MockRoomRepository,
    ) -> TagServiceImpl<MockTagRepository, MockImageRepository, MockHotelRepository, MockRoomRepository>
    {
        TagServiceImpl::new(
            Arc::new(tags),
            Arc::new(images),
            Arc::new(hotels),
            Arc::new(rooms),
            CatalogCache::disabled(),
            Arc::new(SnowflakeGenerator::new(1)),
        )
    }

    #[tokio::test]
    async fn test_only_super_admin_creates_tags() {
        let mut tags = MockTagRepository::new();
        tags.expect_create().times(1).returning(|t| Ok(t.clone()));

        let svc = service(
            tags,
            MockImageRepository::new(),
            MockHotelRepository::new(),
            MockRoomRepository::new(),
        );

        let denied = svc.create_tag(Actor::new(1, UserRole::Hotel), "Spa").await;
        assert!(matches!(denied, Err(TagError::Forbidden)));

        let tag = svc
            .create_tag(Actor::new(2, UserRole::SuperAdmin), "  Spa ")
            .await
            .unwrap();
        assert_eq!(tag.name, "Spa");
    }

    #[tokio::test]
    async fn test_image_for_foreign_room_is_forbidden() {
        let mut rooms = MockRoomRepository::new();
        rooms.expect_find_by_id().returning(|id| {
            Ok(Some(Room {
                id,
                hotel_id: 1,
                ..Room::default()
            }))
        });
        let mut hotels = MockHotelRepository::new();
        hotels.expect_find_by_id().returning(|id| {
            Ok(Some(Hotel {
                id,
                owner_id: 10,
                ..Hotel::default()
            }))
        });
        let mut images = MockImageRepository::new();
        images.expect_create().never();

        let result = service(MockTagRepository::new(), images, hotels, rooms)
            .create_image(
                Actor::new(11, UserRole::Hotel),
                "https://img.example.com/a.jpg",
                Some(5),
            )
            .await;

        assert!(matches!(result, Err(TagError::Forbidden)));
    }

    #[tokio::test]
    async fn test_unknown_tag_is_not_attached() {
        let mut hotels = MockHotelRepository::new();
        hotels.expect_find_by_id().returning(|id| {
            Ok(Some(Hotel {
                id,
                owner_id: 10,
                ..Hotel::default()
            }))
        });
        let mut tags = MockTagRepository::new();
        tags.expect_find_by_id().returning(|_| Ok(None));
        tags.expect_attach_to_hotel().never();

        let result = service(tags, MockImageRepository::new(), hotels, MockRoomRepository::new())
            .attach_hotel_tag(Actor::new(10, UserRole::Hotel), 1, 3)
            .await;

        assert!(matches!(result, Err(TagError::NotFound("Tag"))));
    }
}
