//! Hotel Service
//!
//! Hotel, room and extra-service management for hotel admins, plus the
//! public read side of a single hotel.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::can_manage;
use crate::domain::{
    Actor, Hotel, HotelRepository, HotelType, Room, RoomRepository, ServiceItem,
    ServiceItemRepository, ServiceTag, TagRepository,
};
use crate::infrastructure::cache::CatalogCache;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Hotel service trait
#[async_trait]
pub trait HotelService: Send + Sync {
    async fn list_hotels(&self, location: Option<String>) -> Result<Vec<Hotel>, HotelError>;

    async fn get_hotel(&self, hotel_id: i64) -> Result<HotelDetail, HotelError>;

    /// The hotel owned by the calling hotel admin
    async fn my_hotel(&self, actor: Actor) -> Result<HotelDetail, HotelError>;

    async fn update_hotel(&self, actor: Actor, hotel_id: i64, update: UpdateHotelDto) -> Result<Hotel, HotelError>;

    async fn delete_hotel(&self, actor: Actor, hotel_id: i64) -> Result<(), HotelError>;

    async fn list_rooms(&self, hotel_id: i64) -> Result<Vec<Room>, HotelError>;

    async fn get_room(&self, room_id: i64) -> Result<Room, HotelError>;

    async fn create_room(&self, actor: Actor, hotel_id: i64, request: CreateRoomDto) -> Result<Room, HotelError>;

    async fn update_room(&self, actor: Actor, room_id: i64, update: UpdateRoomDto) -> Result<Room, HotelError>;

    async fn delete_room(&self, actor: Actor, room_id: i64) -> Result<(), HotelError>;

    async fn list_services(&self, hotel_id: i64) -> Result<Vec<ServiceItem>, HotelError>;

    async fn get_service(&self, service_id: i64) -> Result<ServiceItem, HotelError>;

    async fn create_service(
        &self,
        actor: Actor,
        hotel_id: i64,
        request: CreateServiceDto,
    ) -> Result<ServiceItem, HotelError>;

    async fn update_service(
        &self,
        actor: Actor,
        service_id: i64,
        update: UpdateServiceDto,
    ) -> Result<ServiceItem, HotelError>;

    async fn delete_service(&self, actor: Actor, service_id: i64) -> Result<(), HotelError>;
}

/// A hotel with everything shown on its public page.
#[derive(Debug, Clone)]
pub struct HotelDetail {
    pub hotel: Hotel,
    pub rooms: Vec<Room>,
    pub services: Vec<ServiceItem>,
    pub tags: Vec<ServiceTag>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateHotelDto {
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub hotel_type: Option<HotelType>,
    pub star_rating: Option<i16>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateRoomDto {
    pub name: String,
    pub description: Option<String>,
    pub price_per_night: i64,
    pub base_price: i64,
    pub capacity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRoomDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_night: Option<i64>,
    pub base_price: Option<i64>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateServiceDto {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateServiceDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

/// Hotel service errors
#[derive(Debug, thiserror::Error)]
pub enum HotelError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Permission denied")]
    Forbidden,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<HotelError> for AppError {
    fn from(e: HotelError) -> Self {
        match e {
            HotelError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            HotelError::Forbidden => AppError::Forbidden("Permission denied".into()),
            HotelError::Repository(e) => e,
        }
    }
}

/// HotelService implementation
pub struct HotelServiceImpl<H, R, S, T>
where
    H: HotelRepository,
    R: RoomRepository,
    S: ServiceItemRepository,
    T: TagRepository,
{
    hotel_repo: Arc<H>,
    room_repo: Arc<R>,
    service_repo: Arc<S>,
    tag_repo: Arc<T>,
    catalog_cache: CatalogCache,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<H, R, S, T> HotelServiceImpl<H, R, S, T>
where
    H: HotelRepository,
    R: RoomRepository,
    S: ServiceItemRepository,
    T: TagRepository,
{
    pub fn new(
        hotel_repo: Arc<H>,
        room_repo: Arc<R>,
        service_repo: Arc<S>,
        tag_repo: Arc<T>,
        catalog_cache: CatalogCache,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            hotel_repo,
            room_repo,
            service_repo,
            tag_repo,
            catalog_cache,
            id_generator,
        }
    }

    async fn find_hotel(&self, hotel_id: i64) -> Result<Hotel, HotelError> {
        self.hotel_repo
            .find_by_id(hotel_id)
            .await?
            .ok_or(HotelError::NotFound("Hotel"))
    }

    /// The hotel, if `actor` may manage it.
    async fn managed_hotel(&self, actor: Actor, hotel_id: i64) -> Result<Hotel, HotelError> {
        let hotel = self.find_hotel(hotel_id).await?;
        if !can_manage(&actor, &hotel) {
            return Err(HotelError::Forbidden);
        }
        Ok(hotel)
    }

    async fn managed_room(&self, actor: Actor, room_id: i64) -> Result<Room, HotelError> {
        let room = self.get_room_inner(room_id).await?;
        self.managed_hotel(actor, room.hotel_id).await?;
        Ok(room)
    }

    async fn managed_service(&self, actor: Actor, service_id: i64) -> Result<ServiceItem, HotelError> {
        let item = self.get_service_inner(service_id).await?;
        self.managed_hotel(actor, item.hotel_id).await?;
        Ok(item)
    }

    async fn get_room_inner(&self, room_id: i64) -> Result<Room, HotelError> {
        self.room_repo
            .find_by_id(room_id)
            .await?
            .ok_or(HotelError::NotFound("Room"))
    }

    async fn get_service_inner(&self, service_id: i64) -> Result<ServiceItem, HotelError> {
        self.service_repo
            .find_by_id(service_id)
            .await?
            .ok_or(HotelError::NotFound("Service"))
    }

    async fn detail(&self, hotel: Hotel) -> Result<HotelDetail, HotelError> {
        let rooms = self.room_repo.list_by_hotel(hotel.id).await?;
        let services = self.service_repo.list_by_hotel(hotel.id).await?;
        let tags = self.tag_repo.list_for_hotel(hotel.id).await?;
        Ok(HotelDetail {
            hotel,
            rooms,
            services,
            tags,
        })
    }
}

#[async_trait]
impl<H, R, S, T> HotelService for HotelServiceImpl<H, R, S, T>
where
    H: HotelRepository + 'static,
    R: RoomRepository + 'static,
    S: ServiceItemRepository + 'static,
    T: TagRepository + 'static,
{
    async fn list_hotels(&self, location: Option<String>) -> Result<Vec<Hotel>, HotelError> {
        let location = location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
        Ok(self.hotel_repo.list(location).await?)
    }

    async fn get_hotel(&self, hotel_id: i64) -> Result<HotelDetail, HotelError> {
        let hotel = self.find_hotel(hotel_id).await?;
        self.detail(hotel).await
    }

    async fn my_hotel(&self, actor: Actor) -> Result<HotelDetail, HotelError> {
        if !actor.is_hotel_admin() {
            return Err(HotelError::Forbidden);
        }
        let hotel = self
            .hotel_repo
            .find_by_owner(actor.user_id)
            .await?
            .ok_or(HotelError::NotFound("Hotel"))?;
        self.detail(hotel).await
    }

    async fn update_hotel(&self, actor: Actor, hotel_id: i64, update: UpdateHotelDto) -> Result<Hotel, HotelError> {
        let mut hotel = self.managed_hotel(actor, hotel_id).await?;

        if let Some(name) = update.name {
            hotel.name = name.trim().to_string();
        }
        if let Some(location) = update.location {
            hotel.location = location.trim().to_string();
        }
        if update.description.is_some() {
            hotel.description = update.description;
        }
        if let Some(hotel_type) = update.hotel_type {
            hotel.hotel_type = hotel_type;
        }
        if update.star_rating.is_some() {
            hotel.star_rating = update.star_rating;
        }
        if update.cover_image.is_some() {
            hotel.cover_image = update.cover_image;
        }

        let updated = self.hotel_repo.update(&hotel).await?;
        self.catalog_cache.invalidate().await;
        Ok(updated)
    }

    async fn delete_hotel(&self, actor: Actor, hotel_id: i64) -> Result<(), HotelError> {
        self.managed_hotel(actor, hotel_id).await?;
        self.hotel_repo.delete(hotel_id).await?;
        self.catalog_cache.invalidate().await;

        info!(hotel_id, actor_id = actor.user_id, "Hotel deleted");
        Ok(())
    }

    async fn list_rooms(&self, hotel_id: i64) -> Result<Vec<Room>, HotelError> {
        self.find_hotel(hotel_id).await?;
        Ok(self.room_repo.list_by_hotel(hotel_id).await?)
    }

    async fn get_room(&self, room_id: i64) -> Result<Room, HotelError> {
        self.get_room_inner(room_id).await
    }

    async fn create_room(&self, actor: Actor, hotel_id: i64, request: CreateRoomDto) -> Result<Room, HotelError> {
        self.managed_hotel(actor, hotel_id).await?;

        let now = Utc::now();
        let room = Room {
            id: self.id_generator.generate(),
            hotel_id,
            name: request.name.trim().to_string(),
            description: request.description,
            price_per_night: request.price_per_night,
            base_price: request.base_price,
            capacity: request.capacity,
            created_at: now,
            updated_at: now,
        };

        let created = self.room_repo.create(&room).await?;
        self.catalog_cache.invalidate().await;
        info!(hotel_id, room_id = created.id, "Room created");
        Ok(created)
    }

    async fn update_room(&self, actor: Actor, room_id: i64, update: UpdateRoomDto) -> Result<Room, HotelError> {
        let mut room = self.managed_room(actor, room_id).await?;

        if let Some(name) = update.name {
            room.name = name.trim().to_string();
        }
        if update.description.is_some() {
            room.description = update.description;
        }
        if let Some(price) = update.price_per_night {
            room.price_per_night = price;
        }
        if let Some(base) = update.base_price {
            room.base_price = base;
        }
        if let Some(capacity) = update.capacity {
            room.capacity = capacity;
        }

        let updated = self.room_repo.update(&room).await?;
        self.catalog_cache.invalidate().await;
        Ok(updated)
    }

    async fn delete_room(&self, actor: Actor, room_id: i64) -> Result<(), HotelError> {
        let room = self.managed_room(actor, room_id).await?;
        self.room_repo.delete(room_id).await?;
        self.catalog_cache.invalidate().await;

        info!(hotel_id = room.hotel_id, room_id, "Room deleted");
        Ok(())
    }

    async fn list_services(&self, hotel_id: i64) -> Result<Vec<ServiceItem>, HotelError> {
        self.find_hotel(hotel_id).await?;
        Ok(self.service_repo.list_by_hotel(hotel_id).await?)
    }

    async fn get_service(&self, service_id: i64) -> Result<ServiceItem, HotelError> {
        self.get_service_inner(service_id).await
    }

    async fn create_service(
        &self,
        actor: Actor,
        hotel_id: i64,
        request: CreateServiceDto,
    ) -> Result<ServiceItem, HotelError> {
        self.managed_hotel(actor, hotel_id).await?;

        let item = ServiceItem {
            id: self.id_generator.generate(),
            hotel_id,
            name: request.name.trim().to_string(),
            description: request.description,
            price: request.price,
            created_at: Utc::now(),
        };

        let created = self.service_repo.create(&item).await?;
        self.catalog_cache.invalidate().await;
        Ok(created)
    }

    async fn update_service(
        &self,
        actor: Actor,
        service_id: i64,
        update: UpdateServiceDto,
    ) -> Result<ServiceItem, HotelError> {
        let mut item = self.managed_service(actor, service_id).await?;

        if let Some(name) = update.name {
            item.name = name.trim().to_string();
        }
        if update.description.is_some() {
            item.description = update.description;
        }
        if let Some(price) = update.price {
            item.price = price;
        }

        let updated = self.service_repo.update(&item).await?;
        self.catalog_cache.invalidate().await;
        Ok(updated)
    }

    async fn delete_service(&self, actor: Actor, service_id: i64) -> Result<(), HotelError> {
        self.managed_service(actor, service_id).await?;
        self.service_repo.delete(service_id).await?;
        self.catalog_cache.invalidate().await;
        Ok(())
    }
}
