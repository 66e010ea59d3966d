//! Tag and Image Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AttachTagRequest, CreateImageRequest, LinkImageRequest, TagRequest,
};
use crate::application::dto::response::{ImageResponse, TagResponse, TagUsageResponse};
use crate::application::services::{TagService, TagServiceImpl};
use crate::infrastructure::repositories::{
    PgHotelRepository, PgImageRepository, PgRoomRepository, PgTagRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validate_body};
use crate::startup::AppState;

type Service = TagServiceImpl<PgTagRepository, PgImageRepository, PgHotelRepository, PgRoomRepository>;

fn tag_service(state: &AppState) -> Service {
    TagServiceImpl::new(
        Arc::new(PgTagRepository::new(state.db.clone())),
        Arc::new(PgImageRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        Arc::new(PgRoomRepository::new(state.db.clone())),
        state.catalog_cache.clone(),
        state.snowflake.clone(),
    )
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = tag_service(&state).list_tags().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// Tags with the number of hotels and rooms using them
pub async fn tag_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TagUsageResponse>>, AppError> {
    let usage = tag_service(&state).tag_usage(auth.actor()).await?;
    Ok(Json(usage.into_iter().map(Into::into).collect()))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<TagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), AppError> {
    validate_body(&body)?;
    let tag = tag_service(&state).create_tag(auth.actor(), &body.name).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

pub async fn rename_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(tag_id): Path<String>,
    Json(body): Json<TagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    validate_body(&body)?;
    let tag_id = parse_id(&tag_id, "tag ID")?;
    let tag = tag_service(&state)
        .rename_tag(auth.actor(), tag_id, &body.name)
        .await?;
    Ok(Json(tag.into()))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(tag_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let tag_id = parse_id(&tag_id, "tag ID")?;
    tag_service(&state).delete_tag(auth.actor(), tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_hotel_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(hotel_id): Path<String>,
    Json(body): Json<AttachTagRequest>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let tag_id = parse_id(&body.tag_id, "tag ID")?;
    let tags = tag_service(&state)
        .attach_hotel_tag(auth.actor(), hotel_id, tag_id)
        .await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

pub async fn detach_hotel_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((hotel_id, tag_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let hotel_id = parse_id(&hotel_id, "hotel ID")?;
    let tag_id = parse_id(&tag_id, "tag ID")?;
    tag_service(&state)
        .detach_hotel_tag(auth.actor(), hotel_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_room_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(body): Json<AttachTagRequest>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let tag_id = parse_id(&body.tag_id, "tag ID")?;
    let tags = tag_service(&state)
        .attach_room_tag(auth.actor(), room_id, tag_id)
        .await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

pub async fn detach_room_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((room_id, tag_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let tag_id = parse_id(&tag_id, "tag ID")?;
    tag_service(&state)
        .detach_room_tag(auth.actor(), room_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub async fn create_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateImageRequest>,
) -> Result<(StatusCode, Json<ImageResponse>), AppError> {
    validate_body(&body)?;
    let room_id = body
        .room_id
        .as_deref()
        .map(|id| parse_id(id, "room ID"))
        .transpose()?;

    let image = tag_service(&state)
        .create_image(auth.actor(), &body.url, room_id)
        .await?;
    Ok((StatusCode::CREATED, Json(image.into())))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<ImageResponse>, AppError> {
    let image_id = parse_id(&image_id, "image ID")?;
    let image = tag_service(&state).get_image(image_id).await?;
    Ok(Json(image.into()))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(image_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let image_id = parse_id(&image_id, "image ID")?;
    tag_service(&state).delete_image(auth.actor(), image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn room_images(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let images = tag_service(&state).room_images(room_id).await?;
    Ok(Json(images.into_iter().map(Into::into).collect()))
}

pub async fn link_room_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<String>,
    Json(body): Json<LinkImageRequest>,
) -> Result<Json<Vec<ImageResponse>>, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let image_id = parse_id(&body.image_id, "image ID")?;
    let images = tag_service(&state)
        .link_room_image(auth.actor(), room_id, image_id)
        .await?;
    Ok(Json(images.into_iter().map(Into::into).collect()))
}

pub async fn unlink_room_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((room_id, image_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let room_id = parse_id(&room_id, "room ID")?;
    let image_id = parse_id(&image_id, "image ID")?;
    tag_service(&state)
        .unlink_room_image(auth.actor(), room_id, image_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
