//! Search, Recommendation and Catalog Handlers (public)

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use crate::application::dto::request::SearchParams;
use crate::application::dto::response::{
    CatalogHotelResponse, RecommendationResponse, SearchResultResponse,
};
use crate::application::services::{SearchQuery, SearchService, SearchServiceImpl};
use crate::infrastructure::repositories::{PgCatalogRepository, PgHotelRepository};
use crate::shared::error::AppError;
use crate::startup::AppState;

fn search_service(state: &AppState) -> SearchServiceImpl<PgCatalogRepository, PgHotelRepository> {
    SearchServiceImpl::new(
        Arc::new(PgCatalogRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        state.catalog_cache.clone(),
    )
}

/// Hotels in a city able to host the party, with room plans
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResultResponse>>, AppError> {
    let query = SearchQuery {
        city: params.city,
        start_date: params.start_date,
        end_date: params.end_date,
        guests: params.guests,
    };
    let results = search_service(&state).search(query).await?;
    Ok(Json(results.into_iter().map(Into::into).collect()))
}

pub async fn locations(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(search_service(&state).locations().await?))
}

pub async fn recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecommendationResponse>>, AppError> {
    let ranked = search_service(&state).recommendations().await?;
    Ok(Json(ranked.into_iter().map(Into::into).collect()))
}

pub async fn catalog(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogHotelResponse>>, AppError> {
    let hotels = search_service(&state).catalog().await?;
    Ok(Json(hotels.into_iter().map(Into::into).collect()))
}
