//! Search Service
//!
//! Public discovery: availability search with room plans, locations,
//! recommendations and the full catalog.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use crate::domain::services::{rank_hotels, RankedHotel, ReservationError, StayPlan, StayPlanner};
use crate::domain::{CatalogHotel, CatalogRepository, Hotel, HotelRepository, StayPeriod};
use crate::infrastructure::cache::{keys, CatalogCache};
use crate::shared::error::AppError;

const RECOMMENDATION_LIMIT: usize = 10;

/// Search service trait
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>, SearchError>;

    async fn locations(&self) -> Result<Vec<String>, SearchError>;

    async fn recommendations(&self) -> Result<Vec<RankedHotel>, SearchError>;

    async fn catalog(&self) -> Result<Vec<CatalogHotel>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: u32,
}

/// A hotel that can host the party, with its best room plans.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub hotel: Hotel,
    pub nights: i64,
    pub plans: Vec<StayPlan>,
}

/// Search service errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Rule(#[from] ReservationError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Invalid(msg) => AppError::BadRequest(msg),
            SearchError::Rule(e) => e.into(),
            SearchError::Repository(e) => e,
        }
    }
}

/// SearchService implementation
pub struct SearchServiceImpl<C, H>
where
    C: CatalogRepository,
    H: HotelRepository,
{
    catalog_repo: Arc<C>,
    hotel_repo: Arc<H>,
    catalog_cache: CatalogCache,
    planner: StayPlanner,
}

impl<C, H> SearchServiceImpl<C, H>
where
    C: CatalogRepository,
    H: HotelRepository,
{
    pub fn new(catalog_repo: Arc<C>, hotel_repo: Arc<H>, catalog_cache: CatalogCache) -> Self {
        Self {
            catalog_repo,
            hotel_repo,
            catalog_cache,
            planner: StayPlanner::default(),
        }
    }
}

#[async_trait]
impl<C, H> SearchService for SearchServiceImpl<C, H>
where
    C: CatalogRepository + 'static,
    H: HotelRepository + 'static,
{
    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        let city = query.city.trim();
        if city.is_empty() {
            return Err(SearchError::Invalid("city is required".into()));
        }
        if query.guests == 0 {
            return Err(SearchError::Invalid("guests must be at least 1".into()));
        }
        let period = StayPeriod::new(query.start_date, query.end_date).map_err(ReservationError::from)?;
        let nights = period.nights();

        let candidates = self.catalog_repo.search_candidates(city, period).await?;
        let considered = candidates.len();

        let results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let plans = self.planner.plan(&candidate.free_rooms, query.guests, nights);
                (!plans.is_empty()).then_some(SearchResult {
                    hotel: candidate.hotel,
                    nights,
                    plans,
                })
            })
            .collect();

        debug!(city, guests = query.guests, considered, matched = results.len(), "Search completed");
        Ok(results)
    }

    async fn locations(&self) -> Result<Vec<String>, SearchError> {
        Ok(self.hotel_repo.locations().await?)
    }

    async fn recommendations(&self) -> Result<Vec<RankedHotel>, SearchError> {
        if let Some(cached) = self.catalog_cache.get(keys::RECOMMENDATIONS).await {
            return Ok(cached);
        }

        let candidates = self.catalog_repo.recommendation_candidates().await?;
        let ranked = rank_hotels(candidates, RECOMMENDATION_LIMIT);
        self.catalog_cache.put(keys::RECOMMENDATIONS, &ranked).await;
        Ok(ranked)
    }

    async fn catalog(&self) -> Result<Vec<CatalogHotel>, SearchError> {
        if let Some(cached) = self.catalog_cache.get(keys::CATALOG).await {
            return Ok(cached);
        }

        let catalog = self.catalog_repo.catalog().await?;
        self.catalog_cache.put(keys::CATALOG, &catalog).await;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockCatalogRepository, MockHotelRepository, RecommendationCandidate, Room, SearchCandidate,
    };

    fn service(catalog: MockCatalogRepository) -> SearchServiceImpl<MockCatalogRepository, MockHotelRepository> {
        SearchServiceImpl::new(
            Arc::new(catalog),
            Arc::new(MockHotelRepository::new()),
            CatalogCache::disabled(),
        )
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, day).unwrap()
    }

    fn room(id: i64, capacity: i32) -> Room {
        Room {
            id,
            hotel_id: 1,
            name: format!("Room {}", id),
            price_per_night: 10_000,
            capacity,
            ..Room::default()
        }
    }

    fn query(guests: u32) -> SearchQuery {
        SearchQuery {
            city: " Szeged ".into(),
            start_date: d(1),
            end_date: d(3),
            guests,
        }
    }

    #[tokio::test]
    async fn test_hotels_without_plan_are_omitted() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_search_candidates()
            .withf(|city, period| city == "Szeged" && period.nights() == 2)
            .returning(|_, _| {
                Ok(vec![
                    SearchCandidate {
                        hotel: Hotel {
                            id: 1,
                            ..Hotel::default()
                        },
                        free_rooms: vec![room(1, 2), room(2, 2)],
                    },
                    SearchCandidate {
                        hotel: Hotel {
                            id: 2,
                            ..Hotel::default()
                        },
                        free_rooms: vec![room(3, 1)],
                    },
                ])
            });

        let results = service(catalog).search(query(3)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hotel.id, 1);
        assert_eq!(results[0].nights, 2);
        assert!(!results[0].plans.is_empty());
    }

    #[tokio::test]
    async fn test_search_validates_input() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_search_candidates().never();
        let service = service(catalog);

        assert!(matches!(service.search(query(0)).await, Err(SearchError::Invalid(_))));

        let mut inverted = query(1);
        inverted.end_date = d(1);
        let err = service.search(inverted).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_recommendations_are_limited() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_recommendation_candidates().returning(|| {
            Ok((1..=15)
                .map(|id| RecommendationCandidate {
                    hotel: Hotel {
                        id,
                        ..Hotel::default()
                    },
                    min_price: Some(id * 1_000),
                    popularity: id,
                    cover_image: None,
                    tags: vec![],
                })
                .collect())
        });

        let ranked = service(catalog).recommendations().await.unwrap();
        assert_eq!(ranked.len(), RECOMMENDATION_LIMIT);
    }
}
