//! Recommendation scoring.

use serde::{Deserialize, Serialize};

use crate::domain::entities::RecommendationCandidate;

const STAR_WEIGHT: f64 = 0.4;
const POPULARITY_WEIGHT: f64 = 0.35;
const PRICE_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHotel {
    pub candidate: RecommendationCandidate,
    pub score: f64,
}

/// Rank hotels by stars, popularity and price relative to the other candidates.
///
/// Each component is normalised to 0..=1 before weighting. A hotel without
/// rooms gets no price credit.
pub fn rank_hotels(candidates: Vec<RecommendationCandidate>, limit: usize) -> Vec<RankedHotel> {
    let max_popularity = candidates.iter().map(|c| c.popularity).max().unwrap_or(0);
    let prices: Vec<i64> = candidates.iter().filter_map(|c| c.min_price).collect();
    let cheapest = prices.iter().copied().min().unwrap_or(0);
    let dearest = prices.iter().copied().max().unwrap_or(0);

    let mut ranked: Vec<RankedHotel> = candidates
        .into_iter()
        .map(|candidate| {
            let stars = candidate.hotel.star_rating.unwrap_or(0).clamp(0, 5) as f64 / 5.0;
            let popularity = if max_popularity > 0 {
                candidate.popularity as f64 / max_popularity as f64
            } else {
                0.0
            };
            let price = match candidate.min_price {
                Some(_) if dearest == cheapest => 1.0,
                Some(p) => 1.0 - (p - cheapest) as f64 / (dearest - cheapest) as f64,
                None => 0.0,
            };
            let score =
                stars * STAR_WEIGHT + popularity * POPULARITY_WEIGHT + price * PRICE_WEIGHT;
            RankedHotel { candidate, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.candidate.hotel.id.cmp(&b.candidate.hotel.id))
    });
    ranked.truncate(limit);
    ranked
}
