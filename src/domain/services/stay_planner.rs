//! Room combination planning for search results.

use serde::Serialize;

use super::pricing::PricingService;
use crate::domain::entities::Room;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanLabel {
    Recommended,
    Cheapest,
    Alternative,
}

impl PlanLabel {
    fn for_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Recommended,
            1 => Self::Cheapest,
            _ => Self::Alternative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRoom {
    pub room_id: i64,
    pub name: String,
    pub capacity: i32,
    /// Charge for the whole stay
    pub price: i64,
}

/// A set of rooms that together sleep the requested party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StayPlan {
    pub label: PlanLabel,
    pub room_count: usize,
    pub capacity: i32,
    pub total_price: i64,
    pub rooms: Vec<PlannedRoom>,
}

/// Depth-first search over free rooms, bounded in both breadth and output.
#[derive(Debug, Clone, Copy)]
pub struct StayPlanner {
    max_rooms: usize,
    max_candidates: usize,
    max_plans: usize,
}

impl Default for StayPlanner {
    fn default() -> Self {
        Self {
            max_rooms: 24,
            max_candidates: 512,
            max_plans: 3,
        }
    }
}

impl StayPlanner {
    pub fn new(max_rooms: usize, max_candidates: usize, max_plans: usize) -> Self {
        Self {
            max_rooms,
            max_candidates,
            max_plans,
        }
    }

    /// Best plans for `guests` people staying `nights` nights.
    ///
    /// Plans are distinct by (total price, room count) and ordered by room
    /// count, then price.
    pub fn plan(&self, rooms: &[Room], guests: u32, nights: i64) -> Vec<StayPlan> {
        if guests == 0 || rooms.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<&Room> = rooms.iter().filter(|r| r.capacity > 0).collect();
        sorted.sort_by(|a, b| b.capacity.cmp(&a.capacity).then(a.id.cmp(&b.id)));
        sorted.truncate(self.max_rooms);

        // remaining[i] = capacity of sorted[i..]
        let mut remaining = vec![0i64; sorted.len() + 1];
        for i in (0..sorted.len()).rev() {
            remaining[i] = remaining[i + 1] + sorted[i].capacity as i64;
        }

        let mut search = Search {
            rooms: &sorted,
            remaining: &remaining,
            guests: guests as i64,
            limit: self.max_candidates,
            found: Vec::new(),
            current: Vec::new(),
        };
        search.walk(0, 0);

        // Combinations whose price cannot be represented are dropped
        let mut candidates: Vec<(i64, Vec<(&Room, i64)>)> = search
            .found
            .into_iter()
            .filter_map(|combo| {
                let priced = combo
                    .into_iter()
                    .map(|r| PricingService::room_charge(r, nights).ok().map(|p| (r, p)))
                    .collect::<Option<Vec<_>>>()?;
                let total = priced
                    .iter()
                    .try_fold(0i64, |acc, (_, p)| acc.checked_add(*p))?;
                Some((total, priced))
            })
            .collect();

        candidates.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then(a.0.cmp(&b.0)));
        candidates.dedup_by(|a, b| a.0 == b.0 && a.1.len() == b.1.len());

        candidates
            .into_iter()
            .take(self.max_plans)
            .enumerate()
            .map(|(rank, (total_price, combo))| StayPlan {
                label: PlanLabel::for_rank(rank),
                room_count: combo.len(),
                capacity: combo.iter().map(|(r, _)| r.capacity).sum(),
                total_price,
                rooms: combo
                    .iter()
                    .map(|(r, price)| PlannedRoom {
                        room_id: r.id,
                        name: r.name.clone(),
                        capacity: r.capacity,
                        price: *price,
                    })
                    .collect(),
            })
            .collect()
    }
}

struct Search<'a> {
    rooms: &'a [&'a Room],
    remaining: &'a [i64],
    guests: i64,
    limit: usize,
    found: Vec<Vec<&'a Room>>,
    current: Vec<&'a Room>,
}

impl<'a> Search<'a> {
    fn walk(&mut self, index: usize, capacity: i64) {
        if self.found.len() >= self.limit {
            return;
        }
        if capacity >= self.guests {
            self.found.push(self.current.clone());
            return;
        }
        if capacity + self.remaining[index] < self.guests {
            return;
        }
        for i in index..self.rooms.len() {
            self.current.push(self.rooms[i]);
            self.walk(i + 1, capacity + self.rooms[i].capacity as i64);
            self.current.pop();
            if self.found.len() >= self.limit {
                return;
            }
        }
    }
}
