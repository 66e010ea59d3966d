//! Date intervals used by bookings and key assignments.
//!
//! Both are half-open: a stay from the 1st to the 3rd occupies the nights of
//! the 1st and the 2nd, and the room is free again for a check-in on the 3rd.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors raised while building an interval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("end date {end} must be after start date {start}")]
    EndNotAfterStart { start: NaiveDate, end: NaiveDate },
}

/// A booked stay `[start, end)`, at least one night long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl StayPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if end <= start {
            return Err(PeriodError::EndNotAfterStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights, always >= 1.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &StayPeriod) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Reservation window of a key assignment. `to = None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentWindow {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl AssignmentWindow {
    pub fn bounded(period: StayPeriod) -> Self {
        Self {
            from: period.start(),
            to: Some(period.end()),
        }
    }

    pub fn open_ended(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    /// Rebuild from stored columns; an empty or inverted bounded range is rejected.
    pub fn from_parts(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self, PeriodError> {
        match to {
            Some(end) if end <= from => Err(PeriodError::EndNotAfterStart { start: from, end }),
            _ => Ok(Self { from, to }),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.to.is_none()
    }

    pub fn overlaps(&self, other: &AssignmentWindow) -> bool {
        let self_ends_after = other.to.map_or(true, |end| self.from < end);
        let other_ends_after = self.to.map_or(true, |end| other.from < end);
        self_ends_after && other_ends_after
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from <= date && self.to.map_or(true, |end| date < end)
    }

    /// Whether the window intersects the query range `[from, to)`.
    pub fn intersects(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.from < to && self.to.map_or(true, |end| from < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn test_period_requires_end_after_start() {
        assert!(StayPeriod::new(d(5), d(5)).is_err());
        assert!(StayPeriod::new(d(6), d(5)).is_err());
        assert_eq!(StayPeriod::new(d(5), d(8)).unwrap().nights(), 3);
    }

    #[test_case(1, 3, 3, 5, false ; "back to back stays do not overlap")]
    #[test_case(1, 4, 3, 5, true ; "one shared night overlaps")]
    #[test_case(2, 3, 1, 5, true ; "contained stay overlaps")]
    #[test_case(5, 7, 1, 5, false ; "stay after checkout does not overlap")]
    fn test_period_overlap(a1: u32, a2: u32, b1: u32, b2: u32, expected: bool) {
        let a = StayPeriod::new(d(a1), d(a2)).unwrap();
        let b = StayPeriod::new(d(b1), d(b2)).unwrap();
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    #[test]
    fn test_period_contains_is_half_open() {
        let p = StayPeriod::new(d(1), d(3)).unwrap();
        assert!(p.contains(d(1)));
        assert!(p.contains(d(2)));
        assert!(!p.contains(d(3)));
    }

    #[test]
    fn test_open_ended_window_overlaps_everything_after_start() {
        let lifetime = AssignmentWindow::open_ended(d(10));
        let before = AssignmentWindow::bounded(StayPeriod::new(d(1), d(10)).unwrap());
        let after = AssignmentWindow::bounded(StayPeriod::new(d(20), d(25)).unwrap());
        assert!(!lifetime.overlaps(&before));
        assert!(lifetime.overlaps(&after));
        assert!(lifetime.overlaps(&AssignmentWindow::open_ended(d(1))));
        assert!(lifetime.covers(d(28)));
        assert!(!lifetime.covers(d(9)));
    }

    #[test]
    fn test_window_intersects_query_range() {
        let w = AssignmentWindow::bounded(StayPeriod::new(d(5), d(8)).unwrap());
        assert!(w.intersects(d(1), d(6)));
        assert!(!w.intersects(d(8), d(12)));
        assert!(!w.intersects(d(1), d(5)));
    }

    #[test]
    fn test_from_parts_rejects_empty_range() {
        assert!(AssignmentWindow::from_parts(d(5), Some(d(5))).is_err());
        assert!(AssignmentWindow::from_parts(d(5), None).unwrap().is_open_ended());
    }
}
