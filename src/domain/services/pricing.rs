//! Price calculation for stays and invoices.
//!
//! All amounts are minor currency units. Arithmetic is checked; a result
//! that does not fit in `i64` is a [`PriceOverflow`].

use serde::Serialize;

use crate::domain::entities::{Room, ServiceItem};
use crate::shared::error::AppError;

/// Invoice amounts derived from a booking total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: i64,
    pub tax_rate: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
}

/// One printed invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub description: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("price is too large to calculate")]
pub struct PriceOverflow;

impl From<PriceOverflow> for AppError {
    fn from(err: PriceOverflow) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> Result<i64, PriceOverflow> {
    amounts
        .into_iter()
        .try_fold(0i64, |acc, x| acc.checked_add(x))
        .ok_or(PriceOverflow)
}

/// Split `target` in proportion to `weights`; the last share absorbs rounding.
///
/// Weights and target must not be negative, so no share is negative.
fn apportion(weights: &[i64], target: i64) -> Result<Vec<i64>, PriceOverflow> {
    let total = checked_sum(weights.iter().copied())?;
    let count = weights.len() as i64;
    let mut shares = Vec::with_capacity(weights.len());
    let mut allotted = 0i64;

    for (i, weight) in weights.iter().enumerate() {
        let share = if i + 1 == weights.len() {
            target - allotted
        } else if total == 0 {
            target / count
        } else {
            // i128 keeps the product of two i64 amounts in range
            ((*weight as i128 * target as i128) / total as i128) as i64
        };
        allotted += share;
        shares.push(share);
    }

    Ok(shares)
}

/// Domain service for stay and invoice pricing.
pub struct PricingService;

impl PricingService {
    /// Charge of one room for a stay: one-off base price plus nightly rate.
    pub fn room_charge(room: &Room, nights: i64) -> Result<i64, PriceOverflow> {
        room.price_per_night
            .checked_mul(nights)
            .and_then(|n| n.checked_add(room.base_price))
            .ok_or(PriceOverflow)
    }

    /// Booking total: every room for the stay plus each service once.
    pub fn booking_total(rooms: &[Room], services: &[ServiceItem], nights: i64) -> Result<i64, PriceOverflow> {
        let rooms_total = checked_sum(
            rooms
                .iter()
                .map(|r| Self::room_charge(r, nights))
                .collect::<Result<Vec<_>, _>>()?,
        )?;
        let services_total = checked_sum(services.iter().map(|s| s.price))?;
        rooms_total.checked_add(services_total).ok_or(PriceOverflow)
    }

    /// Tax rounded half up.
    pub fn tax(subtotal: i64, rate_percent: i64) -> Result<i64, PriceOverflow> {
        let raw = subtotal.checked_mul(rate_percent).ok_or(PriceOverflow)?;
        let rounded = if raw >= 0 {
            raw.checked_add(50).map(|r| r / 100)
        } else {
            raw.checked_neg()
                .and_then(|r| r.checked_add(50))
                .map(|r| -(r / 100))
        };
        rounded.ok_or(PriceOverflow)
    }

    pub fn invoice_totals(subtotal: i64, rate_percent: i64) -> Result<InvoiceTotals, PriceOverflow> {
        let tax_amount = Self::tax(subtotal, rate_percent)?;
        Ok(InvoiceTotals {
            subtotal,
            tax_rate: rate_percent,
            tax_amount,
            total_amount: subtotal.checked_add(tax_amount).ok_or(PriceOverflow)?,
        })
    }

    /// Invoice lines for a booking, adding up to `booked_total`.
    ///
    /// Current prices may differ from those at booking time. Services keep
    /// their current price and room lines share what is left. When services
    /// alone exceed the booked total, every line is scaled down instead.
    pub fn line_items(
        rooms: &[Room],
        services: &[ServiceItem],
        nights: i64,
        booked_total: i64,
    ) -> Result<Vec<LineItem>, PriceOverflow> {
        let booked_total = booked_total.max(0);
        let room_charges = rooms
            .iter()
            .map(|r| Self::room_charge(r, nights).map(|c| c.max(0)))
            .collect::<Result<Vec<_>, _>>()?;
        let service_prices: Vec<i64> = services.iter().map(|s| s.price.max(0)).collect();
        let services_total = checked_sum(service_prices.iter().copied())?;

        let (room_amounts, service_amounts) = if services_total <= booked_total {
            let rooms_target = booked_total - services_total;
            let room_amounts = if rooms.is_empty() {
                Vec::new()
            } else {
                apportion(&room_charges, rooms_target)?
            };
            (room_amounts, service_prices)
        } else {
            let weights: Vec<i64> = room_charges.iter().chain(&service_prices).copied().collect();
            let mut shares = apportion(&weights, booked_total)?;
            let service_amounts = shares.split_off(rooms.len());
            (shares, service_amounts)
        };

        let mut lines = Vec::with_capacity(rooms.len() + services.len());
        lines.extend(rooms.iter().zip(room_amounts).map(|(room, amount)| LineItem {
            description: format!("{} ({} nights)", room.name, nights),
            amount,
        }));
        lines.extend(services.iter().zip(service_amounts).map(|(s, amount)| LineItem {
            description: s.name.clone(),
            amount,
        }));

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn room(name: &str, base: i64, nightly: i64) -> Room {
        Room {
            name: name.into(),
            base_price: base,
            price_per_night: nightly,
            ..Room::default()
        }
    }

    fn service(name: &str, price: i64) -> ServiceItem {
        ServiceItem {
            id: 1,
            hotel_id: 1,
            name: name.into(),
            description: None,
            price,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_room_charge_and_total() {
        let rooms = vec![room("A", 1_000, 10_000), room("B", 0, 5_000)];
        let services = vec![service("Breakfast", 2_500)];

        assert_eq!(PricingService::room_charge(&rooms[0], 3), Ok(31_000));
        assert_eq!(
            PricingService::booking_total(&rooms, &services, 3),
            Ok(31_000 + 15_000 + 2_500)
        );
    }

    #[test_case(10_000, 27 => 2_700 ; "exact")]
    #[test_case(150, 27 => 41 ; "rounds up at half")]
    #[test_case(10, 27 => 3 ; "rounds 2.7 up")]
    #[test_case(1, 27 => 0 ; "rounds 0.27 down")]
    #[test_case(0, 27 => 0 ; "zero")]
    fn test_tax_half_up(subtotal: i64, rate: i64) -> i64 {
        PricingService::tax(subtotal, rate).unwrap()
    }

    #[test]
    fn test_invoice_totals() {
        let totals = PricingService::invoice_totals(48_500, 27).unwrap();
        assert_eq!(totals.tax_amount, 13_095);
        assert_eq!(totals.total_amount, 61_595);
    }

    #[test]
    fn test_line_items_match_current_prices() {
        let rooms = vec![room("Deluxe", 0, 10_000)];
        let services = vec![service("Parking", 1_000)];
        let lines = PricingService::line_items(&rooms, &services, 2, 21_000).unwrap();

        assert_eq!(
            lines,
            vec![
                LineItem { description: "Deluxe (2 nights)".into(), amount: 20_000 },
                LineItem { description: "Parking".into(), amount: 1_000 },
            ]
        );
    }

    #[test]
    fn test_line_items_scale_to_booked_total() {
        // Prices went up since booking; the invoice keeps the booked amount.
        let rooms = vec![room("A", 0, 10_000), room("B", 0, 20_000)];
        let lines = PricingService::line_items(&rooms, &[], 1, 10_001).unwrap();

        assert_eq!(lines[0].amount, 3_333);
        assert_eq!(lines[1].amount, 6_668);
        assert_eq!(lines.iter().map(|l| l.amount).sum::<i64>(), 10_001);
    }

    #[test]
    fn test_line_items_split_evenly_when_rooms_are_free() {
        let rooms = vec![room("A", 0, 0), room("B", 0, 0), room("C", 0, 0)];
        let lines = PricingService::line_items(&rooms, &[], 1, 100).unwrap();

        let amounts: Vec<i64> = lines.iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![33, 33, 34]);
    }

    #[test]
    fn test_services_above_booked_total_scale_every_line() {
        // Parking tripled since booking; no line may turn negative.
        let rooms = vec![room("A", 0, 1_000)];
        let services = vec![service("Parking", 3_000)];
        let lines = PricingService::line_items(&rooms, &services, 1, 2_000).unwrap();

        assert_eq!(lines[0].amount, 500);
        assert_eq!(lines[1].amount, 1_500);
        assert!(lines.iter().all(|l| l.amount >= 0));
        assert_eq!(lines.iter().map(|l| l.amount).sum::<i64>(), 2_000);
    }

    #[test]
    fn test_huge_nightly_rate_overflows() {
        let rooms = vec![room("Penthouse", 0, i64::MAX / 2 + 1)];
        assert_eq!(PricingService::booking_total(&rooms, &[], 2), Err(PriceOverflow));
        assert_eq!(PricingService::room_charge(&rooms[0], 2), Err(PriceOverflow));
        assert!(matches!(AppError::from(PriceOverflow), AppError::BadRequest(_)));
    }

    #[test_case(i64::MAX, 27 ; "tax product")]
    #[test_case(i64::MAX - 10, 1 ; "half up rounding")]
    #[test_case(i64::MAX - 100, 1 ; "total after tax")]
    fn test_invoice_totals_overflow(subtotal: i64, rate: i64) {
        assert_eq!(PricingService::invoice_totals(subtotal, rate), Err(PriceOverflow));
    }
}
