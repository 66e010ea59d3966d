//! Outbound hotel notifications and the parking table for failed deliveries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Kind of webhook sent to a hotel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Booking data of the hotel changed; the hotel should re-sync.
    #[serde(rename = "hotel.sync")]
    HotelSync,
    /// An invoice was issued to a guest.
    #[serde(rename = "invoice.sent")]
    InvoiceSent,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HotelSync => "hotel.sync",
            Self::InvoiceSent => "invoice.sent",
        }
    }

    /// Sync pings carry no data beyond the hotel, so concurrent ones collapse.
    pub fn is_coalesced(&self) -> bool {
        matches!(self, Self::HotelSync)
    }
}

/// A notification addressed to a hotel's endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub hotel_id: i64,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn hotel_sync(hotel_id: i64, reason: &str, booking_id: Option<i64>) -> Self {
        Self {
            kind: NotificationKind::HotelSync,
            hotel_id,
            payload: serde_json::json!({
                "reason": reason,
                "booking_id": booking_id.map(|id| id.to_string()),
            }),
        }
    }

    /// Asks the hotel to deliver an issued invoice to the guest.
    pub fn invoice_sent(hotel_id: i64, booking_id: i64, invoice_number: &str, email: &str) -> Self {
        Self {
            kind: NotificationKind::InvoiceSent,
            hotel_id,
            payload: serde_json::json!({
                "booking_id": booking_id.to_string(),
                "invoice_number": invoice_number,
                "email": email,
            }),
        }
    }

    /// Full JSON body posted to the endpoint.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "event": self.kind.as_str(),
            "hotel_id": self.hotel_id.to_string(),
            "data": self.payload,
        })
    }
}

/// Sink for notifications; implementations must not block the caller.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// A delivery that exhausted its attempts, kept for the retry sweep.
///
/// Maps to the `pending_notifications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: i64,
    pub hotel_id: i64,
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub tries: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn store_pending(&self, pending: &PendingNotification) -> Result<(), AppError>;

    async fn list_pending(&self, limit: i64) -> Result<Vec<PendingNotification>, AppError>;

    async fn delete_pending(&self, id: i64) -> Result<(), AppError>;

    async fn record_failure(&self, id: i64, error: &str) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_shape() {
        let n = Notification::hotel_sync(42, "booking.created", Some(7));
        let body = n.body();
        assert_eq!(body["event"], "hotel.sync");
        assert_eq!(body["hotel_id"], "42");
        assert_eq!(body["data"]["booking_id"], "7");
        assert_eq!(body["data"]["reason"], "booking.created");
    }

    #[test]
    fn test_invoice_sent_addresses_guest() {
        let body = Notification::invoice_sent(3, 9, "SZ000001/2026", "guest@example.com").body();
        assert_eq!(body["event"], "invoice.sent");
        assert_eq!(body["data"]["email"], "guest@example.com");
        assert_eq!(body["data"]["booking_id"], "9");
    }

    #[test]
    fn test_only_sync_is_coalesced() {
        assert!(NotificationKind::HotelSync.is_coalesced());
        assert!(!NotificationKind::InvoiceSent.is_coalesced());
    }
}
