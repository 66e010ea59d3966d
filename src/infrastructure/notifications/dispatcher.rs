//! Background delivery of hotel webhooks.
//!
//! Request handlers enqueue through [`Notifier::notify`], which never blocks.
//! A worker task posts each notification to `{base_url}/{hotel_id}`, retrying
//! with the configured backoff; deliveries that exhaust their attempts are
//! parked in `pending_notifications` and re-sent by a periodic sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::NotificationSettings;
use crate::domain::{Notification, NotificationRepository, Notifier, PendingNotification};
use crate::infrastructure::metrics;
use crate::shared::snowflake::SnowflakeGenerator;

/// Rows re-sent per sweep
const SWEEP_BATCH: i64 = 100;

/// Handle used by services to enqueue notifications.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Start the delivery worker (and the retry sweep when delivery is enabled).
    pub fn spawn(
        settings: NotificationSettings,
        repository: Arc<dyn NotificationRepository>,
        ids: Arc<SnowflakeGenerator>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        let delivery = Arc::new(Delivery {
            client,
            settings,
            repository,
            ids,
            in_flight: DashMap::new(),
        });

        if delivery.settings.base_url.is_some() {
            tokio::spawn(retry_sweep(Arc::clone(&delivery)));
        } else {
            info!("No notification base URL configured; webhooks will be logged and dropped");
        }
        tokio::spawn(run_worker(delivery, rx));

        Self { tx }
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            let notification = match e {
                mpsc::error::TrySendError::Full(n) | mpsc::error::TrySendError::Closed(n) => n,
            };
            warn!(
                hotel_id = notification.hotel_id,
                event = notification.kind.as_str(),
                "Notification queue unavailable, dropping"
            );
            metrics::record_notification("dropped");
        }
    }
}

struct Delivery {
    client: reqwest::Client,
    settings: NotificationSettings,
    repository: Arc<dyn NotificationRepository>,
    ids: Arc<SnowflakeGenerator>,
    /// Hotels with a sync in flight; `true` means another sync arrived meanwhile.
    in_flight: DashMap<i64, bool>,
}

impl Delivery {
    fn endpoint(&self, hotel_id: i64) -> Option<String> {
        self.settings
            .base_url
            .as_deref()
            .map(|base| endpoint_for(base, hotel_id))
    }

    async fn post(&self, endpoint: &str, body: &serde_json::Value) -> Result<(), String> {
        self.client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    #[instrument(skip(self, notification), fields(hotel_id = notification.hotel_id, event = notification.kind.as_str()))]
    async fn deliver(&self, notification: &Notification) {
        let Some(endpoint) = self.endpoint(notification.hotel_id) else {
            debug!(payload = %notification.body(), "Webhook delivery disabled");
            metrics::record_notification("dropped");
            return;
        };

        let body = notification.body();
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.post(&endpoint, &body).await {
                Ok(()) => {
                    debug!(attempt, "Webhook delivered");
                    metrics::record_notification("delivered");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Webhook delivery failed");
                    last_error = e;
                    if attempt < max_attempts {
                        metrics::record_notification("retried");
                        tokio::time::sleep(self.settings.backoff_for(attempt)).await;
                    }
                }
            }
        }

        self.park(notification.hotel_id, endpoint, body, max_attempts, last_error)
            .await;
    }

    async fn park(
        &self,
        hotel_id: i64,
        endpoint: String,
        payload: serde_json::Value,
        tries: u32,
        last_error: String,
    ) {
        let now = chrono::Utc::now();
        let pending = PendingNotification {
            id: self.ids.generate(),
            hotel_id,
            endpoint,
            payload,
            tries: tries as i32,
            last_error: Some(last_error),
            created_at: now,
            updated_at: now,
        };

        match self.repository.store_pending(&pending).await {
            Ok(()) => {
                info!(hotel_id, pending_id = pending.id, "Webhook parked for retry");
                metrics::record_notification("parked");
            }
            Err(e) => {
                error!(hotel_id, error = %e, "Failed to park webhook");
                metrics::record_notification("dropped");
            }
        }
    }

    /// Deliver a coalesced sync, repeating once if another arrived while in flight.
    async fn deliver_coalesced(&self, notification: Notification) {
        loop {
            self.deliver(&notification).await;

            if self
                .in_flight
                .remove_if(&notification.hotel_id, |_, rerun| !*rerun)
                .is_some()
            {
                return;
            }
            match self.in_flight.get_mut(&notification.hotel_id) {
                Some(mut rerun) => *rerun = false,
                None => return,
            }
        }
    }

    /// Returns false when the notification was folded into an in-flight sync.
    fn claim(&self, notification: &Notification) -> bool {
        if !notification.kind.is_coalesced() {
            return true;
        }
        match self.in_flight.entry(notification.hotel_id) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                *entry.get_mut() = true;
                false
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(false);
                true
            }
        }
    }
}

fn endpoint_for(base_url: &str, hotel_id: i64) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), hotel_id)
}

async fn run_worker(delivery: Arc<Delivery>, mut rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        if !delivery.claim(&notification) {
            debug!(hotel_id = notification.hotel_id, "Sync coalesced with in-flight delivery");
            metrics::record_notification("coalesced");
            continue;
        }

        let delivery = Arc::clone(&delivery);
        tokio::spawn(async move {
            if notification.kind.is_coalesced() {
                delivery.deliver_coalesced(notification).await;
            } else {
                delivery.deliver(&notification).await;
            }
        });
    }
    debug!("Notification worker stopped");
}

async fn retry_sweep(delivery: Arc<Delivery>) {
    let period = Duration::from_secs(delivery.settings.retry_sweep_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        interval.tick().await;

        let pending = match delivery.repository.list_pending(SWEEP_BATCH).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Failed to load parked webhooks");
                continue;
            }
        };
        if pending.is_empty() {
            continue;
        }
        info!(count = pending.len(), "Re-sending parked webhooks");

        for row in pending {
            let outcome = match delivery.post(&row.endpoint, &row.payload).await {
                Ok(()) => delivery.repository.delete_pending(row.id).await.map(|_| "delivered"),
                Err(e) => delivery
                    .repository
                    .record_failure(row.id, &e)
                    .await
                    .map(|_| "retried"),
            };
            match outcome {
                Ok(outcome) => metrics::record_notification(outcome),
                Err(e) => warn!(pending_id = row.id, error = %e, "Failed to update parked webhook"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockNotificationRepository, NotificationKind};

    fn settings(base_url: Option<&str>) -> NotificationSettings {
        NotificationSettings {
            base_url: base_url.map(str::to_string),
            request_timeout_secs: 1,
            max_attempts: 2,
            backoff_secs: vec![0],
            retry_sweep_interval_secs: 300,
            queue_capacity: 8,
        }
    }

    fn delivery(base_url: Option<&str>, repository: MockNotificationRepository) -> Delivery {
        Delivery {
            client: reqwest::Client::new(),
            settings: settings(base_url),
            repository: Arc::new(repository),
            ids: Arc::new(SnowflakeGenerator::new(1)),
            in_flight: DashMap::new(),
        }
    }

    #[test]
    fn test_endpoint_joins_hotel_id() {
        assert_eq!(endpoint_for("http://hooks.local/", 42), "http://hooks.local/42");
        assert_eq!(endpoint_for("http://hooks.local", 7), "http://hooks.local/7");
    }

    #[test]
    fn test_sync_is_claimed_once_per_hotel() {
        let d = delivery(None, MockNotificationRepository::new());
        let sync = Notification::hotel_sync(1, "booking.created", None);

        assert!(d.claim(&sync));
        assert!(!d.claim(&sync));
        assert_eq!(d.in_flight.get(&1).map(|r| *r), Some(true));

        let other = Notification::hotel_sync(2, "booking.created", None);
        assert!(d.claim(&other));
    }

    #[test]
    fn test_invoice_notifications_are_never_coalesced() {
        let d = delivery(None, MockNotificationRepository::new());
        let sent = Notification {
            kind: NotificationKind::InvoiceSent,
            hotel_id: 1,
            payload: serde_json::json!({}),
        };
        assert!(d.claim(&sent));
        assert!(d.claim(&sent));
        assert!(d.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_delivery_does_not_park() {
        let mut repo = MockNotificationRepository::new();
        repo.expect_store_pending().never();

        let d = delivery(None, repo);
        d.deliver(&Notification::hotel_sync(1, "booking.created", None)).await;
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_parked() {
        let mut repo = MockNotificationRepository::new();
        repo.expect_store_pending()
            .withf(|p| p.hotel_id == 9 && p.tries == 2 && p.endpoint == "http://127.0.0.1:9/9")
            .times(1)
            .returning(|_| Ok(()));

        let d = delivery(Some("http://127.0.0.1:9"), repo);
        d.deliver(&Notification::hotel_sync(9, "booking.created", None)).await;
    }

    #[tokio::test]
    async fn test_coalesced_delivery_clears_in_flight() {
        let d = delivery(None, MockNotificationRepository::new());
        let sync = Notification::hotel_sync(3, "booking.created", None);

        assert!(d.claim(&sync));
        assert!(!d.claim(&sync));
        d.deliver_coalesced(sync).await;

        assert!(d.in_flight.is_empty());
    }
}
