use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::CreateNotification;
use crate::db::repository::NotificationRepository;
use crate::error::AppResult;

/// Domain events the booking engine emits after a successful commit.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    BookingConfirmed {
        appointment_id: String,
        recipient_id: String,
    },
    BookingCancelled {
        appointment_id: String,
        recipient_id: String,
    },
}

impl DomainEvent {
    pub fn to_notification(&self) -> CreateNotification {
        match self {
            DomainEvent::BookingConfirmed {
                appointment_id,
                recipient_id,
            } => CreateNotification {
                recipient_id: recipient_id.clone(),
                notification_type: "BOOKING_CONFIRMATION".to_string(),
                message: format!("Your appointment {} has been confirmed.", appointment_id),
            },
            DomainEvent::BookingCancelled {
                appointment_id,
                recipient_id,
            } => CreateNotification {
                recipient_id: recipient_id.clone(),
                notification_type: "CANCELLATION".to_string(),
                message: format!("Your appointment {} has been cancelled.", appointment_id),
            },
        }
    }
}

/// Delivery seam. The core hands events over and moves on; a sink failure is
/// the sink's problem, never the booking's.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, notification: CreateNotification) -> AppResult<()>;
}

/// Default sink: persists to the `notifications` table for the in-app inbox.
pub struct InboxSink {
    pool: SqlitePool,
}

impl InboxSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for InboxSink {
    async fn deliver(&self, notification: CreateNotification) -> AppResult<()> {
        NotificationRepository::create(&self.pool, notification).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            sink: Arc::new(InboxSink::new(pool)),
        }
    }

    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Fire-and-forget dispatch: spawns the delivery, logs failures.
    pub fn dispatch(&self, event: DomainEvent) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let notification = event.to_notification();
            if let Err(e) = sink.deliver(notification).await {
                tracing::warn!("Notification delivery failed for {:?}: {}", event, e);
            }
        });
    }

    /// Synchronous variant so tests can assert on the delivery result
    /// without racing the spawned task.
    #[cfg(test)]
    pub async fn deliver_now(&self, event: DomainEvent) -> AppResult<()> {
        self.sink.deliver(event.to_notification()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::test_pool;
    use std::sync::Mutex;

    struct RecordingSink {
        delivered: Mutex<Vec<CreateNotification>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: CreateNotification) -> AppResult<()> {
            self.delivered.lock().unwrap().push(notification);
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_render_their_notification_shape() {
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
        });
        let service = NotificationService::with_sink(sink.clone());

        service
            .deliver_now(DomainEvent::BookingConfirmed {
                appointment_id: "appt-1".to_string(),
                recipient_id: "cust-1".to_string(),
            })
            .await
            .unwrap();
        service
            .deliver_now(DomainEvent::BookingCancelled {
                appointment_id: "appt-1".to_string(),
                recipient_id: "cust-1".to_string(),
            })
            .await
            .unwrap();

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].notification_type, "BOOKING_CONFIRMATION");
        assert_eq!(delivered[0].recipient_id, "cust-1");
        assert_eq!(delivered[1].notification_type, "CANCELLATION");
    }

    #[tokio::test]
    async fn inbox_sink_lands_in_the_notifications_table() {
        let pool = test_pool().await;
        let service = NotificationService::new(pool.clone());

        service
            .deliver_now(DomainEvent::BookingConfirmed {
                appointment_id: "appt-1".to_string(),
                recipient_id: "cust-1".to_string(),
            })
            .await
            .unwrap();

        let inbox = NotificationRepository::list_for_recipient(&pool, "cust-1")
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].is_read);
    }
}
