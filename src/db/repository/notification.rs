use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateNotification, Notification};
use crate::error::{AppError, AppResult};

// ============================================================================
// Notification store
// ============================================================================

pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(
        pool: &SqlitePool,
        notification: CreateNotification,
    ) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();

        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, recipient_id, notification_type, message, is_read, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING id, recipient_id, notification_type, message, is_read, created_at
            "#,
        )
        .bind(&id)
        .bind(&notification.recipient_id)
        .bind(&notification.notification_type)
        .bind(&notification.message)
        .bind(Utc::now().naive_utc())
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(created)
    }

    pub async fn list_for_recipient(
        pool: &SqlitePool,
        recipient_id: &str,
    ) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, recipient_id, notification_type, message, is_read, created_at
            FROM notifications
            WHERE recipient_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(notifications)
    }

    /// Marks a notification read; scoped to the recipient so one user cannot
    /// touch another's inbox.
    pub async fn mark_read(pool: &SqlitePool, id: &str, recipient_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = 1
            WHERE id = ? AND recipient_id = ?
            "#,
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }

        Ok(())
    }
}
