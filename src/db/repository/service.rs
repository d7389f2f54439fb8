use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateService, Service, UpdateService};
use crate::error::{AppError, AppResult};

// ============================================================================
// Service catalog
// ============================================================================

pub struct ServiceRepository;

impl ServiceRepository {
    pub async fn create(pool: &SqlitePool, service: CreateService) -> AppResult<Service> {
        if service.name.trim().is_empty() {
            return Err(AppError::Validation("Service name is required".to_string()));
        }
        if service.duration_minutes <= 0 {
            return Err(AppError::Validation(
                "Service duration must be at least one minute".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let created = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (id, name, price, duration_minutes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, price, duration_minutes, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(service.name.trim())
        .bind(&service.price)
        .bind(service.duration_minutes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, name, price, duration_minutes, created_at, updated_at
            FROM services
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(service)
    }

    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, name, price, duration_minutes, created_at, updated_at
            FROM services
            ORDER BY name ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(services)
    }

    pub async fn update(pool: &SqlitePool, id: &str, update: UpdateService) -> AppResult<Service> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", id)))?;

        let name = update.name.unwrap_or(existing.name);
        let price = update.price.or(existing.price);
        let duration_minutes = update.duration_minutes.unwrap_or(existing.duration_minutes);

        if name.trim().is_empty() {
            return Err(AppError::Validation("Service name is required".to_string()));
        }
        if duration_minutes <= 0 {
            return Err(AppError::Validation(
                "Service duration must be at least one minute".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = ?, price = ?, duration_minutes = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, price, duration_minutes, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&price)
        .bind(duration_minutes)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(updated)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service {} not found", id)));
        }

        Ok(())
    }
}
