use chrono::{NaiveDate, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::db::models::{CreateTimeSlot, TimeSlot, UpdateTimeSlot};
use crate::error::{AppError, AppResult};

// ============================================================================
// Slot Ledger
// ============================================================================
//
// Owns the `time_slots` table. The `is_booked` flag is flipped only through
// `mark_booked` / `mark_free`, which the booking engine calls on its own
// transaction so the flag write commits or rolls back together with the
// appointment write.

pub struct TimeSlotRepository;

impl TimeSlotRepository {
    pub async fn create(pool: &SqlitePool, slot: CreateTimeSlot) -> AppResult<TimeSlot> {
        if slot.end_time <= slot.start_time {
            return Err(AppError::Validation(
                "Slot end time must be after its start time".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let created = sqlx::query_as::<_, TimeSlot>(
            r#"
            INSERT INTO time_slots (id, employee_id, date, start_time, end_time, is_booked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING id, employee_id, date, start_time, end_time, is_booked, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&slot.employee_id)
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "A slot with the same employee, date and time already exists".to_string(),
            ),
            _ => AppError::Database(e),
        })?;

        Ok(created)
    }

    pub async fn find_by_id(
        executor: impl SqliteExecutor<'_>,
        id: &str,
    ) -> AppResult<Option<TimeSlot>> {
        let slot = sqlx::query_as::<_, TimeSlot>(
            r#"
            SELECT id, employee_id, date, start_time, end_time, is_booked, created_at, updated_at
            FROM time_slots
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(slot)
    }

    /// Unbooked slots, optionally filtered by employee and/or date, union'd
    /// with the slot named by `including_slot_id` even though it is booked.
    /// An edit session passes its own held slot there so the user can keep it.
    /// Ordered (date, start_time) ascending for deterministic display.
    pub async fn list_available(
        pool: &SqlitePool,
        employee_id: Option<&str>,
        date: Option<NaiveDate>,
        including_slot_id: Option<&str>,
    ) -> AppResult<Vec<TimeSlot>> {
        let slots = sqlx::query_as::<_, TimeSlot>(
            r#"
            SELECT id, employee_id, date, start_time, end_time, is_booked, created_at, updated_at
            FROM time_slots
            WHERE (is_booked = 0 OR id = ?)
              AND (? IS NULL OR employee_id = ?)
              AND (? IS NULL OR date = ?)
            ORDER BY date ASC, start_time ASC
            "#,
        )
        .bind(including_slot_id)
        .bind(employee_id)
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(slots)
    }

    /// Compare-and-set the booked flag. Fails with `AlreadyBooked` when the
    /// slot is gone or already held: the engine has already checked, but the
    /// ledger re-validates at commit time to close the lost-update window.
    pub async fn mark_booked(executor: impl SqliteExecutor<'_>, id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE time_slots
            SET is_booked = 1, updated_at = ?
            WHERE id = ? AND is_booked = 0
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyBooked(id.to_string()));
        }

        Ok(())
    }

    /// Idempotent release; freeing an already-free slot is a no-op.
    pub async fn mark_free(executor: impl SqliteExecutor<'_>, id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE time_slots
            SET is_booked = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Staff edit of the slot's own time bounds. Rejected while booked so a
    /// customer's commitment is never silently moved.
    pub async fn update_bounds(
        pool: &SqlitePool,
        id: &str,
        update: UpdateTimeSlot,
    ) -> AppResult<TimeSlot> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", id)))?;

        if existing.is_booked {
            return Err(AppError::Conflict(
                "Cannot edit a slot that is currently booked".to_string(),
            ));
        }

        let date = update.date.unwrap_or(existing.date);
        let start_time = update.start_time.unwrap_or(existing.start_time);
        let end_time = update.end_time.unwrap_or(existing.end_time);

        if end_time <= start_time {
            return Err(AppError::Validation(
                "Slot end time must be after its start time".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, TimeSlot>(
            r#"
            UPDATE time_slots
            SET date = ?, start_time = ?, end_time = ?, updated_at = ?
            WHERE id = ? AND is_booked = 0
            RETURNING id, employee_id, date, start_time, end_time, is_booked, created_at, updated_at
            "#,
        )
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "A slot with the same employee, date and time already exists".to_string(),
            ),
            _ => AppError::Database(e),
        })?;

        // The booked re-check in the WHERE clause can race us to zero rows.
        updated.ok_or(AppError::Conflict(
            "Cannot edit a slot that is currently booked".to_string(),
        ))
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", id)))?;

        if existing.is_booked {
            return Err(AppError::Conflict(
                "Cannot delete a slot that is currently booked".to_string(),
            ));
        }

        sqlx::query("DELETE FROM time_slots WHERE id = ? AND is_booked = 0")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{seed_employee, test_pool};
    use chrono::{NaiveDate, NaiveTime};

    fn slot_input(employee_id: &str) -> CreateTimeSlot {
        CreateTimeSlot {
            employee_id: employee_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_slot_tuple_is_a_conflict() {
        let pool = test_pool().await;
        let employee = seed_employee(&pool, "Erin").await;

        TimeSlotRepository::create(&pool, slot_input(&employee.id))
            .await
            .unwrap();
        let err = TimeSlotRepository::create(&pool, slot_input(&employee.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn inverted_bounds_are_rejected() {
        let pool = test_pool().await;
        let employee = seed_employee(&pool, "Erin").await;

        let mut input = slot_input(&employee.id);
        input.end_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let err = TimeSlotRepository::create(&pool, input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn mark_booked_is_a_compare_and_set() {
        let pool = test_pool().await;
        let employee = seed_employee(&pool, "Erin").await;
        let slot = TimeSlotRepository::create(&pool, slot_input(&employee.id))
            .await
            .unwrap();

        TimeSlotRepository::mark_booked(&pool, &slot.id)
            .await
            .unwrap();
        let err = TimeSlotRepository::mark_booked(&pool, &slot.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyBooked(_)));

        // mark_free is idempotent
        TimeSlotRepository::mark_free(&pool, &slot.id).await.unwrap();
        TimeSlotRepository::mark_free(&pool, &slot.id).await.unwrap();
        let slot = TimeSlotRepository::find_by_id(&pool, &slot.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!slot.is_booked);
    }

    #[tokio::test]
    async fn booked_slot_bounds_cannot_be_edited_or_deleted() {
        let pool = test_pool().await;
        let employee = seed_employee(&pool, "Erin").await;
        let slot = TimeSlotRepository::create(&pool, slot_input(&employee.id))
            .await
            .unwrap();
        TimeSlotRepository::mark_booked(&pool, &slot.id)
            .await
            .unwrap();

        let update = UpdateTimeSlot {
            date: None,
            start_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
            end_time: Some(NaiveTime::from_hms_opt(10, 30, 0).unwrap()),
        };
        let err = TimeSlotRepository::update_bounds(&pool, &slot.id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = TimeSlotRepository::delete(&pool, &slot.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_available_unions_the_held_slot() {
        let pool = test_pool().await;
        let employee = seed_employee(&pool, "Erin").await;
        let held = TimeSlotRepository::create(&pool, slot_input(&employee.id))
            .await
            .unwrap();
        let mut later = slot_input(&employee.id);
        later.start_time = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        later.end_time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        let free = TimeSlotRepository::create(&pool, later).await.unwrap();

        TimeSlotRepository::mark_booked(&pool, &held.id)
            .await
            .unwrap();

        let open = TimeSlotRepository::list_available(&pool, Some(&employee.id), None, None)
            .await
            .unwrap();
        assert_eq!(
            open.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec![free.id.as_str()]
        );

        let with_held =
            TimeSlotRepository::list_available(&pool, Some(&employee.id), None, Some(&held.id))
                .await
                .unwrap();
        assert_eq!(
            with_held.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec![held.id.as_str(), free.id.as_str()]
        );
    }
}
