use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::db::models::{Appointment, TimeSlot};
use crate::error::{AppError, AppResult};
use crate::services::auth::ViewerScope;

/// Appointment joined with the reference data the calendar projection needs.
/// The names are optional on purpose: a dangling service or employee
/// reference must not crash projection, it is filtered out there.
#[derive(Debug, Clone)]
pub struct AppointmentWithContext {
    pub appointment: Appointment,
    pub slot: Option<TimeSlot>,
    pub service_name: Option<String>,
    pub employee_name: Option<String>,
}

// ============================================================================
// Appointment Repository
// ============================================================================
//
// Row-level reads and writes only. The booking engine
// (`services::booking::BookingService`) owns the lifecycle rules and calls
// the write methods on its own transaction.

pub struct AppointmentRepository;

impl AppointmentRepository {
    const COLUMNS: &'static str = "id, customer_id, employee_id, service_id, slot_id, \
         appointment_date, status, notes, created_at, updated_at";

    pub async fn insert(
        executor: impl SqliteExecutor<'_>,
        appointment: &Appointment,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (id, customer_id, employee_id, service_id, slot_id,
                 appointment_date, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.customer_id)
        .bind(&appointment.employee_id)
        .bind(&appointment.service_id)
        .bind(&appointment.slot_id)
        .bind(appointment.appointment_date)
        .bind(&appointment.status)
        .bind(&appointment.notes)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn update_row(
        executor: impl SqliteExecutor<'_>,
        appointment: &Appointment,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE appointments
            SET employee_id = ?, service_id = ?, slot_id = ?,
                appointment_date = ?, status = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&appointment.employee_id)
        .bind(&appointment.service_id)
        .bind(&appointment.slot_id)
        .bind(appointment.appointment_date)
        .bind(&appointment.status)
        .bind(&appointment.notes)
        .bind(appointment.updated_at)
        .bind(&appointment.id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn delete_row(executor: impl SqliteExecutor<'_>, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    pub async fn find_by_id(
        executor: impl SqliteExecutor<'_>,
        id: &str,
    ) -> AppResult<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointments WHERE id = ?",
            Self::COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(appointment)
    }

    pub async fn list(pool: &SqlitePool, scope: &ViewerScope) -> AppResult<Vec<Appointment>> {
        let customer_id = match scope {
            ViewerScope::All => None,
            ViewerScope::Own(id) => Some(id.as_str()),
        };

        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE (? IS NULL OR customer_id = ?)
            ORDER BY appointment_date ASC
            "#,
            Self::COLUMNS
        ))
        .bind(customer_id)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(appointments)
    }

    /// Non-cancelled appointments holding the given slot. The booking
    /// invariant says this is at most one.
    pub async fn find_active_by_slot(
        executor: impl SqliteExecutor<'_>,
        slot_id: &str,
    ) -> AppResult<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE slot_id = ? AND LOWER(status) != 'cancelled'
            "#,
            Self::COLUMNS
        ))
        .bind(slot_id)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(appointments)
    }

    /// Viewer-scoped appointments joined with slot and catalog names for the
    /// calendar projection.
    pub async fn list_with_context(
        pool: &SqlitePool,
        scope: &ViewerScope,
    ) -> AppResult<Vec<AppointmentWithContext>> {
        let customer_id = match scope {
            ViewerScope::All => None,
            ViewerScope::Own(id) => Some(id.as_str()),
        };

        let rows = sqlx::query(
            r#"
            SELECT
                a.id, a.customer_id, a.employee_id, a.service_id, a.slot_id,
                a.appointment_date, a.status, a.notes, a.created_at, a.updated_at,
                s.name AS service_name,
                e.name AS employee_name,
                t.id AS t_id, t.employee_id AS t_employee_id, t.date AS t_date,
                t.start_time AS t_start_time, t.end_time AS t_end_time,
                t.is_booked AS t_is_booked, t.created_at AS t_created_at,
                t.updated_at AS t_updated_at
            FROM appointments a
            LEFT JOIN services s ON s.id = a.service_id
            LEFT JOIN employees e ON e.id = a.employee_id
            LEFT JOIN time_slots t ON t.id = a.slot_id
            WHERE (? IS NULL OR a.customer_id = ?)
            ORDER BY a.appointment_date ASC
            "#,
        )
        .bind(customer_id)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let mut result = Vec::with_capacity(rows.len());
        for r in rows {
            let appointment = Appointment {
                id: r.get("id"),
                customer_id: r.get("customer_id"),
                employee_id: r.get("employee_id"),
                service_id: r.get("service_id"),
                slot_id: r.get("slot_id"),
                appointment_date: r.get("appointment_date"),
                status: r.get("status"),
                notes: r.get("notes"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            };

            let slot = match r.get::<Option<String>, _>("t_id") {
                Some(slot_id) => Some(TimeSlot {
                    id: slot_id,
                    employee_id: r.get("t_employee_id"),
                    date: r.get("t_date"),
                    start_time: r.get("t_start_time"),
                    end_time: r.get("t_end_time"),
                    is_booked: r.get("t_is_booked"),
                    created_at: r.get("t_created_at"),
                    updated_at: r.get("t_updated_at"),
                }),
                None => None,
            };

            result.push(AppointmentWithContext {
                appointment,
                slot,
                service_name: r.get("service_name"),
                employee_name: r.get("employee_name"),
            });
        }

        Ok(result)
    }
}
