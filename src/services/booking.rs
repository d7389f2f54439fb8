use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::db::models::{
    Appointment, CreateAppointment, TimeBinding, TimeSlot, UpdateAppointment, STATUS_CANCELLED,
    STATUS_CONFIRMED,
};
use crate::db::repository::{
    AppointmentRepository, EmployeeRepository, ServiceRepository, TimeSlotRepository,
};
use crate::error::{AppError, AppResult};
use crate::services::auth::ViewerScope;
use crate::services::notifications::DomainEvent;
use crate::AppState;

// ============================================================================
// Booking Engine
// ============================================================================
//
// The only writer of `time_slots.is_booked`. Every mutation spans the
// appointment write and the slot flag write in one transaction, so a booked
// slot always corresponds to a live appointment and vice versa. A losing
// writer in a same-slot race observes `SlotConflict` and its whole operation
// unwinds.

pub struct BookingService;

impl BookingService {
    pub async fn create(
        state: &Arc<AppState>,
        customer_id: &str,
        req: CreateAppointment,
    ) -> AppResult<Appointment> {
        let pool = &state.db;

        // Catalog references are validated before the transaction opens.
        EmployeeRepository::find_by_id(pool, &req.employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", req.employee_id)))?;
        ServiceRepository::find_by_id(pool, &req.service_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", req.service_id)))?;

        let binding = TimeBinding::from_parts(req.slot_id, req.appointment_date)?;

        let mut tx = pool.begin().await?;

        let effective = match &binding {
            TimeBinding::Slot(slot_id) => Self::load_slot(&mut tx, slot_id).await?.starts_at(),
            TimeBinding::Freeform(dt) => *dt,
        };

        let now = Utc::now().naive_utc();
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            employee_id: req.employee_id,
            service_id: req.service_id,
            slot_id: binding.slot_id().map(str::to_string),
            appointment_date: effective,
            status: STATUS_CONFIRMED.to_string(),
            notes: req.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        AppointmentRepository::insert(&mut *tx, &appointment).await?;

        if let TimeBinding::Slot(slot_id) = &binding {
            // The ledger compare-and-set is the sole booked check on this
            // path; a losing writer unwinds the insert above with the
            // transaction and gets the user-facing conflict.
            TimeSlotRepository::mark_booked(&mut *tx, slot_id)
                .await
                .map_err(|e| match e {
                    AppError::AlreadyBooked(_) => AppError::SlotConflict,
                    other => other,
                })?;
        }

        tx.commit().await?;

        state.notifications.dispatch(DomainEvent::BookingConfirmed {
            appointment_id: appointment.id.clone(),
            recipient_id: appointment.customer_id.clone(),
        });

        Ok(appointment)
    }

    pub async fn update(
        state: &Arc<AppState>,
        id: &str,
        scope: &ViewerScope,
        req: UpdateAppointment,
    ) -> AppResult<Appointment> {
        let pool = &state.db;

        let current = Self::get(state, id, scope).await?;
        if let Some(status) = &req.status {
            if status.eq_ignore_ascii_case(STATUS_CANCELLED) {
                return Err(AppError::Validation(
                    "Use the cancel operation to cancel an appointment".to_string(),
                ));
            }
        }

        let employee_id = req.employee_id.unwrap_or_else(|| current.employee_id.clone());
        let service_id = req.service_id.unwrap_or_else(|| current.service_id.clone());
        if employee_id != current.employee_id {
            EmployeeRepository::find_by_id(pool, &employee_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;
        }
        if service_id != current.service_id {
            ServiceRepository::find_by_id(pool, &service_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
        }

        // The request replaces the time binding wholesale; a save with
        // neither source is invalid, same as on create.
        let binding = TimeBinding::from_parts(req.slot_id, req.appointment_date)?;

        let mut tx = pool.begin().await?;

        // Re-read under the transaction; the scope and catalog checks above
        // ran outside it, and a concurrent cancel may have landed since.
        // Terminality is enforced here so a cancelled row can never
        // re-acquire a slot.
        let existing = AppointmentRepository::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;
        if existing.is_cancelled() {
            return Err(AppError::Conflict(
                "Cancelled appointments cannot be modified".to_string(),
            ));
        }

        let effective = match &binding {
            // Re-saving the already-held slot is a no-op on the ledger.
            TimeBinding::Slot(slot_id) if existing.slot_id.as_deref() == Some(slot_id.as_str()) => {
                Self::load_slot(&mut tx, slot_id).await?.starts_at()
            }
            TimeBinding::Slot(slot_id) => {
                if let Some(old) = &existing.slot_id {
                    TimeSlotRepository::mark_free(&mut *tx, old).await?;
                }
                let slot = Self::load_slot(&mut tx, slot_id).await?;
                if slot.is_booked {
                    // Rolls back the release above: the appointment keeps
                    // its previous slot, still booked.
                    return Err(AppError::SlotConflict);
                }
                TimeSlotRepository::mark_booked(&mut *tx, slot_id).await?;
                slot.starts_at()
            }
            TimeBinding::Freeform(dt) => {
                if let Some(old) = &existing.slot_id {
                    TimeSlotRepository::mark_free(&mut *tx, old).await?;
                }
                *dt
            }
        };

        let updated = Appointment {
            employee_id,
            service_id,
            slot_id: binding.slot_id().map(str::to_string),
            appointment_date: effective,
            status: req.status.unwrap_or(existing.status),
            notes: req.notes.unwrap_or(existing.notes),
            updated_at: Utc::now().naive_utc(),
            ..existing
        };

        AppointmentRepository::update_row(&mut *tx, &updated).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Cancellation is the terminal transition: the slot is released, the
    /// record stays for history. Cancelling twice is a no-op.
    pub async fn cancel(
        state: &Arc<AppState>,
        id: &str,
        scope: &ViewerScope,
    ) -> AppResult<Appointment> {
        let mut tx = state.db.begin().await?;

        let existing = AppointmentRepository::find_by_id(&mut *tx, id)
            .await?
            .filter(|a| scope.covers(&a.customer_id))
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;

        if existing.is_cancelled() {
            return Ok(existing);
        }

        if let Some(slot_id) = &existing.slot_id {
            TimeSlotRepository::mark_free(&mut *tx, slot_id).await?;
        }

        let cancelled = Appointment {
            status: STATUS_CANCELLED.to_string(),
            updated_at: Utc::now().naive_utc(),
            ..existing
        };
        AppointmentRepository::update_row(&mut *tx, &cancelled).await?;
        tx.commit().await?;

        state.notifications.dispatch(DomainEvent::BookingCancelled {
            appointment_id: cancelled.id.clone(),
            recipient_id: cancelled.customer_id.clone(),
        });

        Ok(cancelled)
    }

    pub async fn delete(state: &Arc<AppState>, id: &str, scope: &ViewerScope) -> AppResult<()> {
        let mut tx = state.db.begin().await?;

        let existing = AppointmentRepository::find_by_id(&mut *tx, id)
            .await?
            .filter(|a| scope.covers(&a.customer_id))
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))?;

        if let Some(slot_id) = &existing.slot_id {
            TimeSlotRepository::mark_free(&mut *tx, slot_id).await?;
        }
        AppointmentRepository::delete_row(&mut *tx, id).await?;
        tx.commit().await?;

        state.notifications.dispatch(DomainEvent::BookingCancelled {
            appointment_id: existing.id,
            recipient_id: existing.customer_id,
        });

        Ok(())
    }

    /// Out-of-scope reads resolve to `NotFound` rather than `Forbidden` so
    /// customers cannot probe for other people's appointment ids.
    pub async fn get(
        state: &Arc<AppState>,
        id: &str,
        scope: &ViewerScope,
    ) -> AppResult<Appointment> {
        AppointmentRepository::find_by_id(&state.db, id)
            .await?
            .filter(|a| scope.covers(&a.customer_id))
            .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", id)))
    }

    pub async fn list(state: &Arc<AppState>, scope: &ViewerScope) -> AppResult<Vec<Appointment>> {
        AppointmentRepository::list(&state.db, scope).await
    }

    /// Slots offered to a booking form. An edit session passes the slot it
    /// currently holds so "keep my slot" stays selectable; the union is
    /// computed per request, never cached.
    pub async fn list_bookable_slots(
        state: &Arc<AppState>,
        employee_id: Option<&str>,
        date: Option<NaiveDate>,
        including_slot_id: Option<&str>,
    ) -> AppResult<Vec<TimeSlot>> {
        TimeSlotRepository::list_available(&state.db, employee_id, date, including_slot_id).await
    }

    async fn load_slot(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        slot_id: &str,
    ) -> AppResult<TimeSlot> {
        TimeSlotRepository::find_by_id(&mut **tx, slot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Time slot {} not found", slot_id)))
    }
}
