use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::db::repository::{AppointmentRepository, AppointmentWithContext};
use crate::error::AppResult;
use crate::services::auth::ViewerScope;
use crate::AppState;

/// Fallback length for freeform bookings, which carry a start but no slot to
/// derive an end from.
fn default_event_duration() -> Duration {
    Duration::hours(1)
}

/// Binary status partition for display: an active/confirmed booking gets the
/// highlight color, everything else (cancelled, pending, anything unknown)
/// the muted one. Deliberately not a full status palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventColor {
    Confirmed,
    Muted,
}

impl EventColor {
    pub fn for_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case("active") || status.eq_ignore_ascii_case("confirmed") {
            EventColor::Confirmed
        } else {
            EventColor::Muted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventColor::Confirmed => "#2563eb",
            EventColor::Muted => "#9ca3af",
        }
    }
}

impl Serialize for EventColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub url: String,
    pub color: EventColor,
}

/// Pure projection of the current appointment set into display events.
///
/// Slot-bound appointments take the slot's date and time range; freeform ones
/// take their stored date-time with the fixed default length. Rows whose
/// service or employee no longer resolves are skipped rather than allowed to
/// break the whole calendar.
pub fn project_events(rows: &[AppointmentWithContext]) -> Vec<CalendarEvent> {
    rows.iter()
        .filter_map(|row| {
            let service_name = row.service_name.as_deref()?;
            let employee_name = row.employee_name.as_deref()?;

            let (start, end) = match &row.slot {
                Some(slot) => (slot.starts_at(), slot.ends_at()),
                None => {
                    let start = row.appointment.appointment_date;
                    (start, start + default_event_duration())
                }
            };

            Some(CalendarEvent {
                title: format!("{} with {}", service_name, employee_name),
                start,
                end,
                url: format!("/appointments/{}", row.appointment.id),
                color: EventColor::for_status(&row.appointment.status),
            })
        })
        .collect()
}

pub struct CalendarService;

impl CalendarService {
    pub async fn list_events(
        state: &Arc<AppState>,
        scope: &ViewerScope,
    ) -> AppResult<Vec<CalendarEvent>> {
        let rows = AppointmentRepository::list_with_context(&state.db, scope).await?;
        Ok(project_events(&rows))
    }
}
