use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// Status value the engine writes on cancellation and the only one it
/// interprets. Everything else is an opaque label chosen by the caller.
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_CONFIRMED: &str = "confirmed";

/// How an appointment determines its effective time.
///
/// Slot selection always wins over a manually entered date/time; the
/// precedence lives in [`TimeBinding::from_parts`] so call sites cannot get
/// it wrong, and "neither source given" is unrepresentable past validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBinding {
    /// Bound to exactly one time slot; the effective time is the slot's
    /// (date, start_time).
    Slot(String),
    /// Bound to an explicit date-time with no ledger interaction.
    Freeform(NaiveDateTime),
}

impl TimeBinding {
    pub fn from_parts(
        slot_id: Option<String>,
        appointment_date: Option<NaiveDateTime>,
    ) -> AppResult<Self> {
        match (slot_id, appointment_date) {
            (Some(slot_id), _) => Ok(TimeBinding::Slot(slot_id)),
            (None, Some(date)) => Ok(TimeBinding::Freeform(date)),
            (None, None) => Err(AppError::Validation(
                "Please select a time slot or enter a date/time.".to_string(),
            )),
        }
    }

    pub fn slot_id(&self) -> Option<&str> {
        match self {
            TimeBinding::Slot(id) => Some(id),
            TimeBinding::Freeform(_) => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub customer_id: String,
    pub employee_id: String,
    pub service_id: String,
    pub slot_id: Option<String>,
    /// Effective time: mirrors the slot's (date, start_time) when slot-bound,
    /// otherwise the caller-supplied freeform value.
    pub appointment_date: NaiveDateTime,
    pub status: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_CANCELLED)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointment {
    pub employee_id: String,
    pub service_id: String,
    pub slot_id: Option<String>,
    pub appointment_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppointment {
    pub employee_id: Option<String>,
    pub service_id: Option<String>,
    pub slot_id: Option<String>,
    pub appointment_date: Option<NaiveDateTime>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d")
            .unwrap()
            .and_time(s[11..].parse().unwrap())
    }

    #[test]
    fn slot_wins_over_freeform_date() {
        let binding =
            TimeBinding::from_parts(Some("slot-1".into()), Some(dt("2024-07-01 10:00:00")))
                .unwrap();
        assert_eq!(binding, TimeBinding::Slot("slot-1".into()));
    }

    #[test]
    fn freeform_date_alone_is_accepted() {
        let binding = TimeBinding::from_parts(None, Some(dt("2024-07-01 10:00:00"))).unwrap();
        assert_eq!(binding, TimeBinding::Freeform(dt("2024-07-01 10:00:00")));
    }

    #[test]
    fn missing_time_source_is_rejected() {
        let err = TimeBinding::from_parts(None, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
