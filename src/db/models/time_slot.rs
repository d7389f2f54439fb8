use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookable (employee, date, time-range) unit of availability.
///
/// `is_booked` is written only by the booking engine; staff edits to the
/// time bounds are rejected while the slot is held.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TimeSlot {
    /// The instant an appointment bound to this slot effectively starts.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimeSlot {
    pub employee_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTimeSlot {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}
