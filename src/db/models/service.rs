use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    /// Monetary amount kept as a decimal string; SQLite has no decimal type
    /// and floats would drift on display.
    pub price: Option<String>,
    pub duration_minutes: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub price: Option<String>,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateService {
    pub name: Option<String>,
    pub price: Option<String>,
    pub duration_minutes: Option<i64>,
}
