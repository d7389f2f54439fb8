use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::models::{CreateTimeSlot, TimeSlot, UpdateTimeSlot};
use crate::db::repository::TimeSlotRepository;
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::services::auth::require_staff;
use crate::services::booking::BookingService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_available_slots).post(create_slot))
        .route("/:id", axum::routing::put(update_slot).delete(delete_slot))
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub employee_id: Option<String>,
    pub date: Option<NaiveDate>,
    /// Edit sessions pass the slot their appointment currently holds so it
    /// stays selectable even though it is booked.
    pub including_slot_id: Option<String>,
}

async fn list_available_slots(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(query): Query<AvailableSlotsQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let slots = BookingService::list_bookable_slots(
        &state,
        query.employee_id.as_deref(),
        query.date,
        query.including_slot_id.as_deref(),
    )
    .await?;
    Ok(Json(slots))
}

async fn create_slot(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(request): Json<CreateTimeSlot>,
) -> AppResult<Json<TimeSlot>> {
    require_staff(&claims)?;
    Ok(Json(TimeSlotRepository::create(&state.db, request).await?))
}

async fn update_slot(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTimeSlot>,
) -> AppResult<Json<TimeSlot>> {
    require_staff(&claims)?;
    Ok(Json(
        TimeSlotRepository::update_bounds(&state.db, &id, request).await?,
    ))
}

async fn delete_slot(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&claims)?;
    TimeSlotRepository::delete(&state.db, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
