use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::services::calendar::{CalendarEvent, CalendarService};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(list_events))
}

/// Calendar feed: staff see the whole schedule, customers their own bookings.
async fn list_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    Ok(Json(
        CalendarService::list_events(&state, &user.scope()).await?,
    ))
}
