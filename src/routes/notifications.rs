use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::db::models::Notification;
use crate::db::repository::NotificationRepository;
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", post(mark_read))
}

/// The inbox is always the caller's own, regardless of role.
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<Vec<Notification>>> {
    Ok(Json(
        NotificationRepository::list_for_recipient(&state.db, &claims.sub).await?,
    ))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    NotificationRepository::mark_read(&state.db, &id, &claims.sub).await?;
    Ok(Json(serde_json::json!({ "read": id })))
}
