use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::db::models::{CreateService, Service, UpdateService};
use crate::db::repository::ServiceRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::auth::require_staff;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/:id",
            get(get_service).put(update_service).delete(delete_service),
        )
}

async fn list_services(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> AppResult<Json<Vec<Service>>> {
    Ok(Json(ServiceRepository::list_all(&state.db).await?))
}

async fn get_service(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Service>> {
    let service = ServiceRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service {} not found", id)))?;
    Ok(Json(service))
}

async fn create_service(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(request): Json<CreateService>,
) -> AppResult<Json<Service>> {
    require_staff(&claims)?;
    Ok(Json(ServiceRepository::create(&state.db, request).await?))
}

async fn update_service(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateService>,
) -> AppResult<Json<Service>> {
    require_staff(&claims)?;
    Ok(Json(ServiceRepository::update(&state.db, &id, request).await?))
}

async fn delete_service(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&claims)?;
    ServiceRepository::delete(&state.db, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
