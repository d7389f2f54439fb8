use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{CreateEmployee, Employee, UpdateEmployee};
use crate::db::repository::EmployeeRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::auth::require_staff;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListEmployeesQuery {
    /// New-booking pickers list active employees only; admin screens pass
    /// `false` to see everyone.
    pub active_only: Option<bool>,
}

async fn list_employees(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Query(query): Query<ListEmployeesQuery>,
) -> AppResult<Json<Vec<Employee>>> {
    let active_only = query.active_only.unwrap_or(true);
    Ok(Json(
        EmployeeRepository::list_all(&state.db, active_only).await?,
    ))
}

async fn get_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Employee>> {
    let employee = EmployeeRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;
    Ok(Json(employee))
}

async fn create_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(request): Json<CreateEmployee>,
) -> AppResult<Json<Employee>> {
    require_staff(&claims)?;
    Ok(Json(EmployeeRepository::create(&state.db, request).await?))
}

async fn update_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmployee>,
) -> AppResult<Json<Employee>> {
    require_staff(&claims)?;
    Ok(Json(
        EmployeeRepository::update(&state.db, &id, request).await?,
    ))
}

async fn delete_employee(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_staff(&claims)?;
    EmployeeRepository::delete(&state.db, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
