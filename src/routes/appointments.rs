use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::db::models::{Appointment, CreateAppointment, UpdateAppointment};
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::services::auth::Role;
use crate::services::booking::BookingService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/:id/cancel", post(cancel_appointment))
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    /// Staff may book on behalf of a named customer; for everyone else the
    /// booking is their own and this field is rejected.
    pub customer_id: Option<String>,
    pub employee_id: String,
    pub service_id: String,
    pub slot_id: Option<String>,
    pub appointment_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
}

async fn list_appointments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<Vec<Appointment>>> {
    Ok(Json(BookingService::list(&state, &user.scope()).await?))
}

async fn get_appointment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(BookingService::get(&state, &id, &user.scope()).await?))
}

async fn create_appointment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateAppointmentRequest>,
) -> AppResult<Json<Appointment>> {
    let customer_id = match request.customer_id {
        Some(customer_id) if customer_id != user.0.sub => {
            if user.0.role != Role::Staff {
                return Err(AppError::Forbidden);
            }
            customer_id
        }
        _ => user.0.sub.clone(),
    };

    let appointment = BookingService::create(
        &state,
        &customer_id,
        CreateAppointment {
            employee_id: request.employee_id,
            service_id: request.service_id,
            slot_id: request.slot_id,
            appointment_date: request.appointment_date,
            notes: request.notes,
        },
    )
    .await?;

    Ok(Json(appointment))
}

async fn update_appointment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateAppointment>,
) -> AppResult<Json<Appointment>> {
    let appointment = BookingService::update(&state, &id, &user.scope(), request).await?;
    Ok(Json(appointment))
}

async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    BookingService::delete(&state, &id, &user.scope()).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        BookingService::cancel(&state, &id, &user.scope()).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CreateTimeSlot;
    use crate::db::repository::test_support::{seed_employee, seed_service, test_pool};
    use crate::db::repository::TimeSlotRepository;
    use crate::services::auth::Claims;
    use crate::services::notifications::NotificationService;
    use axum::{body::Body, http::Request, http::StatusCode};
    use chrono::{NaiveDate, NaiveTime};
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn token(sub: &str, role: Role) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    async fn test_app() -> (axum::Router, Arc<AppState>) {
        let pool = test_pool().await;
        let mut config = crate::config::Config::default();
        config.jwt.secret = SECRET.to_string();
        let state = Arc::new(AppState {
            db: pool.clone(),
            config,
            notifications: NotificationService::new(pool),
        });
        let app = axum::Router::new()
            .nest("/api/appointments", router())
            .nest("/api/slots", crate::routes::slots::router())
            .with_state(state.clone());
        (app, state)
    }

    fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::AUTHORIZATION, format!("Bearer {}", token))
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn booking_flow_over_http() {
        let (app, state) = test_app().await;
        let employee = seed_employee(&state.db, "Erin").await;
        let service = seed_service(&state.db, "Massage").await;
        let slot = TimeSlotRepository::create(
            &state.db,
            CreateTimeSlot {
                employee_id: employee.id.clone(),
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            },
        )
        .await
        .unwrap();

        let customer = token("customer-c", Role::Customer);
        let body = serde_json::json!({
            "employee_id": employee.id,
            "service_id": service.id,
            "slot_id": slot.id,
        });

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/appointments", &customer, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["slot_id"], slot.id.as_str());
        assert_eq!(created["customer_id"], "customer-c");

        // A second customer loses the race and gets the user-facing conflict.
        let rival = token("customer-d", Role::Customer);
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/appointments", &rival, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let error = json_body(response).await;
        assert_eq!(error["error"]["code"], "SLOT_CONFLICT");

        // The booked slot no longer shows up as available.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/slots?employee_id={}", employee.id))
                    .header(http::header::AUTHORIZATION, format!("Bearer {}", customer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let open = json_body(response).await;
        assert_eq!(open.as_array().unwrap().len(), 0);

        // Unless the holder's edit session asks for it explicitly.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/slots?including_slot_id={}", slot.id))
                    .header(http::header::AUTHORIZATION, format!("Bearer {}", customer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let open = json_body(response).await;
        assert_eq!(open.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_staff_may_book_for_someone_else() {
        let (app, state) = test_app().await;
        let employee = seed_employee(&state.db, "Erin").await;
        let service = seed_service(&state.db, "Massage").await;

        let body = serde_json::json!({
            "customer_id": "customer-x",
            "employee_id": employee.id,
            "service_id": service.id,
            "appointment_date": "2024-07-01T10:00:00",
        });

        let customer = token("customer-c", Role::Customer);
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/appointments", &customer, body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let staff = token("staff-1", Role::Staff);
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/appointments", &staff, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["customer_id"], "customer-x");
    }
}
