//! Shared fixtures for repository and service tests: an in-memory SQLite
//! pool with the migration set applied, plus minimal catalog seeders.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::db::models::{CreateEmployee, CreateService, Employee, Service};
use crate::db::repository::{EmployeeRepository, ServiceRepository};

pub async fn test_pool() -> SqlitePool {
    // A single connection keeps every statement on the same in-memory
    // database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

pub async fn seed_employee(pool: &SqlitePool, name: &str) -> Employee {
    EmployeeRepository::create(
        pool,
        CreateEmployee {
            name: name.to_string(),
            specialization: "Massage".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
        },
    )
    .await
    .expect("seed employee")
}

pub async fn seed_service(pool: &SqlitePool, name: &str) -> Service {
    ServiceRepository::create(
        pool,
        CreateService {
            name: name.to_string(),
            price: Some("45.00".to_string()),
            duration_minutes: 30,
        },
    )
    .await
    .expect("seed service")
}
