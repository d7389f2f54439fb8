use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateEmployee, Employee, UpdateEmployee};
use crate::error::{AppError, AppResult};

// ============================================================================
// Employee catalog
// ============================================================================

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub async fn create(pool: &SqlitePool, employee: CreateEmployee) -> AppResult<Employee> {
        if employee.name.trim().is_empty() {
            return Err(AppError::Validation(
                "Employee name is required".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let created = sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (id, name, specialization, email, phone, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING id, name, specialization, email, phone, is_active, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(employee.name.trim())
        .bind(&employee.specialization)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(
                "An employee with this email already exists".to_string(),
            ),
            _ => AppError::Database(e),
        })?;

        Ok(created)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, name, specialization, email, phone, is_active, created_at, updated_at
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(employee)
    }

    /// `active_only` drives the new-booking pickers; deactivated employees
    /// stay resolvable by id for their existing appointments.
    pub async fn list_all(pool: &SqlitePool, active_only: bool) -> AppResult<Vec<Employee>> {
        let employees = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, name, specialization, email, phone, is_active, created_at, updated_at
            FROM employees
            WHERE (? = 0 OR is_active = 1)
            ORDER BY name ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(employees)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: UpdateEmployee,
    ) -> AppResult<Employee> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))?;

        let name = update.name.unwrap_or(existing.name);
        let specialization = update.specialization.unwrap_or(existing.specialization);
        let email = update.email.unwrap_or(existing.email);
        let phone = update.phone.or(existing.phone);
        let is_active = update.is_active.unwrap_or(existing.is_active);

        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Employee name is required".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Employee>(
            r#"
            UPDATE employees
            SET name = ?, specialization = ?, email = ?, phone = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, specialization, email, phone, is_active, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(&specialization)
        .bind(&email)
        .bind(&phone)
        .bind(is_active)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(updated)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::test_pool;

    #[tokio::test]
    async fn deactivation_hides_employee_from_pickers_only() {
        let pool = test_pool().await;
        let employee = EmployeeRepository::create(
            &pool,
            CreateEmployee {
                name: "Erin".to_string(),
                specialization: "Massage".to_string(),
                email: "erin@example.com".to_string(),
                phone: None,
            },
        )
        .await
        .unwrap();

        EmployeeRepository::update(
            &pool,
            &employee.id,
            UpdateEmployee {
                name: None,
                specialization: None,
                email: None,
                phone: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

        let pickers = EmployeeRepository::list_all(&pool, true).await.unwrap();
        assert!(pickers.is_empty());

        // Still resolvable by id for existing appointments.
        let found = EmployeeRepository::find_by_id(&pool, &employee.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!found.is_active);
    }
}
