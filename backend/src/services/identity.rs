//! Read-only lookups against the employee directory
//!
//! Employees are maintained by the user-management system; the inventory core
//! only queries them to route approvals, authorize transitions and address
//! notifications.

use shared::{normalize_department, Actor};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Identity service for employee and department-head lookups
#[derive(Clone)]
pub struct IdentityService {
    db: PgPool,
}

/// Row for employee queries
#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: Uuid,
    emp_code: String,
    name: String,
    email: Option<String>,
    departments: Vec<String>,
    designation: String,
    role: String,
}

impl TryFrom<EmployeeRow> for Actor {
    type Error = AppError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Employee {}: {}", row.emp_code, e)))?;

        Ok(Actor {
            id: row.id,
            emp_code: row.emp_code,
            name: row.name,
            email: row.email,
            departments: row.departments,
            designation: row.designation,
            role,
        })
    }
}

impl IdentityService {
    /// Create a new IdentityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find an active employee by id
    pub async fn find_active(&self, employee_id: Uuid) -> AppResult<Option<Actor>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, emp_code, name, email, departments, designation, role
            FROM employees
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(Actor::try_from).transpose()
    }

    /// Active heads sharing at least one of the given departments, lowest employee code first.
    ///
    /// Departments match trimmed and case-insensitively, as `Actor::belongs_to` does.
    pub async fn heads_for(&self, departments: &[String]) -> AppResult<Vec<Actor>> {
        let keys: Vec<String> = departments.iter().map(|d| normalize_department(d)).collect();
        let rows = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, emp_code, name, email, departments, designation, role
            FROM employees
            WHERE role = 'head'
              AND is_active = true
              AND EXISTS (
                  SELECT 1 FROM unnest(departments) AS d
                  WHERE lower(btrim(d, E' \t\r\n')) = ANY($1)
              )
            ORDER BY emp_code ASC, id ASC
            "#,
        )
        .bind(&keys)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Actor::try_from).collect()
    }

    /// Head of a single department, if any
    pub async fn head_of(&self, department: &str) -> AppResult<Option<Actor>> {
        let heads = self.heads_for(&[department.to_string()]).await?;
        Ok(heads.into_iter().next())
    }
}
