//! Postgres fixtures for the service tests
//!
//! Each `#[sqlx::test]` gets a fresh database with the migrations applied;
//! these helpers seed employees and stock and build the real services on it.

use plant_inventory_backend::config::NotificationConfig;
use plant_inventory_backend::services::ledger::RecordReceiptInput;
use plant_inventory_backend::services::{
    ClaimAlertService, LedgerService, NotificationService, RequestService,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{Actor, InventoryPolicy, Role};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{employee, Cast};

/// The services under test, sharing one pool
pub struct Services {
    pub pool: PgPool,
    pub requests: RequestService,
    pub ledger: LedgerService,
    pub alerts: ClaimAlertService,
}

pub fn services(pool: &PgPool) -> Services {
    let policy = InventoryPolicy::default();
    let notifications = NotificationService::new(
        pool.clone(),
        &NotificationConfig {
            mail_relay_url: None,
            mail_relay_api_key: None,
            sender: "inventory@plant.test".to_string(),
        },
    );

    Services {
        pool: pool.clone(),
        requests: RequestService::new(pool.clone(), policy.clone(), notifications.clone()),
        ledger: LedgerService::new(pool.clone()),
        alerts: ClaimAlertService::new(pool.clone(), policy, notifications),
    }
}

/// Store an employee exactly as given, department spelling included
pub async fn hire(pool: &PgPool, actor: Actor) -> Actor {
    sqlx::query(
        r#"
        INSERT INTO employees (id, emp_code, name, email, departments, designation, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(actor.id)
    .bind(&actor.emp_code)
    .bind(&actor.name)
    .bind(&actor.email)
    .bind(&actor.departments)
    .bind(&actor.designation)
    .bind(actor.role.as_str())
    .execute(pool)
    .await
    .expect("insert employee");
    actor
}

pub async fn hire_new(
    pool: &PgPool,
    code: &str,
    role: Role,
    departments: &[&str],
    designation: &str,
) -> Actor {
    hire(pool, employee(code, role, departments, designation)).await
}

/// The usual cast, stored
pub async fn staffed_db(pool: &PgPool) -> Cast {
    Cast {
        warehouse_head: hire_new(pool, "E010", Role::Head, &["Warehouse"], "Warehouse Head").await,
        production_head: hire_new(pool, "E020", Role::Head, &["Production"], "Production Head")
            .await,
        issuer: hire_new(pool, "E011", Role::Staff, &["Warehouse"], "Executive").await,
        warehouse_staff: hire_new(pool, "E012", Role::Staff, &["Warehouse"], "Operator").await,
        production_staff: hire_new(pool, "E021", Role::Staff, &["Production"], "Operator").await,
        director: hire_new(pool, "E001", Role::Director, &["Management"], "Director").await,
    }
}

pub fn receipt(item: &str, batch_id: &str, quantity: Decimal) -> RecordReceiptInput {
    RecordReceiptInput {
        item_name: item.to_string(),
        unit: "pcs".to_string(),
        batch_id: batch_id.to_string(),
        quantity,
        rate: dec!(1.50),
    }
}

/// `issued` column of one batch
pub async fn batch_issued(pool: &PgPool, item: &str, batch_id: &str) -> Decimal {
    sqlx::query_scalar(
        r#"
        SELECT b.issued FROM inventory_batches b
        JOIN inventory_items i ON i.id = b.item_id
        WHERE i.normalized_name = $1 AND b.batch_id = $2
        "#,
    )
    .bind(shared::normalize_item_name(item))
    .bind(batch_id)
    .fetch_one(pool)
    .await
    .expect("batch row")
}

/// `alert_sent` of the request's claim alert, or None when there is no row
pub async fn alert_state(pool: &PgPool, request_id: Uuid) -> Option<bool> {
    sqlx::query_scalar("SELECT alert_sent FROM claim_alerts WHERE request_id = $1")
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .expect("alert lookup")
}

pub async fn stored_status(pool: &PgPool, request_id: Uuid) -> String {
    sqlx::query_scalar("SELECT status FROM inventory_requests WHERE id = $1")
        .bind(request_id)
        .fetch_one(pool)
        .await
        .expect("request row")
}

pub async fn notices(pool: &PgPool, kind: &str, request_id: Uuid) -> Vec<Uuid> {
    sqlx::query_scalar(
        "SELECT recipient_id FROM notification_log WHERE kind = $1 AND entity_id = $2",
    )
    .bind(kind)
    .bind(request_id)
    .fetch_all(pool)
    .await
    .expect("notification lookup")
}

/// Notices are written by background tasks; wait until `expected` show up
pub async fn wait_for_notices(pool: &PgPool, kind: &str, request_id: Uuid, expected: usize) -> Vec<Uuid> {
    for _ in 0..50 {
        let found = notices(pool, kind, request_id).await;
        if found.len() >= expected {
            return found;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    notices(pool, kind, request_id).await
}
