//! Claim-alert monitor
//!
//! Flags issued requests that stay unclaimed past the claim window. The
//! flag flip is a single conditional UPDATE, so overlapping sweeps notify
//! each request at most once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{ClaimTiming, EmployeeRef, InventoryPolicy, RequestStatus};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::identity::IdentityService;
use crate::services::notification::{InventoryNotice, NotificationService, Recipient};
use crate::services::requests::RequestService;
use crate::AppState;

/// Claim-alert service for sweeps and the alert dashboard
#[derive(Clone)]
pub struct ClaimAlertService {
    db: PgPool,
    policy: InventoryPolicy,
    notifications: NotificationService,
}

/// Issued request with its claim timing
#[derive(Debug, Clone, Serialize)]
pub struct ClaimAlertView {
    pub request_id: Uuid,
    pub item: String,
    pub unit: String,
    pub quantity_issued: Option<rust_decimal::Decimal>,
    pub batch_id: Option<String>,
    pub department: String,
    pub requester: EmployeeRef,
    pub issued_at: DateTime<Utc>,
    #[serde(flatten)]
    pub timing: ClaimTiming,
    pub alert_sent: bool,
    pub alert_time: Option<DateTime<Utc>>,
}

/// Row for alert queries
#[derive(Debug, FromRow)]
struct AlertRow {
    request_id: Uuid,
    alert_sent: bool,
    alert_time: Option<DateTime<Utc>>,
    item: String,
    unit: String,
    quantity_issued: Option<rust_decimal::Decimal>,
    batch_id: Option<String>,
    department: String,
    issued_at: DateTime<Utc>,
    requested_by: Uuid,
    requester_code: String,
    requester_name: String,
}

impl ClaimAlertService {
    /// Create a new ClaimAlertService instance
    pub fn new(db: PgPool, policy: InventoryPolicy, notifications: NotificationService) -> Self {
        Self {
            db,
            policy,
            notifications,
        }
    }

    /// Run one sweep and return the ids flagged by this run
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        self.reconcile_alert_rows().await?;

        let cutoff = now - self.policy.claim_window();
        let flagged = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE claim_alerts a
            SET alert_sent = TRUE, alert_time = $1
            FROM inventory_requests r
            WHERE r.id = a.request_id
              AND a.alert_sent = FALSE
              AND r.status = $2
              AND r.issued_at < $3
            RETURNING a.request_id
            "#,
        )
        .bind(now)
        .bind(RequestStatus::Issued.as_str())
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        if !flagged.is_empty() {
            self.notify_overdue(&flagged, now).await;
        }

        Ok(flagged)
    }

    /// Exactly one alert row per issued request and none for any other status.
    ///
    /// Issued rows are share-locked before the insert, so a claim committing
    /// concurrently is waited for and its request re-checked instead of
    /// getting its deleted alert row back.
    async fn reconcile_alert_rows(&self) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let issued = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_requests WHERE status = $1 ORDER BY id FOR SHARE",
        )
        .bind(RequestStatus::Issued.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let created = sqlx::query(
            r#"
            INSERT INTO claim_alerts (request_id)
            SELECT unnest($1::UUID[])
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(&issued)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let removed = sqlx::query(
            r#"
            DELETE FROM claim_alerts a
            USING inventory_requests r
            WHERE r.id = a.request_id AND r.status <> $1
            "#,
        )
        .bind(RequestStatus::Issued.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if created > 0 || removed > 0 {
            tracing::info!(created, removed, "Reconciled claim alert rows");
        }
        Ok(())
    }

    async fn notify_overdue(&self, flagged: &[Uuid], now: DateTime<Utc>) {
        let requests = RequestService::new(
            self.db.clone(),
            self.policy.clone(),
            self.notifications.clone(),
        );
        let identity = IdentityService::new(self.db.clone());

        for id in flagged {
            let request = match requests.get_request(*id).await {
                Ok(found) => found.request,
                Err(err) => {
                    tracing::warn!(request_id = %id, "Overdue request lookup failed: {}", err);
                    continue;
                }
            };

            let elapsed_minutes = request
                .elapsed_since_issue(now)
                .map(|d| d.num_minutes())
                .unwrap_or_default();

            match identity.head_of(&request.department).await {
                Ok(Some(head)) => self.notifications.dispatch(
                    Recipient::from(&head),
                    InventoryNotice::ClaimOverdue {
                        request,
                        elapsed_minutes,
                    },
                ),
                Ok(None) => tracing::warn!(
                    request_id = %id,
                    department = %request.department,
                    "No department head for overdue notice"
                ),
                Err(err) => tracing::warn!(request_id = %id, "Head lookup failed: {}", err),
            }
        }
    }

    /// Every issued request with an alert record, most overdue first
    pub async fn list_alerts(&self, now: DateTime<Utc>) -> AppResult<Vec<ClaimAlertView>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT a.request_id, a.alert_sent, a.alert_time,
                   r.item, r.unit, r.quantity_issued, r.batch_id, r.department,
                   r.issued_at, r.requested_by,
                   e.emp_code AS requester_code, e.name AS requester_name
            FROM claim_alerts a
            JOIN inventory_requests r ON r.id = a.request_id
            JOIN employees e ON e.id = r.requested_by
            WHERE r.status = $1 AND r.issued_at IS NOT NULL
            ORDER BY r.issued_at ASC
            "#,
        )
        .bind(RequestStatus::Issued.as_str())
        .fetch_all(&self.db)
        .await?;

        let window = self.policy.claim_window();
        let lead = self.policy.urgent_lead();

        Ok(rows
            .into_iter()
            .map(|row| ClaimAlertView {
                timing: ClaimTiming::compute(row.issued_at, now, window, lead),
                request_id: row.request_id,
                item: row.item,
                unit: row.unit,
                quantity_issued: row.quantity_issued,
                batch_id: row.batch_id,
                department: row.department,
                requester: EmployeeRef {
                    id: row.requested_by,
                    emp_code: row.requester_code,
                    name: row.requester_name,
                },
                issued_at: row.issued_at,
                alert_sent: row.alert_sent,
                alert_time: row.alert_time,
            })
            .collect())
    }
}

/// Start the periodic sweep on the runtime
pub fn spawn_monitor(state: &AppState) -> tokio::task::JoinHandle<()> {
    let service = ClaimAlertService::new(
        state.db.clone(),
        state.policy.as_ref().clone(),
        state.notifications.clone(),
    );
    let period = state.config.inventory.sweep_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = period.as_secs(), "Claim-alert monitor started");

        loop {
            ticker.tick().await;
            match service.sweep(Utc::now()).await {
                Ok(flagged) if flagged.is_empty() => {
                    tracing::debug!("Claim sweep found nothing overdue");
                }
                Ok(flagged) => {
                    tracing::info!(count = flagged.len(), "Claim sweep flagged overdue requests");
                }
                Err(err) => {
                    tracing::error!("Claim sweep failed: {}", err);
                }
            }
        }
    })
}
