//! Inventory request lifecycle service
//!
//! Transitions are validated in memory by the domain state machine, then
//! persisted as a compare-and-swap on `status`. Issuance additionally moves
//! the ledger and registers the claim alert inside the same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    normalize_item_name, resolve_request_unit, resolve_routing, stock_warning, Actor,
    DomainError, EmployeeRef, InventoryPolicy, InventoryRequest, NewRequest, RequestStatus,
    Transition, Urgency,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::identity::IdentityService;
use crate::services::ledger::LedgerService;
use crate::services::notification::{InventoryNotice, NotificationService, Recipient};

/// Request service for the approval, issuance and claim lifecycle
#[derive(Clone)]
pub struct RequestService {
    db: PgPool,
    policy: InventoryPolicy,
    notifications: NotificationService,
}

/// Input for creating a request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestInput {
    #[validate(length(min = 1, max = 200, message = "Item name is required"))]
    pub item: String,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 1000, message = "Reason is required"))]
    pub reason: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[validate(length(max = 32, message = "Unit is too long"))]
    pub unit: Option<String>,
}

/// Input for rejecting a request
#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequestInput {
    #[validate(length(min = 1, max = 1000, message = "A rejection reason is required"))]
    pub reason: String,
}

/// Input for issuing against a request
#[derive(Debug, Deserialize, Validate)]
pub struct IssueRequestInput {
    #[validate(length(min = 1, max = 100, message = "Batch ID is required"))]
    pub batch_id: String,
    pub quantity: Decimal,
}

/// Result of request creation
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRequest {
    pub request: InventoryRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_warning: Option<String>,
}

/// Result of issuance
#[derive(Debug, Clone, Serialize)]
pub struct IssuedRequest {
    pub request: InventoryRequest,
    pub batch_id: String,
    pub issued_quantity: Decimal,
    pub remaining_balance: Decimal,
}

/// Request together with who filed it
#[derive(Debug, Clone, Serialize)]
pub struct RequestWithRequester {
    #[serde(flatten)]
    pub request: InventoryRequest,
    pub requester: EmployeeRef,
}

/// Open request that current stock cannot cover
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockShortage {
    pub request_id: Uuid,
    pub item: String,
    pub unit: String,
    pub requested: Decimal,
    pub total_available: Decimal,
    pub status: String,
    pub department: String,
    pub requester_name: String,
    pub requester_code: String,
}

/// Row for request queries (joined with the requester)
#[derive(Debug, FromRow)]
struct RequestRow {
    id: Uuid,
    item: String,
    unit: String,
    quantity: Decimal,
    reason: String,
    urgency: String,
    department: String,
    requested_by: Uuid,
    status: String,
    pending_approval_from: Option<Uuid>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    issued_by: Option<Uuid>,
    issued_at: Option<DateTime<Utc>>,
    batch_id: Option<String>,
    quantity_issued: Option<Decimal>,
    claimed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    requester_code: String,
    requester_name: String,
}

impl TryFrom<RequestRow> for RequestWithRequester {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(AppError::Internal)?;
        let urgency = row.urgency.parse().map_err(AppError::Internal)?;

        Ok(RequestWithRequester {
            requester: EmployeeRef {
                id: row.requested_by,
                emp_code: row.requester_code,
                name: row.requester_name,
            },
            request: InventoryRequest {
                id: row.id,
                item: row.item,
                unit: row.unit,
                quantity: row.quantity,
                reason: row.reason,
                urgency,
                department: row.department,
                requested_by: row.requested_by,
                status,
                pending_approval_from: row.pending_approval_from,
                approved_by: row.approved_by,
                approved_at: row.approved_at,
                rejected_by: row.rejected_by,
                rejected_at: row.rejected_at,
                rejection_reason: row.rejection_reason,
                issued_by: row.issued_by,
                issued_at: row.issued_at,
                batch_id: row.batch_id,
                quantity_issued: row.quantity_issued,
                claimed_at: row.claimed_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
    }
}

const REQUEST_COLUMNS: &str = r#"
    r.id, r.item, r.unit, r.quantity, r.reason, r.urgency, r.department, r.requested_by,
    r.status, r.pending_approval_from, r.approved_by, r.approved_at, r.rejected_by,
    r.rejected_at, r.rejection_reason, r.issued_by, r.issued_at, r.batch_id,
    r.quantity_issued, r.claimed_at, r.created_at, r.updated_at,
    e.emp_code AS requester_code, e.name AS requester_name
"#;

fn select_requests(filter: &str) -> String {
    format!(
        "SELECT {} FROM inventory_requests r JOIN employees e ON e.id = r.requested_by {}",
        REQUEST_COLUMNS, filter
    )
}

fn collect_rows(rows: Vec<RequestRow>) -> AppResult<Vec<RequestWithRequester>> {
    rows.into_iter().map(RequestWithRequester::try_from).collect()
}

impl RequestService {
    /// Create a new RequestService instance
    pub fn new(db: PgPool, policy: InventoryPolicy, notifications: NotificationService) -> Self {
        Self {
            db,
            policy,
            notifications,
        }
    }

    /// File a new request; routing failures abort before anything is stored
    pub async fn create_request(
        &self,
        actor: &Actor,
        input: CreateRequestInput,
    ) -> AppResult<CreatedRequest> {
        input.validate()?;

        let identity = IdentityService::new(self.db.clone());
        let candidates = if self.policy.may_self_approve(actor) {
            Vec::new()
        } else {
            identity.heads_for(&actor.departments).await?
        };
        let routing = resolve_routing(actor, &candidates, &self.policy)?;

        // Stock never blocks a request; shortfalls only produce an advisory
        let ledger = LedgerService::new(self.db.clone());
        let balance = ledger.available_balance(&input.item).await?;
        let unit = resolve_request_unit(
            balance.as_ref().map(|b| b.unit.as_str()),
            input.unit.as_deref(),
        );
        let warning = balance
            .as_ref()
            .and_then(|b| stock_warning(b.total_available, input.quantity, &unit));

        let request = InventoryRequest::open(
            NewRequest {
                item: input.item,
                quantity: input.quantity,
                reason: input.reason,
                urgency: input.urgency,
                unit: input.unit,
            },
            actor,
            &routing,
            unit,
            Utc::now(),
        )?;

        sqlx::query(
            r#"
            INSERT INTO inventory_requests (
                id, item, item_key, unit, quantity, reason, urgency, department, requested_by,
                status, pending_approval_from, approved_by, approved_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(request.id)
        .bind(&request.item)
        .bind(normalize_item_name(&request.item))
        .bind(&request.unit)
        .bind(request.quantity)
        .bind(&request.reason)
        .bind(request.urgency.as_str())
        .bind(&request.department)
        .bind(request.requested_by)
        .bind(request.status.as_str())
        .bind(request.pending_approval_from)
        .bind(request.approved_by)
        .bind(request.approved_at)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(
            request_id = %request.id,
            actor = %actor.id,
            status = request.status.as_str(),
            self_approved = routing.self_approved,
            "Inventory request created"
        );

        if let Some(head) = candidates
            .iter()
            .find(|c| Some(c.id) == request.pending_approval_from)
        {
            self.notifications.dispatch(
                Recipient::from(head),
                InventoryNotice::NewRequest {
                    request: request.clone(),
                    requester_name: actor.name.clone(),
                    requester_code: actor.emp_code.clone(),
                },
            );
        }

        Ok(CreatedRequest {
            request,
            stock_warning: warning,
        })
    }

    /// Department head approves a pending request
    pub async fn approve_request(&self, actor: &Actor, request_id: Uuid) -> AppResult<InventoryRequest> {
        let request = self
            .transition(actor, request_id, Transition::Approve)
            .await?;

        let identity = IdentityService::new(self.db.clone());
        match identity.head_of(shared::WAREHOUSE_DEPARTMENT).await {
            Ok(Some(warehouse_head)) => self.notifications.dispatch(
                Recipient::from(&warehouse_head),
                InventoryNotice::ReadyForIssuance {
                    request: request.clone(),
                    approver_name: actor.name.clone(),
                },
            ),
            Ok(None) => tracing::warn!(request_id = %request.id, "No Warehouse Head to notify"),
            Err(err) => tracing::warn!(request_id = %request.id, "Warehouse Head lookup failed: {}", err),
        }

        Ok(request)
    }

    /// Department head rejects a pending request
    pub async fn reject_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
        input: RejectRequestInput,
    ) -> AppResult<InventoryRequest> {
        input.validate()?;
        self.transition(actor, request_id, Transition::Reject { reason: input.reason })
            .await
    }

    /// Warehouse issues stock from a batch against an approved request
    pub async fn issue_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
        input: IssueRequestInput,
    ) -> AppResult<IssuedRequest> {
        input.validate()?;

        let mut request = self.get_request(request_id).await?.request;
        let expected = request.status;
        let transition = Transition::Issue {
            batch_id: input.batch_id.clone(),
            quantity: input.quantity,
        };
        request.apply(actor, &transition, &self.policy, Utc::now())?;
        let batch_id = request.batch_id.clone().unwrap_or_default();

        let mut tx = self.db.begin().await?;
        self.compare_and_swap(&mut tx, &request, expected, transition.verb())
            .await?;
        let remaining =
            LedgerService::issue_with(&mut tx, actor, &request.item, &batch_id, input.quantity)
                .await?;
        sqlx::query(
            "INSERT INTO claim_alerts (request_id) VALUES ($1) ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(request.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            actor = %actor.id,
            batch_id = %batch_id,
            quantity = %input.quantity,
            "Inventory request issued"
        );

        let identity = IdentityService::new(self.db.clone());
        match identity.find_active(request.requested_by).await {
            Ok(Some(requester)) => self.notifications.dispatch(
                Recipient::from(&requester),
                InventoryNotice::ReadyForCollection {
                    request: request.clone(),
                },
            ),
            Ok(None) => tracing::warn!(request_id = %request.id, "Requester inactive, not notified"),
            Err(err) => tracing::warn!(request_id = %request.id, "Requester lookup failed: {}", err),
        }

        Ok(IssuedRequest {
            request,
            batch_id,
            issued_quantity: input.quantity,
            remaining_balance: remaining,
        })
    }

    /// Requester acknowledges receipt; clears the claim alert
    pub async fn claim_request(&self, actor: &Actor, request_id: Uuid) -> AppResult<InventoryRequest> {
        self.transition(actor, request_id, Transition::Claim).await
    }

    /// Apply a transition that has no ledger effect
    async fn transition(
        &self,
        actor: &Actor,
        request_id: Uuid,
        transition: Transition,
    ) -> AppResult<InventoryRequest> {
        let mut request = self.get_request(request_id).await?.request;
        let expected = request.status;

        if let Err(err) = request.apply(actor, &transition, &self.policy, Utc::now()) {
            tracing::warn!(
                request_id = %request_id,
                actor = %actor.id,
                transition = transition.verb(),
                "Transition refused: {}",
                err
            );
            return Err(err.into());
        }

        let mut tx = self.db.begin().await?;
        self.compare_and_swap(&mut tx, &request, expected, transition.verb())
            .await?;
        if matches!(transition, Transition::Claim) {
            sqlx::query("DELETE FROM claim_alerts WHERE request_id = $1")
                .bind(request.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            request_id = %request.id,
            actor = %actor.id,
            status = request.status.as_str(),
            "Inventory request {}",
            request.status
        );

        Ok(request)
    }

    /// Persist `request` only if its stored status is still `expected`
    async fn compare_and_swap(
        &self,
        conn: &mut PgConnection,
        request: &InventoryRequest,
        expected: RequestStatus,
        attempted: &'static str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_requests SET
                status = $3,
                pending_approval_from = $4,
                approved_by = $5,
                approved_at = $6,
                rejected_by = $7,
                rejected_at = $8,
                rejection_reason = $9,
                issued_by = $10,
                issued_at = $11,
                batch_id = $12,
                quantity_issued = $13,
                claimed_at = $14,
                updated_at = $15
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(request.id)
        .bind(expected.as_str())
        .bind(request.status.as_str())
        .bind(request.pending_approval_from)
        .bind(request.approved_by)
        .bind(request.approved_at)
        .bind(request.rejected_by)
        .bind(request.rejected_at)
        .bind(&request.rejection_reason)
        .bind(request.issued_by)
        .bind(request.issued_at)
        .bind(&request.batch_id)
        .bind(request.quantity_issued)
        .bind(request.claimed_at)
        .bind(request.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Another actor moved the request first
        let current = sqlx::query_scalar::<_, String>(
            "SELECT status FROM inventory_requests WHERE id = $1",
        )
        .bind(request.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DomainError::RequestNotFound)?;

        let current: RequestStatus = current.parse().map_err(AppError::Internal)?;
        tracing::warn!(
            request_id = %request.id,
            current = current.as_str(),
            attempted,
            "Lost status race"
        );
        Err(DomainError::InvalidState { current, attempted }.into())
    }

    /// Load a single request
    pub async fn get_request(&self, request_id: Uuid) -> AppResult<RequestWithRequester> {
        let row = sqlx::query_as::<_, RequestRow>(&select_requests("WHERE r.id = $1"))
            .bind(request_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(DomainError::RequestNotFound)?;

        RequestWithRequester::try_from(row)
    }

    /// Requests filed by the actor, newest first
    pub async fn list_my_requests(&self, actor: &Actor) -> AppResult<Vec<RequestWithRequester>> {
        let rows = sqlx::query_as::<_, RequestRow>(&select_requests(
            "WHERE r.requested_by = $1 ORDER BY r.created_at DESC",
        ))
        .bind(actor.id)
        .fetch_all(&self.db)
        .await?;

        collect_rows(rows)
    }

    /// Requests of the head's departments, optionally filtered by status
    pub async fn list_department_requests(
        &self,
        actor: &Actor,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<RequestWithRequester>> {
        let rows = sqlx::query_as::<_, RequestRow>(&select_requests(
            r#"
            WHERE lower(btrim(r.department, E' \t\r\n')) = ANY($1)
              AND ($2::TEXT IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC
            "#,
        ))
        .bind(actor.department_keys())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        collect_rows(rows)
    }

    /// Everything waiting for the warehouse, oldest first
    pub async fn list_pending_issuance(&self) -> AppResult<Vec<RequestWithRequester>> {
        let rows = sqlx::query_as::<_, RequestRow>(&select_requests(
            "WHERE r.status = $1 ORDER BY r.created_at ASC",
        ))
        .bind(RequestStatus::PendingWarehouseIssuance.as_str())
        .fetch_all(&self.db)
        .await?;

        collect_rows(rows)
    }

    /// Earlier requests by one employee for the same item
    pub async fn past_usage(
        &self,
        requester_id: Uuid,
        item: &str,
    ) -> AppResult<Vec<RequestWithRequester>> {
        let rows = sqlx::query_as::<_, RequestRow>(&select_requests(
            "WHERE r.requested_by = $1 AND r.item_key = $2 ORDER BY r.created_at DESC",
        ))
        .bind(requester_id)
        .bind(normalize_item_name(item))
        .fetch_all(&self.db)
        .await?;

        collect_rows(rows)
    }

    /// Issued and claimed requests, latest issuance first
    pub async fn issued_history(&self) -> AppResult<Vec<RequestWithRequester>> {
        let rows = sqlx::query_as::<_, RequestRow>(&select_requests(
            "WHERE r.status IN ($1, $2) ORDER BY r.issued_at DESC",
        ))
        .bind(RequestStatus::Issued.as_str())
        .bind(RequestStatus::Claimed.as_str())
        .fetch_all(&self.db)
        .await?;

        collect_rows(rows)
    }

    /// Open requests whose item's total balance is below the requested quantity
    pub async fn stock_shortages(&self) -> AppResult<Vec<StockShortage>> {
        let shortages = sqlx::query_as::<_, StockShortage>(
            r#"
            SELECT * FROM (
                SELECT r.id AS request_id, r.item, r.unit, r.quantity AS requested,
                       COALESCE((
                           SELECT SUM(b.quantity - b.issued)
                           FROM inventory_items i
                           JOIN inventory_batches b ON b.item_id = i.id
                           WHERE i.normalized_name = r.item_key
                       ), 0) AS total_available,
                       r.status, r.department,
                       e.name AS requester_name, e.emp_code AS requester_code,
                       r.created_at
                FROM inventory_requests r
                JOIN employees e ON e.id = r.requested_by
                WHERE r.status IN ($1, $2)
            ) open_requests
            WHERE total_available < requested
            ORDER BY created_at DESC
            "#,
        )
        .bind(RequestStatus::PendingDepartmentHeadApproval.as_str())
        .bind(RequestStatus::PendingWarehouseIssuance.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(shortages)
    }
}
