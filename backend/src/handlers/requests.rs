//! HTTP handlers for inventory request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{InventoryRequest, RequestStatus};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{require, CurrentUser};
use crate::services::requests::{
    CreateRequestInput, CreatedRequest, IssueRequestInput, IssuedRequest, RejectRequestInput,
    RequestService, RequestWithRequester,
};
use crate::AppState;

fn request_service(state: AppState) -> RequestService {
    RequestService::new(state.db, state.policy.as_ref().clone(), state.notifications)
}

// ============================================================================
// Lifecycle
// ============================================================================

/// File a new request
pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<(StatusCode, Json<CreatedRequest>)> {
    let created = request_service(state)
        .create_request(current_user.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Approve a pending request
pub async fn approve_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<InventoryRequest>> {
    let request = request_service(state)
        .approve_request(current_user.actor(), request_id)
        .await?;
    Ok(Json(request))
}

/// Reject a pending request
pub async fn reject_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<RejectRequestInput>,
) -> AppResult<Json<InventoryRequest>> {
    let request = request_service(state)
        .reject_request(current_user.actor(), request_id, input)
        .await?;
    Ok(Json(request))
}

/// Issue stock against an approved request
pub async fn issue_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    Json(input): Json<IssueRequestInput>,
) -> AppResult<Json<IssuedRequest>> {
    let issued = request_service(state)
        .issue_request(current_user.actor(), request_id, input)
        .await?;
    Ok(Json(issued))
}

/// Acknowledge collection of an issued request
pub async fn claim_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<InventoryRequest>> {
    let request = request_service(state)
        .claim_request(current_user.actor(), request_id)
        .await?;
    Ok(Json(request))
}

// ============================================================================
// Lists
// ============================================================================

/// Requests filed by the caller
pub async fn list_my_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RequestWithRequester>>> {
    let requests = request_service(state)
        .list_my_requests(current_user.actor())
        .await?;
    Ok(Json(requests))
}

/// Query parameters for the department list
#[derive(Debug, Deserialize)]
pub struct DepartmentRequestsQuery {
    pub status: Option<String>,
}

/// Requests of the caller's departments
pub async fn list_department_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DepartmentRequestsQuery>,
) -> AppResult<Json<Vec<RequestWithRequester>>> {
    let actor = current_user.actor();
    require(
        state.policy.may_view_department_requests(actor),
        "Only department heads may view department requests",
    )?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(|message| AppError::Validation {
            field: "status".to_string(),
            message,
        })?;

    let requests = request_service(state)
        .list_department_requests(actor, status)
        .await?;
    Ok(Json(requests))
}

/// Approved requests waiting for the warehouse
pub async fn list_pending_issuance(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RequestWithRequester>>> {
    require(
        state.policy.may_view_issuance_queue(current_user.actor()),
        "Only warehouse staff or leadership may view the issuance queue",
    )?;

    let requests = request_service(state).list_pending_issuance().await?;
    Ok(Json(requests))
}

/// Query parameters for past usage
#[derive(Debug, Deserialize)]
pub struct PastUsageQuery {
    pub requester_id: Uuid,
    pub item: String,
}

/// Earlier requests by one employee for the same item
pub async fn get_past_usage(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PastUsageQuery>,
) -> AppResult<Json<Vec<RequestWithRequester>>> {
    let requests = request_service(state)
        .past_usage(query.requester_id, &query.item)
        .await?;
    Ok(Json(requests))
}

/// Issued and claimed requests
pub async fn get_issued_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RequestWithRequester>>> {
    require(
        state.policy.may_view_history(current_user.actor()),
        "Not allowed to view issuance history",
    )?;

    let history = request_service(state).issued_history().await?;
    Ok(Json(history))
}
