//! HTTP handlers for claim and stock alerts

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require, CurrentUser};
use crate::services::claim_alert::{ClaimAlertService, ClaimAlertView};
use crate::services::requests::{RequestService, StockShortage};
use crate::AppState;

const ALERTS_FORBIDDEN: &str = "Only leadership or designated heads may view alerts";

fn alert_service(state: AppState) -> ClaimAlertService {
    ClaimAlertService::new(state.db, state.policy.as_ref().clone(), state.notifications)
}

/// Issued requests with claim timing
pub async fn get_claim_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ClaimAlertView>>> {
    require(state.policy.may_view_alerts(current_user.actor()), ALERTS_FORBIDDEN)?;

    let alerts = alert_service(state).list_alerts(Utc::now()).await?;
    Ok(Json(alerts))
}

/// Open requests that stock cannot cover
pub async fn get_stock_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockShortage>>> {
    require(state.policy.may_view_alerts(current_user.actor()), ALERTS_FORBIDDEN)?;

    let service = RequestService::new(state.db, state.policy.as_ref().clone(), state.notifications);
    let shortages = service.stock_shortages().await?;
    Ok(Json(shortages))
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub flagged: Vec<Uuid>,
}

/// Run the claim sweep immediately
pub async fn run_claim_sweep(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SweepResponse>> {
    let actor = current_user.actor();
    require(state.policy.may_view_alerts(actor), ALERTS_FORBIDDEN)?;

    let flagged = alert_service(state).sweep(Utc::now()).await?;
    tracing::info!(actor = %actor.id, count = flagged.len(), "Manual claim sweep");
    Ok(Json(SweepResponse { flagged }))
}
