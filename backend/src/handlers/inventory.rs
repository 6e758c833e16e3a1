//! HTTP handlers for stock (batch ledger) endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{InventoryItem, ItemBalance};

use crate::error::{AppError, AppResult};
use crate::middleware::{require, CurrentUser};
use crate::services::ledger::{ItemSummary, LedgerService, RecordReceiptInput};
use crate::AppState;

/// Record a received batch
pub async fn add_stock_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordReceiptInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    let actor = current_user.actor();
    require(
        state.policy.may_record_receipt(actor),
        "Only Warehouse or Production staff may add stock",
    )?;

    let service = LedgerService::new(state.db);
    let item = service.record_receipt(actor, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// All items with per-batch balances
pub async fn get_stock_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ItemBalance>>> {
    let service = LedgerService::new(state.db);
    let status = service.stock_status().await?;
    Ok(Json(status))
}

/// Item catalog for the request form
pub async fn list_items(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ItemSummary>>> {
    let service = LedgerService::new(state.db);
    let items = service.list_items().await?;
    Ok(Json(items))
}

/// Query parameters for a single item's balance
#[derive(Debug, Deserialize)]
pub struct ItemBalanceQuery {
    pub item: String,
}

/// Available balance of one item, matched by normalized name
pub async fn get_item_balance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ItemBalanceQuery>,
) -> AppResult<Json<ItemBalance>> {
    let service = LedgerService::new(state.db);
    let balance = service
        .available_balance(&query.item)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory item '{}'", query.item)))?;
    Ok(Json(balance))
}
