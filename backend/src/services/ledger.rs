//! Batch ledger: durable stock state per item and batch
//!
//! Balances are never stored; every read re-sums `quantity - issued` over the
//! batches. The only mutator of `issued` is a single conditional UPDATE, so
//! concurrent issuances against one batch cannot oversubscribe it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    normalize_item_name, validate_positive_quantity, validate_rate, validate_text, validate_unit,
    Actor, Batch, DomainError, InventoryItem, ItemBalance,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Ledger service for stock receipts, balances and issuance
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Input for recording a received batch
#[derive(Debug, Deserialize)]
pub struct RecordReceiptInput {
    pub item_name: String,
    pub unit: String,
    pub batch_id: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

/// Catalog entry for the item picker
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItemSummary {
    pub item_name: String,
    pub unit: String,
}

/// Row for item queries
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    item_name: String,
    unit: String,
    created_at: DateTime<Utc>,
}

/// Row for batch queries
#[derive(Debug, FromRow)]
struct BatchRow {
    item_id: Uuid,
    batch_id: String,
    quantity: Decimal,
    issued: Decimal,
    rate: Decimal,
    added_by: Uuid,
    added_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            batch_id: row.batch_id,
            quantity: row.quantity,
            issued: row.issued,
            rate: row.rate,
            added_by: row.added_by,
            added_at: row.added_at,
        }
    }
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a received batch, creating the item on first receipt
    pub async fn record_receipt(
        &self,
        actor: &Actor,
        input: RecordReceiptInput,
    ) -> AppResult<InventoryItem> {
        let item_name = validate_text("item_name", &input.item_name, 200)?;
        let unit = validate_unit(&input.unit)?;
        let batch_id = validate_text("batch_id", &input.batch_id, 100)?;
        validate_positive_quantity(input.quantity)?;
        validate_rate(input.rate)?;

        let normalized = normalize_item_name(&item_name);
        let mut tx = self.db.begin().await?;

        // Find-or-create; concurrent first receipts of one item converge on a single row
        let item = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO inventory_items (item_name, normalized_name, unit)
            VALUES ($1, $2, $3)
            ON CONFLICT (normalized_name) DO UPDATE SET updated_at = NOW()
            RETURNING id, item_name, unit, created_at
            "#,
        )
        .bind(&item_name)
        .bind(&normalized)
        .bind(&unit)
        .fetch_one(&mut *tx)
        .await?;

        if !item.unit.eq_ignore_ascii_case(&unit) {
            return Err(AppError::Validation {
                field: "unit".to_string(),
                message: format!(
                    "{} is stocked in {}, not {}",
                    item.item_name, item.unit, unit
                ),
            });
        }

        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO inventory_batches (item_id, batch_id, quantity, issued, rate, added_by)
            VALUES ($1, $2, $3, 0, $4, $5)
            ON CONFLICT (item_id, batch_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(item.id)
        .bind(&batch_id)
        .bind(input.quantity)
        .bind(input.rate)
        .bind(actor.id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            return Err(DomainError::DuplicateBatch {
                item: item.item_name,
                batch_id,
            }
            .into());
        }

        tx.commit().await?;

        tracing::info!(
            item = %item.item_name,
            batch_id = %batch_id,
            quantity = %input.quantity,
            actor = %actor.id,
            "Recorded stock receipt"
        );

        self.find_item(&item.item_name)
            .await?
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))
    }

    /// Find an item and its batches by normalized name
    pub async fn find_item(&self, item_name: &str) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, item_name, unit, created_at
            FROM inventory_items
            WHERE normalized_name = $1
            "#,
        )
        .bind(normalize_item_name(item_name))
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.attach_batches(vec![row]).await?;
        Ok(items.pop())
    }

    /// Per-batch and total available balance for an item
    pub async fn available_balance(&self, item_name: &str) -> AppResult<Option<ItemBalance>> {
        Ok(self.find_item(item_name).await?.map(|item| item.balance()))
    }

    /// Issue from a batch on an existing connection or transaction.
    ///
    /// The balance check and the increment are one statement; if the
    /// predicate fails nothing is written and the current balance is reported.
    pub async fn issue_with(
        conn: &mut PgConnection,
        actor: &Actor,
        item_name: &str,
        batch_id: &str,
        quantity: Decimal,
    ) -> AppResult<Decimal> {
        validate_positive_quantity(quantity)?;
        let normalized = normalize_item_name(item_name);
        let batch_id = batch_id.trim();

        let item_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM inventory_items WHERE normalized_name = $1",
        )
        .bind(&normalized)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DomainError::ItemNotFound(item_name.to_string()))?;

        let new_balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE inventory_batches
            SET issued = issued + $3
            WHERE item_id = $1 AND batch_id = $2 AND issued + $3 <= quantity
            RETURNING quantity - issued
            "#,
        )
        .bind(item_id)
        .bind(batch_id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(balance) = new_balance {
            tracing::info!(
                item = %item_name,
                batch_id = %batch_id,
                quantity = %quantity,
                balance = %balance,
                actor = %actor.id,
                "Issued stock"
            );
            return Ok(balance);
        }

        let available = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity - issued FROM inventory_batches WHERE item_id = $1 AND batch_id = $2",
        )
        .bind(item_id)
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?;

        let err = match available {
            Some(available) => DomainError::InsufficientStock {
                item: item_name.to_string(),
                batch_id: batch_id.to_string(),
                requested: quantity,
                available,
            },
            None => DomainError::BatchNotFound {
                item: item_name.to_string(),
                batch_id: batch_id.to_string(),
            },
        };
        Err(err.into())
    }

    /// All items with their batch balances
    pub async fn stock_status(&self) -> AppResult<Vec<ItemBalance>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, item_name, unit, created_at
            FROM inventory_items
            ORDER BY item_name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let items = self.attach_batches(rows).await?;
        Ok(items.iter().map(InventoryItem::balance).collect())
    }

    /// Item catalog (name and unit only)
    pub async fn list_items(&self) -> AppResult<Vec<ItemSummary>> {
        let items = sqlx::query_as::<_, ItemSummary>(
            "SELECT item_name, unit FROM inventory_items ORDER BY item_name ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    async fn attach_batches(&self, rows: Vec<ItemRow>) -> AppResult<Vec<InventoryItem>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let batches = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT item_id, batch_id, quantity, issued, rate, added_by, added_at
            FROM inventory_batches
            WHERE item_id = ANY($1)
            ORDER BY added_at ASC, batch_id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut items: Vec<InventoryItem> = rows
            .into_iter()
            .map(|r| InventoryItem {
                id: r.id,
                item_name: r.item_name,
                unit: r.unit,
                batches: Vec::new(),
                created_at: r.created_at,
            })
            .collect();

        for batch in batches {
            if let Some(item) = items.iter_mut().find(|i| i.id == batch.item_id) {
                item.batches.push(batch.into());
            }
        }

        Ok(items)
    }
}
