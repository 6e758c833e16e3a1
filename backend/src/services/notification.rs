//! Notification port for inventory lifecycle events
//!
//! Dispatch is fire-and-forget: the caller's transition has already committed
//! and never waits on delivery. Each notice is recorded in `notification_log`
//! and, when a mail relay is configured, posted to it.

use serde::Serialize;
use shared::{Actor, InventoryRequest};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};

/// Notification service for lifecycle notices
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    relay: Option<MailRelayClient>,
    sender: String,
}

/// HTTP mail relay client
#[derive(Clone)]
pub struct MailRelayClient {
    endpoint: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

/// Who a notice goes to
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl From<&Actor> for Recipient {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name.clone(),
            email: actor.email.clone(),
        }
    }
}

/// Events in the request lifecycle that someone should hear about
#[derive(Debug, Clone)]
pub enum InventoryNotice {
    /// To the department head who must approve
    NewRequest {
        request: InventoryRequest,
        requester_name: String,
        requester_code: String,
    },
    /// To the Warehouse Head once approved
    ReadyForIssuance {
        request: InventoryRequest,
        approver_name: String,
    },
    /// To the requester once issued
    ReadyForCollection { request: InventoryRequest },
    /// To the requester's department head when the claim window lapses
    ClaimOverdue {
        request: InventoryRequest,
        elapsed_minutes: i64,
    },
}

impl InventoryNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryNotice::NewRequest { .. } => "new_request",
            InventoryNotice::ReadyForIssuance { .. } => "ready_for_issuance",
            InventoryNotice::ReadyForCollection { .. } => "ready_for_collection",
            InventoryNotice::ClaimOverdue { .. } => "claim_overdue",
        }
    }

    pub fn request(&self) -> &InventoryRequest {
        match self {
            InventoryNotice::NewRequest { request, .. }
            | InventoryNotice::ReadyForIssuance { request, .. }
            | InventoryNotice::ReadyForCollection { request }
            | InventoryNotice::ClaimOverdue { request, .. } => request,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            InventoryNotice::NewRequest { requester_name, .. } => {
                format!("New Inventory Request by {}", requester_name)
            }
            InventoryNotice::ReadyForIssuance { .. } => {
                "Inventory Request Ready for Issuance".to_string()
            }
            InventoryNotice::ReadyForCollection { request } => {
                format!("Your Item is Ready for Collection - {}", request.item)
            }
            InventoryNotice::ClaimOverdue { request, .. } => {
                format!("Unclaimed Item Overdue - {}", request.item)
            }
        }
    }

    /// Plain-text body addressed to `recipient_name`
    pub fn body(&self, recipient_name: &str) -> String {
        let request = self.request();
        let quantity = format!("{} {}", request.quantity.normalize(), request.unit);

        let lead = match self {
            InventoryNotice::NewRequest {
                requester_name,
                requester_code,
                ..
            } => format!(
                "A new inventory request has been created by {} ({}) from the {} department.\n\
                 Urgency: {}\nReason: {}\n\
                 Please log in to review and approve it.",
                requester_name,
                requester_code,
                request.department,
                request.urgency.as_str(),
                request.reason
            ),
            InventoryNotice::ReadyForIssuance { approver_name, .. } => format!(
                "A request from the {} department has been approved by {} and is ready for issuance.",
                request.department, approver_name
            ),
            InventoryNotice::ReadyForCollection { request } => format!(
                "Your requested item has been issued from batch {} and is ready for collection.\n\
                 Please collect it and mark it as claimed.",
                request.batch_id.as_deref().unwrap_or("N/A")
            ),
            InventoryNotice::ClaimOverdue {
                elapsed_minutes, ..
            } => format!(
                "An item issued to your department {} minutes ago has not been claimed.",
                elapsed_minutes
            ),
        };

        format!(
            "Dear {},\n\n{}\n\nItem: {}\nQuantity: {}\nRequest: {}\n",
            recipient_name, lead, request.item, quantity, request.id
        )
    }
}

/// Mail relay payload
#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl MailRelayClient {
    /// Create a new relay client
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            endpoint,
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    async fn send(&self, message: &RelayMessage<'_>) -> Result<(), String> {
        let mut request = self.http_client.post(&self.endpoint).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Failed to reach mail relay: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("Mail relay responded with {}", response.status()))
        }
    }
}

impl NotificationService {
    /// Create a NotificationService from configuration
    pub fn new(db: PgPool, config: &NotificationConfig) -> Self {
        let relay = config
            .mail_relay_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| MailRelayClient::new(url.clone(), config.mail_relay_api_key.clone()));

        Self {
            db,
            relay,
            sender: config.sender.clone(),
        }
    }

    /// Send a notice in the background; failures are logged, never returned
    pub fn dispatch(&self, recipient: Recipient, notice: InventoryNotice) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.deliver(&recipient, &notice).await {
                tracing::warn!(
                    kind = notice.kind(),
                    recipient = %recipient.id,
                    request_id = %notice.request().id,
                    "Notification failed: {}",
                    err
                );
            }
        });
    }

    async fn deliver(&self, recipient: &Recipient, notice: &InventoryNotice) -> AppResult<()> {
        let subject = notice.subject();
        let body = notice.body(&recipient.name);

        let log_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO notification_log (recipient_id, recipient_email, kind, subject, body, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(recipient.id)
        .bind(&recipient.email)
        .bind(notice.kind())
        .bind(&subject)
        .bind(&body)
        .bind(notice.request().id)
        .fetch_one(&self.db)
        .await?;

        let outcome = match (&self.relay, recipient.email.as_deref()) {
            (Some(relay), Some(to)) => {
                let message = RelayMessage {
                    from: &self.sender,
                    to,
                    subject: &subject,
                    text: &body,
                };
                relay.send(&message).await.map(|_| "sent")
            }
            _ => Ok("logged"),
        };

        let (status, error_message) = match &outcome {
            Ok(status) => (*status, None),
            Err(e) => ("failed", Some(e.clone())),
        };

        sqlx::query(
            r#"
            UPDATE notification_log
            SET status = $2, error_message = $3, sent_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(log_id)
        .bind(status)
        .bind(&error_message)
        .execute(&self.db)
        .await?;

        outcome.map(|_| ()).map_err(AppError::Internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::{RequestStatus, Urgency};

    fn request() -> InventoryRequest {
        let now = Utc::now();
        InventoryRequest {
            id: Uuid::new_v4(),
            item: "Nitrile Gloves".to_string(),
            unit: "pcs".to_string(),
            quantity: Decimal::from(50),
            reason: "Line clearance".to_string(),
            urgency: Urgency::High,
            department: "Production".to_string(),
            requested_by: Uuid::new_v4(),
            status: RequestStatus::Issued,
            pending_approval_from: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            issued_by: None,
            issued_at: Some(now),
            batch_id: Some("B1".to_string()),
            quantity_issued: Some(Decimal::from(50)),
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn collection_notice_names_batch_and_item() {
        let notice = InventoryNotice::ReadyForCollection { request: request() };
        assert_eq!(notice.kind(), "ready_for_collection");
        assert_eq!(notice.subject(), "Your Item is Ready for Collection - Nitrile Gloves");

        let body = notice.body("Asha");
        assert!(body.starts_with("Dear Asha,"));
        assert!(body.contains("batch B1"));
        assert!(body.contains("Quantity: 50 pcs"));
    }

    #[test]
    fn new_request_notice_carries_requester() {
        let notice = InventoryNotice::NewRequest {
            request: request(),
            requester_name: "Ravi".to_string(),
            requester_code: "E104".to_string(),
        };
        assert_eq!(notice.subject(), "New Inventory Request by Ravi");
        let body = notice.body("Head");
        assert!(body.contains("Ravi (E104) from the Production department"));
        assert!(body.contains("Urgency: high"));
    }

    #[test]
    fn overdue_notice_reports_elapsed_minutes() {
        let notice = InventoryNotice::ClaimOverdue {
            request: request(),
            elapsed_minutes: 31,
        };
        assert!(notice.body("Head").contains("31 minutes ago"));
    }
}
