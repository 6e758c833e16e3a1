//! Inventory request lifecycle models.
//!
//! A request moves strictly forward:
//!
//! ```text
//! PendingDepartmentHeadApproval -> PendingWarehouseIssuance -> Issued -> Claimed
//!              \-> Rejected
//! ```
//!
//! Leadership requests enter directly at `PendingWarehouseIssuance`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::Actor;
use crate::policy::InventoryPolicy;
use crate::routing::RoutingDecision;
use crate::validation::{validate_positive_quantity, validate_text};

/// Lifecycle state of an inventory request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PendingDepartmentHeadApproval,
    PendingWarehouseIssuance,
    Issued,
    Claimed,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::PendingDepartmentHeadApproval,
        RequestStatus::PendingWarehouseIssuance,
        RequestStatus::Issued,
        RequestStatus::Claimed,
        RequestStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::PendingDepartmentHeadApproval => "pending_department_head_approval",
            RequestStatus::PendingWarehouseIssuance => "pending_warehouse_issuance",
            RequestStatus::Issued => "issued",
            RequestStatus::Claimed => "claimed",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Claimed | RequestStatus::Rejected)
    }

    /// Legal single-step moves of the state machine
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (PendingDepartmentHeadApproval, PendingWarehouseIssuance)
                | (PendingDepartmentHeadApproval, Rejected)
                | (PendingWarehouseIssuance, Issued)
                | (Issued, Claimed)
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::PendingDepartmentHeadApproval => {
                write!(f, "Pending Department Head Approval")
            }
            RequestStatus::PendingWarehouseIssuance => write!(f, "Pending Warehouse Issuance"),
            RequestStatus::Issued => write!(f, "Issued"),
            RequestStatus::Claimed => write!(f, "Claimed"),
            RequestStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown request status: {}", s))
    }
}

/// Informational urgency; does not affect routing or processing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            other => Err(format!("Unknown urgency: {}", other)),
        }
    }
}

/// An employee's request for a consumable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRequest {
    pub id: Uuid,
    /// Free-text item name; matched against stock by normalized name only
    pub item: String,
    pub unit: String,
    pub quantity: Decimal,
    pub reason: String,
    pub urgency: Urgency,
    /// Requester's primary department at creation time
    pub department: String,
    pub requested_by: Uuid,
    pub status: RequestStatus,
    pub pending_approval_from: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub issued_by: Option<Uuid>,
    pub issued_at: Option<DateTime<Utc>>,
    pub batch_id: Option<String>,
    pub quantity_issued: Option<Decimal>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Requester input for a new request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub item: String,
    pub quantity: Decimal,
    pub reason: String,
    #[serde(default)]
    pub urgency: Urgency,
    /// Used only when the item has no stock record yet
    pub unit: Option<String>,
}

/// A move along the state machine, carrying its own inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Approve,
    Reject { reason: String },
    Issue { batch_id: String, quantity: Decimal },
    Claim,
}

impl Transition {
    pub fn verb(&self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject { .. } => "reject",
            Transition::Issue { .. } => "issue",
            Transition::Claim => "claim",
        }
    }

    pub fn target(&self) -> RequestStatus {
        match self {
            Transition::Approve => RequestStatus::PendingWarehouseIssuance,
            Transition::Reject { .. } => RequestStatus::Rejected,
            Transition::Issue { .. } => RequestStatus::Issued,
            Transition::Claim => RequestStatus::Claimed,
        }
    }
}

impl InventoryRequest {
    /// Build a new request from validated input and a routing decision
    pub fn open(
        input: NewRequest,
        requester: &Actor,
        routing: &RoutingDecision,
        unit: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let item = validate_text("item", &input.item, 200)?;
        let reason = validate_text("reason", &input.reason, 1000)?;
        validate_positive_quantity(input.quantity)?;
        let department = requester
            .primary_department()
            .ok_or_else(|| DomainError::validation("department", "Requester has no department"))?
            .to_string();

        let (approved_by, approved_at) = if routing.self_approved {
            (Some(requester.id), Some(now))
        } else {
            (None, None)
        };

        Ok(Self {
            id: Uuid::new_v4(),
            item,
            unit,
            quantity: input.quantity,
            reason,
            urgency: input.urgency,
            department,
            requested_by: requester.id,
            status: routing.entry_status,
            pending_approval_from: routing.pending_approval_from,
            approved_by,
            approved_at,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            issued_by: None,
            issued_at: None,
            batch_id: None,
            quantity_issued: None,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check that `actor` may perform `transition` on this request right now.
    ///
    /// State is checked before identity so a finished request always reports
    /// `InvalidState`, whoever asks.
    pub fn authorize(
        &self,
        actor: &Actor,
        transition: &Transition,
        policy: &InventoryPolicy,
    ) -> DomainResult<()> {
        if !self.status.can_transition_to(transition.target()) {
            return Err(DomainError::InvalidState {
                current: self.status,
                attempted: transition.verb(),
            });
        }

        match transition {
            Transition::Approve | Transition::Reject { .. } => {
                if !policy.may_approve_for(actor, &self.department) {
                    return Err(DomainError::ForbiddenTransition(format!(
                        "Only a Head of the {} department can {} this request",
                        self.department,
                        transition.verb()
                    )));
                }
            }
            Transition::Issue { .. } => {
                if !policy.may_issue(actor) {
                    return Err(DomainError::ForbiddenTransition(
                        "Only Warehouse or Production personnel can issue stock".to_string(),
                    ));
                }
            }
            Transition::Claim => {
                if actor.id != self.requested_by {
                    return Err(DomainError::ForbiddenTransition(
                        "Only the requester can claim this item".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate the inputs a transition carries
    pub fn validate_transition(&self, transition: &Transition) -> DomainResult<()> {
        match transition {
            Transition::Reject { reason } => {
                validate_text("reason", reason, 1000)?;
            }
            Transition::Issue { batch_id, quantity } => {
                validate_text("batch_id", batch_id, 100)?;
                validate_positive_quantity(*quantity)?;
                if *quantity > self.quantity {
                    return Err(DomainError::validation(
                        "quantity",
                        format!(
                            "Cannot issue {} when only {} was requested",
                            quantity.normalize(),
                            self.quantity.normalize()
                        ),
                    ));
                }
            }
            Transition::Approve | Transition::Claim => {}
        }
        Ok(())
    }

    /// Authorize, validate and apply a transition in memory.
    ///
    /// Ledger effects of issuance are applied by the caller; this only
    /// records them on the request.
    pub fn apply(
        &mut self,
        actor: &Actor,
        transition: &Transition,
        policy: &InventoryPolicy,
        now: DateTime<Utc>,
    ) -> DomainResult<RequestStatus> {
        self.authorize(actor, transition, policy)?;
        self.validate_transition(transition)?;

        match transition {
            Transition::Approve => {
                self.approved_by = Some(actor.id);
                self.approved_at = Some(now);
                self.pending_approval_from = None;
            }
            Transition::Reject { reason } => {
                self.rejected_by = Some(actor.id);
                self.rejected_at = Some(now);
                self.rejection_reason = Some(reason.trim().to_string());
                self.pending_approval_from = None;
            }
            Transition::Issue { batch_id, quantity } => {
                self.issued_by = Some(actor.id);
                self.issued_at = Some(now);
                self.batch_id = Some(batch_id.trim().to_string());
                self.quantity_issued = Some(*quantity);
            }
            Transition::Claim => {
                self.claimed_at = Some(now);
            }
        }

        self.status = transition.target();
        self.updated_at = now;
        Ok(self.status)
    }

    /// Time since issuance, for issued requests only
    pub fn elapsed_since_issue(&self, now: DateTime<Utc>) -> Option<Duration> {
        match (self.status, self.issued_at) {
            (RequestStatus::Issued, Some(issued_at)) => Some(now - issued_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
        assert!("pending".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [RequestStatus::Claimed, RequestStatus::Rejected] {
            for to in RequestStatus::ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn issued_cannot_be_reached_from_approval_state() {
        assert!(!RequestStatus::PendingDepartmentHeadApproval.can_transition_to(RequestStatus::Issued));
        assert!(!RequestStatus::PendingWarehouseIssuance.can_transition_to(RequestStatus::Rejected));
    }

    #[test]
    fn each_transition_has_a_single_source() {
        let transitions = [
            Transition::Approve,
            Transition::Reject { reason: "n/a".to_string() },
            Transition::Issue { batch_id: "B1".to_string(), quantity: Decimal::ONE },
            Transition::Claim,
        ];
        for t in transitions {
            let sources = RequestStatus::ALL
                .iter()
                .filter(|s| s.can_transition_to(t.target()))
                .count();
            assert_eq!(sources, 1, "{}", t.verb());
        }
    }
}
