//! Approval routing for new inventory requests

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{Actor, RequestStatus, Role};
use crate::policy::InventoryPolicy;

/// Where a new request enters the lifecycle and who acts next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub entry_status: RequestStatus,
    pub self_approved: bool,
    pub pending_approval_from: Option<Uuid>,
}

impl RoutingDecision {
    pub fn self_approved() -> Self {
        Self {
            entry_status: RequestStatus::PendingWarehouseIssuance,
            self_approved: true,
            pending_approval_from: None,
        }
    }

    pub fn needs_approval(head: Uuid) -> Self {
        Self {
            entry_status: RequestStatus::PendingDepartmentHeadApproval,
            self_approved: false,
            pending_approval_from: Some(head),
        }
    }
}

/// Choose the approver among candidate heads.
///
/// Candidates must hold role Head and share at least one department with
/// the requester. Ties break on the lowest employee code, then on id, so the
/// result never depends on lookup order.
pub fn select_approver<'a>(requester: &Actor, candidates: &'a [Actor]) -> Option<&'a Actor> {
    candidates
        .iter()
        .filter(|c| c.role == Role::Head && c.id != requester.id)
        .filter(|c| c.shares_department_with(&requester.departments))
        .min_by(|a, b| a.emp_code.cmp(&b.emp_code).then(a.id.cmp(&b.id)))
}

/// Decide the approval path for a request filed by `requester`.
///
/// Fails with `NoApproverFound` when approval is needed and no head of the
/// requester's departments exists; the request must not be created then.
pub fn resolve_routing(
    requester: &Actor,
    candidates: &[Actor],
    policy: &InventoryPolicy,
) -> DomainResult<RoutingDecision> {
    if policy.may_self_approve(requester) {
        return Ok(RoutingDecision::self_approved());
    }

    select_approver(requester, candidates)
        .map(|head| RoutingDecision::needs_approval(head.id))
        .ok_or_else(|| DomainError::NoApproverFound {
            departments: requester.departments.clone(),
        })
}
