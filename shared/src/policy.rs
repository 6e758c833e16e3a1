//! Organizational policy: which roles and designations may do what.
//!
//! All authorization in the request lifecycle consults this table instead of
//! comparing role strings at call sites.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{Actor, Role};

pub const WAREHOUSE_DEPARTMENT: &str = "Warehouse";
pub const PRODUCTION_DEPARTMENT: &str = "Production";

/// Capability table and timing policy for the inventory core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryPolicy {
    /// Roles whose own request counts as approved
    pub leadership_roles: Vec<Role>,
    /// Departments allowed to issue stock (any membership suffices)
    pub issuer_departments: Vec<String>,
    /// Designations allowed to issue stock
    pub issuer_designations: Vec<String>,
    /// Roles that may see claim and stock alerts
    pub alert_viewer_roles: Vec<Role>,
    /// Roles that may see the issued/claimed history
    pub history_viewer_roles: Vec<Role>,
    pub claim_window_minutes: i64,
    pub urgent_lead_minutes: i64,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            leadership_roles: vec![
                Role::Head,
                Role::PresidentOperations,
                Role::Director,
                Role::PlantHead,
                Role::QualityHead,
            ],
            issuer_departments: vec![
                WAREHOUSE_DEPARTMENT.to_string(),
                PRODUCTION_DEPARTMENT.to_string(),
            ],
            issuer_designations: [
                "Manager",
                "Assistant Manager",
                "Executive",
                "Production Head",
                "Packing Head",
                "Warehouse Head",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            alert_viewer_roles: vec![
                Role::Director,
                Role::PresidentOperations,
                Role::PlantHead,
                Role::QualityHead,
                Role::Head,
            ],
            history_viewer_roles: vec![Role::Director, Role::PresidentOperations],
            claim_window_minutes: 30,
            urgent_lead_minutes: 5,
        }
    }
}

impl InventoryPolicy {
    /// Requests filed by this actor skip department-head approval
    pub fn may_self_approve(&self, actor: &Actor) -> bool {
        self.leadership_roles.contains(&actor.role)
    }

    /// Department head of the given department
    pub fn may_approve_for(&self, actor: &Actor, department: &str) -> bool {
        actor.role == Role::Head && actor.belongs_to(department)
    }

    /// Warehouse or production personnel with an issuing designation
    pub fn may_issue(&self, actor: &Actor) -> bool {
        let in_department = self
            .issuer_departments
            .iter()
            .any(|d| actor.belongs_to(d));
        let designated = self
            .issuer_designations
            .iter()
            .any(|d| d.eq_ignore_ascii_case(actor.designation.trim()));
        in_department && designated
    }

    /// Who may list the pending-issuance queue
    pub fn may_view_issuance_queue(&self, actor: &Actor) -> bool {
        self.may_issue(actor) || self.leadership_roles.contains(&actor.role)
    }

    /// Who may record new stock batches
    pub fn may_record_receipt(&self, actor: &Actor) -> bool {
        self.may_issue(actor)
    }

    pub fn may_view_department_requests(&self, actor: &Actor) -> bool {
        actor.role == Role::Head
    }

    pub fn may_view_alerts(&self, actor: &Actor) -> bool {
        self.alert_viewer_roles.contains(&actor.role)
    }

    /// Leadership listed in the policy, or the Warehouse Head
    pub fn may_view_history(&self, actor: &Actor) -> bool {
        self.history_viewer_roles.contains(&actor.role)
            || (actor.role == Role::Head && actor.belongs_to(WAREHOUSE_DEPARTMENT))
    }

    pub fn claim_window(&self) -> Duration {
        Duration::minutes(self.claim_window_minutes)
    }

    pub fn urgent_lead(&self) -> Duration {
        Duration::minutes(self.urgent_lead_minutes)
    }

    /// Sanity checks applied when policy is loaded from configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.claim_window_minutes <= 0 {
            return Err("claim_window_minutes must be positive".to_string());
        }
        if self.urgent_lead_minutes < 0 || self.urgent_lead_minutes > self.claim_window_minutes {
            return Err("urgent_lead_minutes must be between 0 and the claim window".to_string());
        }
        if self.issuer_departments.is_empty() || self.issuer_designations.is_empty() {
            return Err("issuer departments and designations cannot be empty".to_string());
        }
        Ok(())
    }
}
