//! Test harnesses
//!
//! `Plant` is an in-memory reference model of the plant: it composes the
//! domain rules (routing, batch issuance, claim alerts) without a database
//! so property tests can run thousands of cases. `db` builds the real
//! services on a migrated Postgres database.

#![allow(dead_code)]

pub mod db;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::{
    normalize_item_name, resolve_request_unit, resolve_routing, stock_warning, Actor, Batch,
    ClaimAlert, DomainError, DomainResult, InventoryItem, InventoryPolicy, InventoryRequest,
    NewRequest, RequestStatus, Role, Transition, Urgency,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Start of every test clock
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
}

pub fn minutes_after_t0(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn employee(code: &str, role: Role, departments: &[&str], designation: &str) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        emp_code: code.to_string(),
        name: format!("Employee {}", code),
        email: Some(format!("{}@plant.test", code.to_lowercase())),
        departments: departments.iter().map(|d| d.to_string()).collect(),
        designation: designation.to_string(),
        role,
    }
}

/// A delivered notice: (recipient, kind, request)
pub type SentNotice = (Uuid, &'static str, Uuid);

#[derive(Default)]
pub struct Plant {
    pub policy: InventoryPolicy,
    pub employees: Vec<Actor>,
    pub items: HashMap<String, InventoryItem>,
    pub requests: HashMap<Uuid, InventoryRequest>,
    pub alerts: HashMap<Uuid, ClaimAlert>,
    pub notices: Vec<SentNotice>,
}

impl Plant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hire(&mut self, actor: Actor) -> Actor {
        self.employees.push(actor.clone());
        actor
    }

    fn head_of(&self, department: &str) -> Option<&Actor> {
        self.employees
            .iter()
            .filter(|e| e.role == Role::Head && e.belongs_to(department))
            .min_by(|a, b| a.emp_code.cmp(&b.emp_code))
    }

    pub fn receive(
        &mut self,
        actor: &Actor,
        item_name: &str,
        unit: &str,
        batch_id: &str,
        quantity: Decimal,
    ) -> DomainResult<()> {
        let batch = Batch::receive(batch_id, quantity, Decimal::ONE, actor.id, t0())?;
        let item = self
            .items
            .entry(normalize_item_name(item_name))
            .or_insert_with(|| InventoryItem {
                id: Uuid::new_v4(),
                item_name: item_name.to_string(),
                unit: unit.to_string(),
                batches: Vec::new(),
                created_at: t0(),
            });
        item.add_batch(batch)?;
        Ok(())
    }

    pub fn item(&self, name: &str) -> Option<&InventoryItem> {
        self.items.get(&normalize_item_name(name))
    }

    /// File a request; nothing is stored when routing fails
    pub fn create(
        &mut self,
        requester: &Actor,
        item: &str,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<(Uuid, Option<String>)> {
        let heads: Vec<Actor> = self
            .employees
            .iter()
            .filter(|e| e.role == Role::Head && e.shares_department_with(&requester.departments))
            .cloned()
            .collect();
        let routing = resolve_routing(requester, &heads, &self.policy)?;

        let balance = self.item(item).map(|i| i.balance());
        let unit = resolve_request_unit(balance.as_ref().map(|b| b.unit.as_str()), None);
        let warning = balance
            .as_ref()
            .and_then(|b| stock_warning(b.total_available, quantity, &unit));

        let request = InventoryRequest::open(
            NewRequest {
                item: item.to_string(),
                quantity,
                reason: "Routine consumption".to_string(),
                urgency: Urgency::Medium,
                unit: None,
            },
            requester,
            &routing,
            unit,
            now,
        )?;

        if let Some(head) = request.pending_approval_from {
            self.notices.push((head, "new_request", request.id));
        }

        let id = request.id;
        self.requests.insert(id, request);
        Ok((id, warning))
    }

    /// Apply a transition; the stored request and ledger change only on success
    pub fn transition(
        &mut self,
        actor: &Actor,
        request_id: Uuid,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> DomainResult<RequestStatus> {
        let mut request = self
            .requests
            .get(&request_id)
            .cloned()
            .ok_or(DomainError::RequestNotFound)?;

        let status = request.apply(actor, &transition, &self.policy, now)?;

        match &transition {
            Transition::Issue { batch_id, quantity } => {
                let item = self
                    .items
                    .get_mut(&normalize_item_name(&request.item))
                    .ok_or_else(|| DomainError::ItemNotFound(request.item.clone()))?;
                item.issue(batch_id, *quantity)?;
                self.alerts.insert(request.id, ClaimAlert::new(request.id));
                self.notices
                    .push((request.requested_by, "ready_for_collection", request.id));
            }
            Transition::Claim => {
                self.alerts.remove(&request.id);
            }
            Transition::Approve => {
                let head = self.head_of(shared::WAREHOUSE_DEPARTMENT).map(|h| h.id);
                if let Some(head) = head {
                    self.notices.push((head, "ready_for_issuance", request.id));
                }
            }
            Transition::Reject { .. } => {}
        }

        self.requests.insert(request.id, request);
        Ok(status)
    }

    /// One claim-alert sweep; returns the requests flagged by this run
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        let window = self.policy.claim_window();
        let mut flagged = Vec::new();

        for request in self.requests.values() {
            let (RequestStatus::Issued, Some(issued_at)) = (request.status, request.issued_at)
            else {
                continue;
            };
            let alert = self
                .alerts
                .entry(request.id)
                .or_insert_with(|| ClaimAlert::new(request.id));
            if alert.flag_if_overdue(issued_at, now, window) {
                flagged.push(request.id);
            }
        }

        for id in &flagged {
            let department = self.requests[id].department.clone();
            let head = self.head_of(&department).map(|h| h.id);
            if let Some(head) = head {
                self.notices.push((head, "claim_overdue", *id));
            }
        }

        flagged
    }

    pub fn status(&self, request_id: Uuid) -> RequestStatus {
        self.requests[&request_id].status
    }

    pub fn notices_of(&self, kind: &str) -> Vec<SentNotice> {
        self.notices.iter().filter(|n| n.1 == kind).cloned().collect()
    }

    /// Exactly one alert per issued request and none otherwise
    pub fn alerts_consistent(&self) -> bool {
        self.requests.values().all(|r| {
            let has_alert = self.alerts.contains_key(&r.id);
            (r.status == RequestStatus::Issued) == has_alert
        }) && self.alerts.keys().all(|id| self.requests.contains_key(id))
    }
}

/// A plant with the usual cast: heads of Warehouse and Production, a
/// Warehouse executive who issues, and some staff
pub struct Cast {
    pub warehouse_head: Actor,
    pub production_head: Actor,
    pub issuer: Actor,
    pub warehouse_staff: Actor,
    pub production_staff: Actor,
    pub director: Actor,
}

pub fn staffed_plant() -> (Plant, Cast) {
    let mut plant = Plant::new();
    let cast = Cast {
        warehouse_head: plant.hire(employee("E010", Role::Head, &["Warehouse"], "Warehouse Head")),
        production_head: plant.hire(employee(
            "E020",
            Role::Head,
            &["Production"],
            "Production Head",
        )),
        issuer: plant.hire(employee("E011", Role::Staff, &["Warehouse"], "Executive")),
        warehouse_staff: plant.hire(employee("E012", Role::Staff, &["Warehouse"], "Operator")),
        production_staff: plant.hire(employee("E021", Role::Staff, &["Production"], "Operator")),
        director: plant.hire(employee("E001", Role::Director, &["Management"], "Director")),
    };
    (plant, cast)
}
