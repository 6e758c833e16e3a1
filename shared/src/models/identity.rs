//! Employee identity and role models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse access role of an employee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Head,
    Manager,
    QualityHead,
    PlantHead,
    Director,
    PresidentOperations,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Staff,
        Role::Head,
        Role::Manager,
        Role::QualityHead,
        Role::PlantHead,
        Role::Director,
        Role::PresidentOperations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Head => "head",
            Role::Manager => "manager",
            Role::QualityHead => "quality_head",
            Role::PlantHead => "plant_head",
            Role::Director => "director",
            Role::PresidentOperations => "president_operations",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Staff => write!(f, "Staff"),
            Role::Head => write!(f, "Head"),
            Role::Manager => write!(f, "Manager"),
            Role::QualityHead => write!(f, "Quality Head"),
            Role::PlantHead => write!(f, "Plant Head"),
            Role::Director => write!(f, "Director"),
            Role::PresidentOperations => write!(f, "President Operations"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Accepts both the stored snake_case form and the display label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == key)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Matching key for department names: trimmed and lower-cased.
///
/// Queries compare against `lower(btrim(department, E' \t\r\n'))`, so
/// both sides of every department match agree.
pub fn normalize_department(department: &str) -> String {
    department
        .trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .to_lowercase()
}

/// An authenticated employee acting on the system.
///
/// Built by the authentication boundary and passed explicitly into every
/// core operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub emp_code: String,
    pub name: String,
    pub email: Option<String>,
    /// Department memberships; the first entry is the primary department
    pub departments: Vec<String>,
    /// Fine-grained title, e.g. "Warehouse Head" or "Executive"
    pub designation: String,
    pub role: Role,
}

impl Actor {
    /// Primary department, used to stamp new requests
    pub fn primary_department(&self) -> Option<&str> {
        self.departments.first().map(String::as_str)
    }

    /// Membership test against a single department
    pub fn belongs_to(&self, department: &str) -> bool {
        let wanted = normalize_department(department);
        self.departments
            .iter()
            .any(|d| normalize_department(d) == wanted)
    }

    /// Normalized department keys, for binding into department queries
    pub fn department_keys(&self) -> Vec<String> {
        self.departments
            .iter()
            .map(|d| normalize_department(d))
            .collect()
    }

    /// True when the two department sets intersect
    pub fn shares_department_with(&self, departments: &[String]) -> bool {
        departments.iter().any(|d| self.belongs_to(d))
    }
}

/// Lightweight reference to an employee embedded in responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeRef {
    pub id: Uuid,
    pub emp_code: String,
    pub name: String,
}

impl From<&Actor> for EmployeeRef {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            emp_code: actor.emp_code.clone(),
            name: actor.name.clone(),
        }
    }
}
