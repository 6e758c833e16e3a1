//! Business logic services for the Plant Inventory core

pub mod claim_alert;
pub mod identity;
pub mod ledger;
pub mod notification;
pub mod requests;

pub use claim_alert::{spawn_monitor, ClaimAlertService};
pub use identity::IdentityService;
pub use ledger::LedgerService;
pub use notification::NotificationService;
pub use requests::RequestService;
