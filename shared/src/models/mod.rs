//! Domain models for the plant inventory request system

mod claim_alert;
mod identity;
mod inventory;
mod request;

pub use claim_alert::*;
pub use identity::*;
pub use inventory::*;
pub use request::*;
