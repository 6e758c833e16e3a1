//! Domain types and rules for the plant inventory request system
//!
//! This crate holds everything about the request lifecycle and the batch
//! ledger that does not touch storage or the network: the role capability
//! table, approval routing, the request state machine, ledger arithmetic and
//! claim-window classification.

pub mod error;
pub mod models;
pub mod policy;
pub mod routing;
pub mod validation;

pub use error::*;
pub use models::*;
pub use policy::*;
pub use routing::*;
pub use validation::*;
