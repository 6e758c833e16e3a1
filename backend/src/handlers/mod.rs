//! HTTP handlers

pub mod alerts;
pub mod health;
pub mod inventory;
pub mod requests;

pub use alerts::*;
pub use health::*;
pub use inventory::*;
pub use requests::*;
