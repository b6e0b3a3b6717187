//! Reconciliation of a discovered structure against the persisted one.

pub mod attributes;
pub mod branch;
pub mod deletion;
pub mod engine;
pub mod hierarchy;
pub mod list_types;
pub mod ports;
pub mod session;
pub mod snapshot;
pub mod strategies;

pub use engine::{ReconciliationEngine, ReconciliationReport};
