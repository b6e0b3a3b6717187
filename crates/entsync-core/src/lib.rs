//! entsync core library: reconciles the physical structure an SNMP agent
//! reports for a network device (ENTITY-MIB `entPhysicalTable`) with the
//! structure an inventory holds for it.
//!
//! A run produces reviewable findings (NEW, UPDATE, MOVE, DELETE, ERROR)
//! rather than applying changes. The inventory is reached through the traits
//! in [`collaborators`]; [`store::InventoryStore`] is a SQLite implementation
//! of all of them.

pub mod collaborators;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod findings;
pub mod models;
pub mod reconcile;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use discovery::table::DiscoveryTable;
pub use errors::{SyncError, SyncResult};
pub use findings::{FindingKind, SyncFinding};
pub use reconcile::{ReconciliationEngine, ReconciliationReport};
pub use store::InventoryStore;
