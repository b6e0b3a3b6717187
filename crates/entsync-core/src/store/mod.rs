pub mod inventory;
pub mod schema;

pub use inventory::InventoryStore;
