//! Interfaces to the systems the engine reads from (and, for catalog
//! entries, writes to). [`crate::store::InventoryStore`] implements all three.

use crate::errors::SyncResult;
use crate::models::{CatalogEntry, ClassDefinition, InventoryObject, ObjectLight};

/// Class metadata: containment rules, attribute schemas, inheritance.
pub trait MetadataRepository {
    /// Classes allowed as direct children of `class_name`.
    fn possible_children(&self, class_name: &str) -> SyncResult<Vec<String>>;

    /// Fails with [`crate::errors::SyncError::ClassNotFound`] for unknown classes.
    fn class_definition(&self, class_name: &str) -> SyncResult<ClassDefinition>;

    /// True when `class_name` is `ancestor` or inherits from it.
    fn is_subclass_of(&self, class_name: &str, ancestor: &str) -> SyncResult<bool>;
}

/// Read access to the persisted object graph.
pub trait InventoryGraph {
    fn children(&self, class_name: &str, id: &str) -> SyncResult<Vec<ObjectLight>>;

    fn object(&self, class_name: &str, id: &str) -> SyncResult<InventoryObject>;

    fn parent(&self, class_name: &str, id: &str) -> SyncResult<ObjectLight>;
}

/// List-type catalog (vendors, models, ...).
pub trait CatalogRepository {
    fn list_entries(&self, catalog_class: &str) -> SyncResult<Vec<CatalogEntry>>;

    fn create_entry(&self, catalog_class: &str, name: &str, description: &str) -> SyncResult<String>;
}
