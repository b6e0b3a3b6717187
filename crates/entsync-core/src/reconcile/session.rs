//! Per-run mutable state shared by the reconciliation phases.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::collaborators::{CatalogRepository, InventoryGraph, MetadataRepository};
use crate::config::EngineConfig;
use crate::discovery::class_mapper::ClassMapper;
use crate::discovery::table::DiscoveryTable;
use crate::discovery::tree::DiscoveryTree;
use crate::errors::{SyncError, SyncResult};
use crate::findings::{FindingKind, SyncFinding};
use crate::models::{ClassDefinition, InventoryObject, NewObjectNode, ObjectLight};
use crate::reconcile::snapshot::SnapshotNode;

/// Read-only inputs of one run.
pub struct RunContext<'a> {
    pub device: &'a InventoryObject,
    pub table: &'a DiscoveryTable,
    pub tree: &'a DiscoveryTree,
    pub mapper: ClassMapper<'a>,
    pub metadata: &'a dyn MetadataRepository,
    pub graph: &'a dyn InventoryGraph,
    pub catalog: &'a dyn CatalogRepository,
    pub config: &'a EngineConfig,
}

impl RunContext<'_> {
    pub fn device_light(&self) -> ObjectLight {
        self.device.light()
    }

    pub fn device_class(&self) -> &str {
        &self.device.class_name
    }
}

/// Row accounting for one run. `rows_created + rows_matched + rows_errored
/// + rows_skipped == rows_in_tree` once the branch walk is complete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub rows_in_tree: usize,
    /// Rows emitted inside NEW branch findings.
    pub rows_created: usize,
    /// Rows reconciled against an existing object (device row included).
    pub rows_matched: usize,
    /// Rows reported as unmappable.
    pub rows_errored: usize,
    /// Rows below an unmappable row.
    pub rows_skipped: usize,
    pub catalog_entries_created: usize,
}

impl RunStats {
    pub fn accounted_rows(&self) -> usize {
        self.rows_created + self.rows_matched + self.rows_errored + self.rows_skipped
    }
}

#[derive(Debug, Default)]
pub struct ReconciliationSession {
    findings: Vec<SyncFinding>,
    /// Discovered physical ports still waiting for a persisted counterpart.
    new_ports: Vec<NewObjectNode>,
    /// Persisted object ids already reconciled with a discovered row.
    consumed: HashSet<String>,
    /// Persisted nodes left over when a branch shrank.
    pending_tails: Vec<SnapshotNode>,
    /// Persisted ports no discovered port could be paired with.
    unmatched_old_ports: Vec<SnapshotNode>,
    list_types: HashMap<(String, String), String>,
    class_definitions: HashMap<String, Option<ClassDefinition>>,
    reported_attributes: HashSet<(String, String)>,
    pub stats: RunStats,
}

impl ReconciliationSession {
    pub fn new() -> Self {
        Self::default()
    }

    // -- findings -------------------------------------------------------------

    pub fn push(&mut self, finding: SyncFinding) {
        self.findings.push(finding);
    }

    pub fn findings(&self) -> &[SyncFinding] {
        &self.findings
    }

    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    pub fn into_findings(self) -> Vec<SyncFinding> {
        self.findings
    }

    // -- consumption ----------------------------------------------------------

    pub fn consume(&mut self, object_id: &str) {
        self.consumed.insert(object_id.to_string());
    }

    pub fn is_consumed(&self, object_id: &str) -> bool {
        self.consumed.contains(object_id)
    }

    /// Consume the first unconsumed object with the given class and name.
    pub fn consume_by_name<'o>(
        &mut self,
        candidates: impl IntoIterator<Item = &'o ObjectLight>,
        class_name: &str,
        name: &str,
    ) -> Option<&'o ObjectLight> {
        let found = candidates.into_iter().find(|o| {
            o.class_name == class_name && o.name == name && !self.consumed.contains(&o.id)
        })?;
        self.consumed.insert(found.id.clone());
        Some(found)
    }

    // -- port queues ----------------------------------------------------------

    pub fn queue_new_port(&mut self, node: NewObjectNode) {
        self.new_ports.push(node);
    }

    pub fn new_ports(&self) -> &[NewObjectNode] {
        &self.new_ports
    }

    pub fn take_new_port(&mut self, index: usize) -> NewObjectNode {
        self.new_ports.remove(index)
    }

    pub fn remove_new_port(&mut self, discovered_id: &str) -> Option<NewObjectNode> {
        let index = self
            .new_ports
            .iter()
            .position(|n| n.discovered_id == discovered_id)?;
        Some(self.new_ports.remove(index))
    }

    pub fn set_new_port_anchor(&mut self, discovered_id: &str, anchor_id: &str) {
        if let Some(node) = self
            .new_ports
            .iter_mut()
            .find(|n| n.discovered_id == discovered_id)
        {
            node.anchor_id = Some(anchor_id.to_string());
        }
    }

    pub fn drain_new_ports(&mut self) -> Vec<NewObjectNode> {
        std::mem::take(&mut self.new_ports)
    }

    pub fn push_unmatched_old_port(&mut self, node: SnapshotNode) {
        self.unmatched_old_ports.push(node);
    }

    pub fn drain_unmatched_old_ports(&mut self) -> Vec<SnapshotNode> {
        std::mem::take(&mut self.unmatched_old_ports)
    }

    // -- deletion candidates --------------------------------------------------

    pub fn queue_tail(&mut self, node: SnapshotNode) {
        self.pending_tails.push(node);
    }

    pub fn drain_tails(&mut self) -> Vec<SnapshotNode> {
        std::mem::take(&mut self.pending_tails)
    }

    // -- memoized lookups -----------------------------------------------------

    pub fn memoized_list_type(&self, catalog_class: &str, name: &str) -> Option<&str> {
        self.list_types
            .get(&(catalog_class.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn memoize_list_type(&mut self, catalog_class: &str, name: &str, entry_id: &str) {
        self.list_types.insert(
            (catalog_class.to_string(), name.to_string()),
            entry_id.to_string(),
        );
    }

    /// Class definition from metadata, cached per run. `Ok(None)` for classes
    /// the metadata does not know.
    pub fn class_definition(
        &mut self,
        metadata: &dyn MetadataRepository,
        class_name: &str,
    ) -> SyncResult<Option<ClassDefinition>> {
        if let Some(cached) = self.class_definitions.get(class_name) {
            return Ok(cached.clone());
        }
        let definition = match metadata.class_definition(class_name) {
            Ok(def) => Some(def),
            Err(SyncError::ClassNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        self.class_definitions
            .insert(class_name.to_string(), definition.clone());
        Ok(definition)
    }

    /// True the first time a (class, attribute) pair is reported.
    pub fn first_report_of(&mut self, class_name: &str, attribute_name: &str) -> bool {
        self.reported_attributes
            .insert((class_name.to_string(), attribute_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attributes;

    fn make_port(id: &str) -> NewObjectNode {
        NewObjectNode {
            discovered_id: id.into(),
            discovered_parent_id: "1".into(),
            parent_name: "Board0/0".into(),
            parent_class: "IPBoard".into(),
            class_name: "OpticalPort".into(),
            attributes: Attributes::new(),
            anchor_id: None,
        }
    }

    #[test]
    fn test_new_port_queue() {
        let mut session = ReconciliationSession::new();
        session.queue_new_port(make_port("5"));
        session.queue_new_port(make_port("6"));
        session.set_new_port_anchor("6", "42");
        assert_eq!(session.new_ports()[1].anchor_id.as_deref(), Some("42"));
        assert!(session.remove_new_port("5").is_some());
        assert!(session.remove_new_port("5").is_none());
        assert_eq!(session.drain_new_ports().len(), 1);
        assert!(session.new_ports().is_empty());
    }

    #[test]
    fn test_consume_by_name_takes_first_unconsumed() {
        let mut session = ReconciliationSession::new();
        let objects = vec![
            ObjectLight::new("1", "Slot0", "Slot"),
            ObjectLight::new("2", "Slot0", "Slot"),
        ];
        assert_eq!(session.consume_by_name(&objects, "Slot", "Slot0").unwrap().id, "1");
        assert_eq!(session.consume_by_name(&objects, "Slot", "Slot0").unwrap().id, "2");
        assert!(session.consume_by_name(&objects, "Slot", "Slot0").is_none());
        assert!(session.is_consumed("1"));
    }

    #[test]
    fn test_first_report_of() {
        let mut session = ReconciliationSession::new();
        assert!(session.first_report_of("OpticalPort", "vendor"));
        assert!(!session.first_report_of("OpticalPort", "vendor"));
        assert!(session.first_report_of("OpticalPort", "model"));
    }

    #[test]
    fn test_list_type_memo_is_per_catalog_class() {
        let mut session = ReconciliationSession::new();
        session.memoize_list_type("EquipmentVendor", "Acme", "3");
        assert_eq!(session.memoized_list_type("EquipmentVendor", "Acme"), Some("3"));
        assert_eq!(session.memoized_list_type("EquipmentModel", "Acme"), None);
    }
}
