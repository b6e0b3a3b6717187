//! Capture of the persisted structure under a device.
//!
//! The persisted tree is flattened into root-to-leaf branches keyed in visit
//! order. The branch in progress is not rewound when a leaf flushes it, so
//! the second and later children of a node start a branch of their own; the
//! discovery walk builds its branches the same way, which keeps the two sides
//! comparable position by position.

use indexmap::IndexMap;
use tracing::debug;

use crate::collaborators::{InventoryGraph, MetadataRepository};
use crate::errors::SyncResult;
use crate::models::{is_physical_port_class, Attributes, ObjectLight};

/// One persisted object with the context the matchers compare against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotNode {
    pub object: ObjectLight,
    pub parent: ObjectLight,
    pub attributes: Attributes,
    /// Id of the device child this node descends from (its own id at depth one).
    pub first_level_id: String,
}

#[derive(Clone, Debug)]
pub struct StructureSnapshot {
    device: ObjectLight,
    first_level: Vec<ObjectLight>,
    branches: IndexMap<u64, Vec<SnapshotNode>>,
    ports: Vec<SnapshotNode>,
}

struct Capture<'a> {
    metadata: &'a dyn MetadataRepository,
    graph: &'a dyn InventoryGraph,
    logical_port_class: &'a str,
    pending: Vec<SnapshotNode>,
    next_key: u64,
    branches: IndexMap<u64, Vec<SnapshotNode>>,
    ports: Vec<SnapshotNode>,
}

impl Capture<'_> {
    fn visit(
        &mut self,
        parent: &ObjectLight,
        children: Vec<ObjectLight>,
        first_level_id: Option<&str>,
    ) -> SyncResult<()> {
        for child in children {
            let first_level = first_level_id.unwrap_or(&child.id).to_string();
            let node = SnapshotNode {
                attributes: self.graph.object(&child.class_name, &child.id)?.attributes,
                object: child.clone(),
                parent: parent.clone(),
                first_level_id: first_level.clone(),
            };

            if !self
                .metadata
                .is_subclass_of(&child.class_name, self.logical_port_class)?
            {
                self.pending.push(node.clone());
            }
            if is_physical_port_class(&child.class_name) {
                self.ports.push(node);
            }

            let grandchildren = self.graph.children(&child.class_name, &child.id)?;
            if grandchildren.is_empty() {
                if !self.pending.is_empty() {
                    self.branches
                        .insert(self.next_key, std::mem::take(&mut self.pending));
                }
                self.next_key += 1;
            } else {
                self.visit(&child, grandchildren, Some(first_level.as_str()))?;
            }
        }
        Ok(())
    }
}

impl StructureSnapshot {
    /// Walk everything persisted below `device`.
    pub fn capture(
        device: &ObjectLight,
        metadata: &dyn MetadataRepository,
        graph: &dyn InventoryGraph,
        logical_port_class: &str,
    ) -> SyncResult<Self> {
        let children = graph.children(&device.class_name, &device.id)?;
        let mut first_level = Vec::with_capacity(children.len());
        for child in &children {
            if !metadata.is_subclass_of(&child.class_name, logical_port_class)? {
                first_level.push(child.clone());
            }
        }

        let mut capture = Capture {
            metadata,
            graph,
            logical_port_class,
            pending: Vec::new(),
            next_key: 0,
            branches: IndexMap::new(),
            ports: Vec::new(),
        };
        capture.visit(device, children, None)?;

        debug!(
            "Captured {} persisted branch(es) and {} port(s) under {} [{}]",
            capture.branches.len(),
            capture.ports.len(),
            device.name,
            device.class_name
        );
        Ok(Self {
            device: device.clone(),
            first_level,
            branches: capture.branches,
            ports: capture.ports,
        })
    }

    /// Assemble a snapshot from already captured branches; ports are the
    /// physical port nodes among them.
    pub fn from_branches(
        device: ObjectLight,
        first_level: Vec<ObjectLight>,
        branches: Vec<Vec<SnapshotNode>>,
    ) -> Self {
        let ports = branches
            .iter()
            .flatten()
            .filter(|n| is_physical_port_class(&n.object.class_name))
            .cloned()
            .collect();
        Self {
            device,
            first_level,
            branches: (0u64..).zip(branches).collect(),
            ports,
        }
    }

    pub fn device(&self) -> &ObjectLight {
        &self.device
    }

    /// Direct children of the device, logical ports excluded.
    pub fn first_level(&self) -> &[ObjectLight] {
        &self.first_level
    }

    pub fn branches(&self) -> &IndexMap<u64, Vec<SnapshotNode>> {
        &self.branches
    }

    /// Persisted physical ports in visit order.
    pub fn ports(&self) -> &[SnapshotNode] {
        &self.ports
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SnapshotNode> {
        self.branches.values().flatten()
    }

    pub fn find_by_name_class(&self, name: &str, class_name: &str) -> Option<&SnapshotNode> {
        self.nodes()
            .find(|n| n.object.name == name && n.object.class_name == class_name)
    }
}
