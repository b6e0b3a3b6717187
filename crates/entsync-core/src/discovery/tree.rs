//! Containment tree built from the flat discovery table.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::discovery::table::DiscoveryTable;
use crate::errors::SyncResult;
use crate::models::{DiscoveredRow, PhysicalClass};

/// Whether a row's physical class is relevant to the inventory model.
pub fn is_row_used(class_code: &str, description: &str) -> bool {
    let descr = description.trim().to_lowercase();
    match PhysicalClass::from_code(class_code) {
        Some(PhysicalClass::Chassis)
        | Some(PhysicalClass::Port)
        | Some(PhysicalClass::PowerSupply)
        | Some(PhysicalClass::Module) => true,
        Some(PhysicalClass::Container) => !descr.contains("disk"),
        Some(PhysicalClass::Other) => descr.contains("switch processor"),
        Some(_) => false,
        None => {
            if !class_code.trim().is_empty() {
                warn!("Ignoring discovery row with non-numeric class code {:?}", class_code);
            }
            false
        }
    }
}

/// Port rows reported with neither name nor description carry no usable
/// information and are dropped without a finding. Mini-switch ports map by
/// model alone, so they are always kept.
fn is_noise(row: &DiscoveredRow, config: &EngineConfig) -> bool {
    row.physical_class() == Some(PhysicalClass::Port)
        && !config.is_mini_switch(&row.model_name)
        && row.name.trim().is_empty()
        && row.description.trim().is_empty()
}

#[derive(Clone, Debug)]
pub struct DiscoveryTree {
    root_id: String,
    children: IndexMap<String, Vec<String>>,
}

impl DiscoveryTree {
    /// Build the tree from the chassis root down. Fails when the table has
    /// no chassis row.
    pub fn build(table: &DiscoveryTable, config: &EngineConfig) -> SyncResult<Self> {
        let root = table.root_id()?;

        let mut by_parent: HashMap<&str, Vec<&DiscoveredRow>> = HashMap::new();
        for row in table.rows() {
            by_parent.entry(row.contained_in.as_str()).or_default().push(row);
        }

        let mut children: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut placed: HashSet<&str> = HashSet::new();
        placed.insert(root);
        let mut stack: Vec<&str> = vec![root];
        let mut noise = 0usize;

        while let Some(parent) = stack.pop() {
            let mut kept = Vec::new();
            for row in by_parent.get(parent).map(Vec::as_slice).unwrap_or_default() {
                if !is_row_used(&row.class_code, &row.description) {
                    continue;
                }
                if is_noise(row, config) {
                    noise += 1;
                    continue;
                }
                // Each row is placed at most once, which keeps the tree acyclic.
                if !placed.insert(row.instance_id.as_str()) {
                    continue;
                }
                kept.push(row.instance_id.as_str());
            }
            children.insert(
                parent.to_string(),
                kept.iter().map(|id| id.to_string()).collect(),
            );
            // Reverse so that siblings are expanded in table order.
            stack.extend(kept.iter().rev());
        }

        // Single pass: entries whose child list is empty are dropped.
        children.retain(|_, kids| !kids.is_empty());

        debug!(
            "Discovery tree rooted at {}: {} parents, {} rows placed, {} noise rows dropped",
            root,
            children.len(),
            placed.len() - 1,
            noise
        );
        Ok(Self {
            root_id: root.to_string(),
            children,
        })
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }

    /// Parent entries in insertion order, root first.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of rows placed in the tree (the root excluded).
    pub fn node_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    /// Rows strictly below `id`.
    pub fn descendant_count(&self, id: &str) -> usize {
        let mut count = 0;
        let mut stack: Vec<&str> = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                count += 1;
                stack.push(child.as_str());
            }
        }
        count
    }
}
