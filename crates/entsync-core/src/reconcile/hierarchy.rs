//! Containment audit: which discovered parent/child class pairs the
//! metadata does not allow yet.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::collaborators::MetadataRepository;
use crate::discovery::class_mapper::ClassMapper;
use crate::discovery::table::DiscoveryTable;
use crate::discovery::tree::DiscoveryTree;
use crate::errors::SyncResult;
use crate::findings::SyncFinding;

/// Walk every parent entry of the tree and collect the child classes its
/// mapped class cannot contain. Rows that do not map are left to the branch
/// walk, which reports them.
pub fn audit_hierarchy(
    table: &DiscoveryTable,
    tree: &DiscoveryTree,
    mapper: &ClassMapper<'_>,
    metadata: &dyn MetadataRepository,
) -> SyncResult<Option<SyncFinding>> {
    let mut allowed: HashMap<String, Vec<String>> = HashMap::new();
    let mut missing: IndexMap<String, Vec<String>> = IndexMap::new();

    for (parent_id, children) in tree.entries() {
        if parent_id == tree.root_id() {
            continue;
        }
        let Some(parent_class) = table.get(parent_id).and_then(|row| mapper.map_row(row)) else {
            continue;
        };
        if !allowed.contains_key(&parent_class) {
            let possible = metadata.possible_children(&parent_class)?;
            allowed.insert(parent_class.clone(), possible);
        }
        let possible = &allowed[&parent_class];

        for child_id in children {
            let Some(child_class) = table.get(child_id).and_then(|row| mapper.map_row(row)) else {
                continue;
            };
            if possible.contains(&child_class) {
                continue;
            }
            let entry = missing.entry(parent_class.clone()).or_default();
            if !entry.contains(&child_class) {
                entry.push(child_class);
            }
        }
    }

    if missing.is_empty() {
        return Ok(None);
    }
    debug!("Containment gaps for {} parent class(es)", missing.len());
    Ok(Some(SyncFinding::hierarchy(missing)))
}
