//! Deletion proposals for persisted objects the discovery no longer reports.

use std::collections::HashSet;

use tracing::debug;

use crate::collaborators::InventoryGraph;
use crate::errors::SyncResult;
use crate::findings::{DeleteReason, SyncFinding};
use crate::models::{classes, is_port_class, ObjectLight};
use crate::reconcile::session::ReconciliationSession;
use crate::reconcile::snapshot::{SnapshotNode, StructureSnapshot};

/// The port a transceiver is wrongly persisted under, if any.
fn misrooted_parent(graph: &dyn InventoryGraph, node: &SnapshotNode) -> SyncResult<Option<ObjectLight>> {
    if !node.object.class_name.contains(classes::TRANSCEIVER) {
        return Ok(None);
    }
    let parent = graph.parent(&node.object.class_name, &node.object.id)?;
    Ok(is_port_class(&parent.class_name).then_some(parent))
}

/// Record a DELETE for every persisted object left unreconciled.
///
/// First-level children come first and cover everything below them, so a
/// node descending from a deleted first-level child is never reported on
/// its own. No object is reported twice.
pub fn detect_deletions(
    graph: &dyn InventoryGraph,
    snapshot: &StructureSnapshot,
    session: &mut ReconciliationSession,
) -> SyncResult<()> {
    let mut reported: HashSet<String> = HashSet::new();
    let mut deleted_roots: HashSet<String> = HashSet::new();
    let mut proposals: Vec<SyncFinding> = Vec::new();

    for object in snapshot.first_level() {
        if session.is_consumed(&object.id) {
            continue;
        }
        deleted_roots.insert(object.id.clone());
        reported.insert(object.id.clone());
        proposals.push(SyncFinding::delete(
            object.clone(),
            DeleteReason::RemovedFromDevice,
            None,
        ));
    }

    let covered = |node: &SnapshotNode, reported: &HashSet<String>| {
        reported.contains(&node.object.id) || deleted_roots.contains(&node.first_level_id)
    };

    for node in session.drain_tails() {
        if session.is_consumed(&node.object.id) || covered(&node, &reported) {
            continue;
        }
        reported.insert(node.object.id.clone());
        let finding = match misrooted_parent(graph, &node)? {
            Some(port) => SyncFinding::delete(node.object, DeleteReason::MisrootedTransceiver, Some(port)),
            None => SyncFinding::delete(node.object, DeleteReason::ShrunkBranch, None),
        };
        proposals.push(finding);
    }

    for node in snapshot.nodes() {
        if session.is_consumed(&node.object.id) || covered(node, &reported) {
            continue;
        }
        if let Some(port) = misrooted_parent(graph, node)? {
            reported.insert(node.object.id.clone());
            proposals.push(SyncFinding::delete(
                node.object.clone(),
                DeleteReason::MisrootedTransceiver,
                Some(port),
            ));
        }
    }

    for node in session.drain_unmatched_old_ports() {
        if covered(&node, &reported) {
            continue;
        }
        reported.insert(node.object.id.clone());
        proposals.push(SyncFinding::delete(node.object, DeleteReason::UnmatchedPort, None));
    }

    let leftover_ports = session.drain_new_ports();
    debug!(
        "Deletion pass: {} delete proposal(s), {} unmatched discovered port(s)",
        proposals.len(),
        leftover_ports.len()
    );
    for finding in proposals {
        session.push(finding);
    }
    for node in leftover_ports {
        session.push(SyncFinding::unmatched_new_port(node));
    }
    Ok(())
}
