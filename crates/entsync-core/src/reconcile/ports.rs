//! Pairing of persisted physical ports with discovered ones by name.
//!
//! Ports carry service bindings, so a persisted port that reappears anywhere
//! in the discovered structure is moved or updated rather than recreated.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::findings::SyncFinding;
use crate::models::attributes;
use crate::reconcile::attributes::{diff_attributes, previous_values};
use crate::reconcile::session::ReconciliationSession;
use crate::reconcile::snapshot::StructureSnapshot;

static PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-._:,\s]").unwrap());
static ALPHA_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([a-z]+)(.*)$").unwrap());

/// Canonical short form of a vendor interface-type prefix.
fn interface_alias(prefix: &str) -> &str {
    match prefix {
        "gigabitethernet" | "gi" | "ge" => "ge",
        "tengigabitethernet" | "tengige" | "tengigt" | "tengi" | "te" => "te",
        "mgmteth" | "mg" => "mg",
        other => other,
    }
}

fn strip_punctuation(value: &str) -> String {
    PUNCTUATION_RE.replace_all(value, "").into_owned()
}

/// First name segment with punctuation removed and its interface type
/// aliased, e.g. `GigabitEthernet0` and `gi0` both become `ge0`.
fn canonical_first_segment(segment: &str) -> String {
    let stripped = strip_punctuation(segment);
    match ALPHA_PREFIX_RE.captures(&stripped) {
        Some(caps) => format!("{}{}", interface_alias(&caps[1]), &caps[2]),
        None => stripped,
    }
}

/// Whether a persisted port and a discovered port are the same interface.
///
/// Handles names such as `Ge`, `gi1/1/13`, `Gi8/18`, `GigabitEthernet0/9`,
/// `GigabitEthernet0/0/5` and `POS0/1/0`. The relation is symmetric.
pub fn compare_port_names(old_name: &str, old_class: &str, new_name: &str, new_class: &str) -> bool {
    if old_class != new_class {
        return false;
    }
    let old = old_name.trim().to_lowercase();
    let new = new_name.trim().to_lowercase();
    if old == new {
        return true;
    }

    if !old.contains('/') && !new.contains('/') {
        let old = strip_punctuation(&old.replace("port", ""));
        let new = strip_punctuation(&new.replace("port", ""));
        return !old.is_empty() && old == new;
    }

    let old_parts: Vec<&str> = old.split('/').collect();
    let new_parts: Vec<&str> = new.split('/').collect();
    if old_parts.len() != new_parts.len() || old_parts[1..] != new_parts[1..] {
        return false;
    }
    canonical_first_segment(old_parts[0]) == canonical_first_segment(new_parts[0])
}

/// Pair every persisted physical port not yet reconciled with the first
/// queued discovered port of the same name. Both sides of a pair leave
/// their queues at once; persisted ports left without a partner are queued
/// for deletion.
pub fn migrate_ports(snapshot: &StructureSnapshot, session: &mut ReconciliationSession) {
    let device = snapshot.device();
    let (mut moved, mut updated) = (0usize, 0usize);

    for old in snapshot.ports() {
        if session.is_consumed(&old.object.id) {
            continue;
        }
        let found = session.new_ports().iter().position(|new| {
            compare_port_names(&old.object.name, &old.object.class_name, new.name(), &new.class_name)
        });
        let Some(index) = found else {
            session.push_unmatched_old_port(old.clone());
            continue;
        };
        let node = session.take_new_port(index);
        session.consume(&old.object.id);

        let device_parents =
            old.parent.class_name == device.class_name && node.parent_class == device.class_name;
        if old.parent.name != node.parent_name && !device_parents {
            let new_parent_id = snapshot
                .find_by_name_class(&node.parent_name, &node.parent_class)
                .map(|parent| parent.object.id.clone())
                .or_else(|| (node.parent_class == device.class_name).then(|| device.id.clone()))
                .or_else(|| node.anchor_id.clone());
            session.push(SyncFinding::port_move(old.object.clone(), node, new_parent_id));
            moved += 1;
            continue;
        }

        let mut discovered = node.attributes;
        discovered.shift_remove(attributes::NAME);
        let changes = diff_attributes(&old.attributes, &discovered);
        if !changes.is_empty() {
            let previous = previous_values(&old.attributes, &changes);
            session.push(SyncFinding::update(old.object.clone(), changes, previous));
            updated += 1;
        }
    }

    debug!(
        "Port migration: {} moved, {} updated, {} discovered port(s) left unmatched",
        moved,
        updated,
        session.new_ports().len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{FindingKind, FindingPayload};
    use crate::models::{Attributes, NewObjectNode, ObjectLight};
    use crate::reconcile::snapshot::SnapshotNode;

    const OPTICAL: &str = "OpticalPort";

    #[test]
    fn test_compare_port_names_vendor_aliases() {
        let cases = [
            ("GigabitEthernet0/9", "gi0/9", true),
            ("Gi8/18", "GigabitEthernet8/18", true),
            ("ge-0/0/1", "GigabitEthernet0/0/1", true),
            ("Te0/1/0", "TenGigE0/1/0", true),
            ("TenGigT0/1", "tengi0/1", true),
            ("MgmtEth0/RSP0/CPU0/0", "mg0/RSP0/CPU0/0", true),
            ("Gi1/1/13", "TenGigE2/2", false),
            ("Gi0/1", "Gi0/2", false),
            ("POS0/1/0", "pos0/1/0", true),
            ("Gi0/1", "Te0/1", false),
        ];
        for (a, b, expected) in cases {
            assert_eq!(compare_port_names(a, OPTICAL, b, OPTICAL), expected, "{a} vs {b}");
            assert_eq!(compare_port_names(b, OPTICAL, a, OPTICAL), expected, "{b} vs {a}");
        }
    }

    #[test]
    fn test_compare_port_names_without_slashes() {
        assert!(compare_port_names("Port 1", OPTICAL, "1", OPTICAL));
        assert!(compare_port_names("Ge", OPTICAL, "ge", OPTICAL));
        assert!(!compare_port_names("eth0", OPTICAL, "eth1", OPTICAL));
        assert!(!compare_port_names("port", OPTICAL, "", OPTICAL));
    }

    #[test]
    fn test_compare_port_names_requires_same_class() {
        assert!(!compare_port_names("Gi0/1", OPTICAL, "Gi0/1", "ElectricalPort"));
    }

    fn old_port(id: &str, name: &str, parent: ObjectLight, serial: &str) -> SnapshotNode {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), name.into());
        attributes.insert("serialNumber".into(), serial.into());
        SnapshotNode {
            object: ObjectLight::new(id, name, OPTICAL),
            first_level_id: parent.id.clone(),
            parent,
            attributes,
        }
    }

    fn new_port(id: &str, name: &str, parent_name: &str, serial: &str) -> NewObjectNode {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), name.into());
        attributes.insert("serialNumber".into(), serial.into());
        NewObjectNode {
            discovered_id: id.into(),
            discovered_parent_id: "2".into(),
            parent_name: parent_name.into(),
            parent_class: "IPBoard".into(),
            class_name: OPTICAL.into(),
            attributes,
            anchor_id: None,
        }
    }

    fn snapshot() -> StructureSnapshot {
        let device = ObjectLight::new("1", "edge-1", "Router");
        let board0 = ObjectLight::new("10", "Board0/0", "IPBoard");
        let board1 = ObjectLight::new("20", "Board0/1", "IPBoard");
        let board0_node = SnapshotNode {
            object: board0.clone(),
            parent: device.clone(),
            attributes: Attributes::new(),
            first_level_id: "10".into(),
        };
        let board1_node = SnapshotNode {
            object: board1.clone(),
            parent: device.clone(),
            attributes: Attributes::new(),
            first_level_id: "20".into(),
        };
        StructureSnapshot::from_branches(
            device,
            vec![board0.clone(), board1],
            vec![
                vec![board0_node, old_port("11", "Gi0/1", board0.clone(), "A")],
                vec![old_port("12", "Gi0/2", board0, "B")],
                vec![board1_node],
            ],
        )
    }

    #[test]
    fn test_migrate_update_move_and_leftovers() {
        let snapshot = snapshot();
        let mut session = ReconciliationSession::new();
        session.queue_new_port(new_port("7", "GigabitEthernet0/1", "Board0/0", "A2"));
        session.queue_new_port(new_port("8", "Gi0/2", "Board0/1", "B"));
        session.queue_new_port(new_port("9", "Gi0/3", "Board0/1", ""));

        migrate_ports(&snapshot, &mut session);

        let findings = session.findings();
        assert_eq!(findings.len(), 2);
        match &findings[0].payload {
            FindingPayload::Update {
                object,
                attributes,
                previous,
            } => {
                assert_eq!(object.id, "11");
                // Port names are never rewritten.
                assert!(!attributes.contains_key("name"));
                assert_eq!(attributes.get("serialNumber").map(String::as_str), Some("A2"));
                assert_eq!(previous.get("serialNumber").map(String::as_str), Some("A"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(findings[1].kind, FindingKind::Move);
        match &findings[1].payload {
            FindingPayload::Move {
                object,
                new_parent_id,
                ..
            } => {
                assert_eq!(object.id, "12");
                assert_eq!(new_parent_id.as_deref(), Some("20"));
            }
            other => panic!("unexpected payload {other:?}"),
        }

        assert!(session.is_consumed("11") && session.is_consumed("12"));
        let left: Vec<&str> = session.new_ports().iter().map(|n| n.name()).collect();
        assert_eq!(left, vec!["Gi0/3"]);
        assert!(session.drain_unmatched_old_ports().is_empty());
    }

    #[test]
    fn test_first_match_wins_and_consumed_ports_are_skipped() {
        let snapshot = snapshot();
        let mut session = ReconciliationSession::new();
        session.consume("12");
        session.queue_new_port(new_port("7", "gi0/1", "Board0/0", "A"));
        session.queue_new_port(new_port("8", "Gi0/1", "Board0/0", "A"));

        migrate_ports(&snapshot, &mut session);

        assert!(session.findings().is_empty());
        assert_eq!(session.new_ports().len(), 1);
        assert_eq!(session.new_ports()[0].discovered_id, "8");
    }

    #[test]
    fn test_unmatched_old_port_is_queued() {
        let snapshot = snapshot();
        let mut session = ReconciliationSession::new();
        session.queue_new_port(new_port("7", "Gi0/1", "Board0/0", "A"));
        migrate_ports(&snapshot, &mut session);
        let unmatched = session.drain_unmatched_old_ports();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].object.name, "Gi0/2");
    }
}
