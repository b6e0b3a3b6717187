//! Reconciliation findings: proposed, reviewable changes produced by a run.
//!
//! Each finding pairs a [`FindingKind`] with a human message and a typed
//! payload. Payloads serialize as JSON objects tagged by `type`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::SyncResult;
use crate::models::{Attributes, NewObjectNode, ObjectLight};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    New,
    Update,
    Move,
    Delete,
    Error,
}

/// Why a persisted object is proposed for deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// First-level child of the device with no discovered counterpart.
    RemovedFromDevice,
    /// Tail of a persisted branch the discovery no longer reports.
    ShrunkBranch,
    /// Transceiver persisted under a port instead of above it.
    MisrootedTransceiver,
    /// Physical port no discovered port could be paired with.
    UnmatchedPort,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FindingPayload {
    Branch {
        nodes: Vec<NewObjectNode>,
    },
    Hierarchy {
        missing: IndexMap<String, Vec<String>>,
    },
    ListType {
        catalog_class: String,
        name: String,
        entry_id: String,
    },
    UnmatchedPort {
        node: NewObjectNode,
    },
    Update {
        object: ObjectLight,
        attributes: Attributes,
        previous: Attributes,
    },
    Move {
        object: ObjectLight,
        node: NewObjectNode,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_parent_id: Option<String>,
    },
    Delete {
        object: ObjectLight,
        reason: DeleteReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent: Option<ObjectLight>,
    },
    UnmappableRow {
        class_code: String,
        instance_id: String,
    },
    MissingAttribute {
        class_name: String,
        attribute_name: String,
        attribute_type: String,
    },
    UnknownClass {
        class_name: String,
        instance_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFinding {
    pub kind: FindingKind,
    pub message: String,
    pub payload: FindingPayload,
}

impl SyncFinding {
    pub fn new_branch(nodes: Vec<NewObjectNode>) -> Self {
        let message = match nodes.first() {
            Some(head) => format!(
                "A new branch of {} object(s) starting at {} [{}] will be created under {} [{}]",
                nodes.len(),
                head.name(),
                head.class_name,
                head.parent_name,
                head.parent_class,
            ),
            None => "An empty branch was reported".to_string(),
        };
        Self {
            kind: FindingKind::New,
            message,
            payload: FindingPayload::Branch { nodes },
        }
    }

    pub fn hierarchy(missing: IndexMap<String, Vec<String>>) -> Self {
        let pairs: Vec<String> = missing
            .iter()
            .map(|(parent, children)| format!("{} -> [{}]", parent, children.join(", ")))
            .collect();
        Self {
            kind: FindingKind::New,
            message: format!(
                "The containment hierarchy must be updated before the new objects can be created: {}",
                pairs.join("; ")
            ),
            payload: FindingPayload::Hierarchy { missing },
        }
    }

    pub fn list_type(catalog_class: &str, name: &str, entry_id: &str) -> Self {
        Self {
            kind: FindingKind::New,
            message: format!(
                "A new list type item {} was added to {}",
                name, catalog_class
            ),
            payload: FindingPayload::ListType {
                catalog_class: catalog_class.to_string(),
                name: name.to_string(),
                entry_id: entry_id.to_string(),
            },
        }
    }

    pub fn unmatched_new_port(node: NewObjectNode) -> Self {
        Self {
            kind: FindingKind::New,
            message: format!(
                "There was no match for port {} [{}]; it will be created as a new port",
                node.name(),
                node.class_name
            ),
            payload: FindingPayload::UnmatchedPort { node },
        }
    }

    pub fn update(object: ObjectLight, attributes: Attributes, previous: Attributes) -> Self {
        let changed: Vec<&str> = attributes.keys().map(String::as_str).collect();
        Self {
            kind: FindingKind::Update,
            message: format!(
                "{} [{}] will be updated: {}",
                object.name,
                object.class_name,
                changed.join(", ")
            ),
            payload: FindingPayload::Update {
                object,
                attributes,
                previous,
            },
        }
    }

    pub fn port_move(object: ObjectLight, node: NewObjectNode, new_parent_id: Option<String>) -> Self {
        Self {
            kind: FindingKind::Move,
            message: format!(
                "Port {} [{}] will be moved under {} [{}]",
                object.name, object.class_name, node.parent_name, node.parent_class
            ),
            payload: FindingPayload::Move {
                object,
                node,
                new_parent_id,
            },
        }
    }

    pub fn delete(object: ObjectLight, reason: DeleteReason, parent: Option<ObjectLight>) -> Self {
        let message = match (reason, &parent) {
            (DeleteReason::MisrootedTransceiver, Some(port)) => format!(
                "{} [{}] was persisted as a child of {} [{}] but should be its parent; \
                 a correctly placed copy was created, the old element can be deleted",
                object.name, object.class_name, port.name, port.class_name
            ),
            (DeleteReason::UnmatchedPort, _) => format!(
                "There was no match for port {} [{}] (id {}); it can be deleted after the sync",
                object.name, object.class_name, object.id
            ),
            (DeleteReason::ShrunkBranch, _) => format!(
                "{} [{}] is no longer reported by the device and will be deleted",
                object.name, object.class_name
            ),
            _ => format!(
                "{} [{}] and all its children will be deleted",
                object.name, object.class_name
            ),
        };
        Self {
            kind: FindingKind::Delete,
            message,
            payload: FindingPayload::Delete {
                object,
                reason,
                parent,
            },
        }
    }

    pub fn unmappable_row(class_code: &str, instance_id: &str, name: &str) -> Self {
        Self {
            kind: FindingKind::Error,
            message: format!(
                "Row {} ({}) with physical class {} could not be mapped to an inventory class",
                instance_id, name, class_code
            ),
            payload: FindingPayload::UnmappableRow {
                class_code: class_code.to_string(),
                instance_id: instance_id.to_string(),
            },
        }
    }

    pub fn missing_attribute(class_name: &str, attribute_name: &str, attribute_type: &str) -> Self {
        Self {
            kind: FindingKind::Error,
            message: format!(
                "The attribute {} ({}) does not exist in class {}; discovered values are dropped",
                attribute_name, attribute_type, class_name
            ),
            payload: FindingPayload::MissingAttribute {
                class_name: class_name.to_string(),
                attribute_name: attribute_name.to_string(),
                attribute_type: attribute_type.to_string(),
            },
        }
    }

    pub fn unknown_class(class_name: &str, instance_id: &str) -> Self {
        Self {
            kind: FindingKind::Error,
            message: format!(
                "The class {} does not exist in the data model (first seen on row {})",
                class_name, instance_id
            ),
            payload: FindingPayload::UnknownClass {
                class_name: class_name.to_string(),
                instance_id: instance_id.to_string(),
            },
        }
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize a finding list as a JSON array.
pub fn findings_to_json(findings: &[SyncFinding]) -> SyncResult<String> {
    Ok(serde_json::to_string_pretty(findings)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_node(name: &str) -> NewObjectNode {
        let mut attributes = Attributes::new();
        attributes.insert("name".into(), name.into());
        NewObjectNode {
            discovered_id: "12".into(),
            discovered_parent_id: "4".into(),
            parent_name: "Board0/0".into(),
            parent_class: "IPBoard".into(),
            class_name: "OpticalPort".into(),
            attributes,
            anchor_id: None,
        }
    }

    #[test]
    fn test_payload_tagged_by_type() {
        let finding = SyncFinding::new_branch(vec![make_node("Gi0/1")]);
        let value: serde_json::Value = serde_json::from_str(&finding.to_json().unwrap()).unwrap();
        assert_eq!(value["kind"], "NEW");
        assert_eq!(value["payload"]["type"], "branch");
        assert_eq!(value["payload"]["nodes"][0]["class_name"], "OpticalPort");
        assert!(value["payload"]["nodes"][0].get("anchor_id").is_none());
    }

    #[test]
    fn test_delete_message_for_misrooted_transceiver() {
        let finding = SyncFinding::delete(
            ObjectLight::new("9", "SFP-1", "Transceiver"),
            DeleteReason::MisrootedTransceiver,
            Some(ObjectLight::new("8", "Gi0/1", "OpticalPort")),
        );
        assert_eq!(finding.kind, FindingKind::Delete);
        assert!(finding.message.contains("should be its parent"));
        let value: serde_json::Value = serde_json::from_str(&finding.to_json().unwrap()).unwrap();
        assert_eq!(value["payload"]["reason"], "misrooted_transceiver");
        assert_eq!(value["payload"]["parent"]["id"], "8");
    }

    #[test]
    fn test_findings_round_trip_through_json() {
        let mut missing = IndexMap::new();
        missing.insert("IPBoard".to_string(), vec!["Transceiver".to_string()]);
        let findings = vec![
            SyncFinding::hierarchy(missing),
            SyncFinding::unmappable_row("6", "42", "Fan tray"),
        ];
        let json = findings_to_json(&findings).unwrap();
        let parsed: Vec<SyncFinding> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, findings);
    }
}
