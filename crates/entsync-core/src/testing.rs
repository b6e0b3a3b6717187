//! Fixtures shared by the unit tests: a small but realistic class model and
//! row builders for discovery tables.

use crate::discovery::table::DiscoveryTable;
use crate::models::DiscoveredRow;
use crate::store::InventoryStore;

/// In-memory store seeded with the class model of a modular router.
pub fn seeded_store() -> InventoryStore {
    let store = InventoryStore::open_in_memory().unwrap();
    let classes: &[(&str, Option<&str>)] = &[
        ("InventoryObject", None),
        ("GenericCommunicationsElement", Some("InventoryObject")),
        ("Router", Some("GenericCommunicationsElement")),
        ("Slot", Some("InventoryObject")),
        ("GenericBoard", Some("InventoryObject")),
        ("IPBoard", Some("GenericBoard")),
        ("HybridBoard", Some("GenericBoard")),
        ("SwitchProcessor", Some("GenericBoard")),
        ("Transceiver", Some("InventoryObject")),
        ("GenericPort", Some("InventoryObject")),
        ("GenericPhysicalPort", Some("GenericPort")),
        ("OpticalPort", Some("GenericPhysicalPort")),
        ("ElectricalPort", Some("GenericPhysicalPort")),
        ("USBPort", Some("GenericPhysicalPort")),
        ("PowerPort", Some("GenericPhysicalPort")),
        ("GenericLogicalPort", Some("GenericPort")),
        ("VirtualPort", Some("GenericLogicalPort")),
    ];
    for (name, parent) in classes {
        store.create_class(name, *parent).unwrap();
    }

    for attribute in ["name", "description", "serialNumber"] {
        store.add_attribute("InventoryObject", attribute, "String").unwrap();
    }
    for class in ["GenericCommunicationsElement", "GenericBoard", "Transceiver"] {
        store.add_attribute(class, "vendor", "EquipmentVendor").unwrap();
        store.add_attribute(class, "model", "EquipmentModel").unwrap();
    }

    let ports = ["OpticalPort", "ElectricalPort", "USBPort"];
    store
        .add_possible_children(
            "Router",
            &[
                "Slot",
                "IPBoard",
                "HybridBoard",
                "SwitchProcessor",
                "OpticalPort",
                "ElectricalPort",
                "USBPort",
                "PowerPort",
                "VirtualPort",
            ],
        )
        .unwrap();
    store
        .add_possible_children("Slot", &["IPBoard", "HybridBoard", "SwitchProcessor"])
        .unwrap();
    store.add_possible_children("IPBoard", &ports).unwrap();
    store.add_possible_children("IPBoard", &["Slot", "Transceiver"]).unwrap();
    store.add_possible_children("HybridBoard", &ports).unwrap();
    store.add_possible_children("HybridBoard", &["PowerPort"]).unwrap();
    store.add_possible_children("SwitchProcessor", &ports).unwrap();
    store
}

/// The device under reconciliation, described the way [`chassis`] reports it.
pub fn router(store: &InventoryStore) -> String {
    store
        .create_object("Router", "edge-1", None, &[("description", "Cisco 7606 chassis")])
        .unwrap()
}

/// Discovery row with the fields every test cares about.
pub fn row(instance: &str, contained_in: &str, class_code: &str, name: &str, description: &str) -> DiscoveredRow {
    DiscoveredRow {
        instance_id: instance.into(),
        contained_in: contained_in.into(),
        class_code: class_code.into(),
        name: name.into(),
        description: description.into(),
        ..DiscoveredRow::default()
    }
}

/// The chassis row every table needs, contained in the synthetic root "0".
pub fn chassis(instance: &str) -> DiscoveredRow {
    row(instance, "0", "3", "CISCO7606", "Cisco 7606 chassis")
}

pub fn table(rows: Vec<DiscoveredRow>) -> DiscoveryTable {
    DiscoveryTable::from_rows(rows)
}
