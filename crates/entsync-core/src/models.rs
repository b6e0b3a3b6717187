//! Shared typed models used across discovery, reconciliation, and storage layers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered attribute map (attribute name -> string value).
pub type Attributes = IndexMap<String, String>;

// ---------------------------------------------------------------------------
// Logical class and attribute names
// ---------------------------------------------------------------------------

/// Logical inventory class names produced by the class mapper.
pub mod classes {
    pub const SLOT: &str = "Slot";
    pub const ELECTRICAL_PORT: &str = "ElectricalPort";
    pub const OPTICAL_PORT: &str = "OpticalPort";
    pub const USB_PORT: &str = "USBPort";
    pub const POWER_PORT: &str = "PowerPort";
    pub const HYBRID_BOARD: &str = "HybridBoard";
    pub const IP_BOARD: &str = "IPBoard";
    pub const TRANSCEIVER: &str = "Transceiver";
    pub const SWITCH_PROCESSOR: &str = "SwitchProcessor";
    pub const GENERIC_LOGICAL_PORT: &str = "GenericLogicalPort";
}

/// Attribute names written by the attribute builder.
pub mod attributes {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const VENDOR: &str = "vendor";
    pub const SERIAL_NUMBER: &str = "serialNumber";
    pub const MODEL: &str = "model";
}

/// Class names containing "Port" terminate a discovered branch.
pub fn is_port_class(class_name: &str) -> bool {
    class_name.contains("Port")
}

/// Physical ports take part in port migration; power and virtual ports do not.
pub fn is_physical_port_class(class_name: &str) -> bool {
    class_name.contains("Port") && !class_name.contains("Power") && !class_name.contains("Virtual")
}

// ---------------------------------------------------------------------------
// 1. PhysicalClass
// ---------------------------------------------------------------------------

/// ENTITY-MIB `PhysicalClass` codes as reported in `entPhysicalClass`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalClass {
    Other = 1,
    Unknown = 2,
    Chassis = 3,
    Backplane = 4,
    Container = 5,
    PowerSupply = 6,
    Fan = 7,
    Sensor = 8,
    Module = 9,
    Port = 10,
    Stack = 11,
    Cpu = 12,
}

impl PhysicalClass {
    /// Parse the textual class code. Returns `None` for empty, non-numeric,
    /// or out-of-range codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let value: u8 = code.trim().parse().ok()?;
        let class = match value {
            1 => Self::Other,
            2 => Self::Unknown,
            3 => Self::Chassis,
            4 => Self::Backplane,
            5 => Self::Container,
            6 => Self::PowerSupply,
            7 => Self::Fan,
            8 => Self::Sensor,
            9 => Self::Module,
            10 => Self::Port,
            11 => Self::Stack,
            12 => Self::Cpu,
            _ => return None,
        };
        Some(class)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// 2. DiscoveredRow
// ---------------------------------------------------------------------------

/// One row of the discovered physical table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredRow {
    pub instance_id: String,
    pub contained_in: String,
    pub class_code: String,
    pub name: String,
    pub description: String,
    pub model_name: String,
    pub vendor_name: String,
    pub serial_number: String,
}

impl DiscoveredRow {
    pub fn physical_class(&self) -> Option<PhysicalClass> {
        PhysicalClass::from_code(&self.class_code)
    }
}

// ---------------------------------------------------------------------------
// 3. Persisted inventory records
// ---------------------------------------------------------------------------

/// Lightweight reference to a persisted object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLight {
    pub id: String,
    pub name: String,
    pub class_name: String,
}

impl ObjectLight {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class_name: class_name.into(),
        }
    }
}

/// A persisted object with its full attribute map (including `name`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryObject {
    pub id: String,
    pub class_name: String,
    pub attributes: Attributes,
}

impl InventoryObject {
    pub fn name(&self) -> &str {
        self.attributes
            .get(attributes::NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn light(&self) -> ObjectLight {
        ObjectLight::new(self.id.clone(), self.name(), self.class_name.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    /// Primitive type name or, for list-type attributes, the catalog class.
    pub attribute_type: String,
}

/// Class metadata as seen by the engine: the class name and every attribute
/// it declares or inherits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    pub attributes: IndexMap<String, AttributeDefinition>,
}

impl ClassDefinition {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// 4. NewObjectNode / Branch
// ---------------------------------------------------------------------------

/// A discovered object that may have to be created, positioned by the names
/// and classes of its discovered parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewObjectNode {
    pub discovered_id: String,
    /// Discovered parent instance id, or the device id for children of the chassis.
    pub discovered_parent_id: String,
    pub parent_name: String,
    pub parent_class: String,
    pub class_name: String,
    pub attributes: Attributes,
    /// Persisted object the node should be created under, when matching found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
}

impl NewObjectNode {
    pub fn name(&self) -> &str {
        self.attributes
            .get(attributes::NAME)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_physical_port(&self) -> bool {
        is_physical_port_class(&self.class_name)
    }
}

/// Ordered run of discovered nodes from an outer container down to a leaf or port.
pub type Branch = Vec<NewObjectNode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_class_from_code() {
        assert_eq!(PhysicalClass::from_code("3"), Some(PhysicalClass::Chassis));
        assert_eq!(PhysicalClass::from_code(" 10 "), Some(PhysicalClass::Port));
        assert_eq!(PhysicalClass::from_code("13"), None);
        assert_eq!(PhysicalClass::from_code(""), None);
        assert_eq!(PhysicalClass::from_code("port"), None);
        assert_eq!(PhysicalClass::Module.code(), 9);
    }

    #[test]
    fn test_port_class_predicates() {
        assert!(is_port_class("PowerPort"));
        assert!(!is_physical_port_class("PowerPort"));
        assert!(!is_physical_port_class("VirtualPort"));
        assert!(is_physical_port_class("OpticalPort"));
        assert!(!is_port_class("IPBoard"));
    }

    #[test]
    fn test_inventory_object_name() {
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), "Gi0/1".into());
        let obj = InventoryObject {
            id: "7".into(),
            class_name: "OpticalPort".into(),
            attributes: attrs,
        };
        assert_eq!(obj.name(), "Gi0/1");
        assert_eq!(obj.light(), ObjectLight::new("7", "Gi0/1", "OpticalPort"));
    }
}
