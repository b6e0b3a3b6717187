//! Physical class code + free-text heuristics -> logical inventory class.
//!
//! ENTITY-MIB class codes are too coarse on their own ("module" covers line
//! cards and transceivers alike), so the mapper also inspects the reported
//! model, name, and description. The rules are evaluated in a fixed order and
//! the first one that applies wins.

use crate::config::EngineConfig;
use crate::models::{classes, DiscoveredRow, PhysicalClass};

const GIGABIT_LONG: &str = "GigabitEthernet";
const GIGABIT_SHORT: &str = "Gi";

/// Normalized display name of a discovered row.
pub fn display_name(raw: &str, abbreviate_gigabit: bool) -> String {
    let trimmed = raw.trim();
    if abbreviate_gigabit {
        trimmed.replace(GIGABIT_LONG, GIGABIT_SHORT)
    } else {
        trimmed.to_string()
    }
}

pub struct ClassMapper<'a> {
    device_class: &'a str,
    config: &'a EngineConfig,
}

impl<'a> ClassMapper<'a> {
    pub fn new(device_class: &'a str, config: &'a EngineConfig) -> Self {
        Self {
            device_class,
            config,
        }
    }

    pub fn device_class(&self) -> &str {
        self.device_class
    }

    pub fn display_name(&self, row: &DiscoveredRow) -> String {
        display_name(&row.name, self.config.abbreviate_gigabit_names)
    }

    pub fn map_row(&self, row: &DiscoveredRow) -> Option<String> {
        self.map(
            &row.model_name,
            &row.class_code,
            &self.display_name(row),
            &row.description,
        )
    }

    /// Logical class for the given row fields, `None` when unmappable.
    pub fn map(&self, model_name: &str, class_code: &str, name: &str, description: &str) -> Option<String> {
        let class = PhysicalClass::from_code(class_code)?;
        let name_lc = name.trim().to_lowercase();
        let descr_lc = description.trim().to_lowercase();
        let both_present = !name_lc.is_empty() && !descr_lc.is_empty();

        let mapped = match class {
            PhysicalClass::Chassis if both_present => self.device_class,
            PhysicalClass::Port => {
                if self.config.is_mini_switch(model_name) {
                    classes::ELECTRICAL_PORT
                } else if name_lc.contains("usb") || descr_lc.contains("usb") {
                    classes::USB_PORT
                } else if is_electrical(&name_lc, &descr_lc) {
                    classes::ELECTRICAL_PORT
                } else if both_present {
                    classes::OPTICAL_PORT
                } else {
                    return None;
                }
            }
            PhysicalClass::Container if !descr_lc.contains("disk") => classes::SLOT,
            PhysicalClass::PowerSupply => {
                if (name_lc.contains("power") && !name_lc.contains("module")) || descr_lc.contains("power") {
                    classes::POWER_PORT
                } else if name_lc.contains("module") {
                    classes::HYBRID_BOARD
                } else {
                    return None;
                }
            }
            PhysicalClass::Module => {
                if is_transceiver(name, &name_lc, &descr_lc) {
                    classes::TRANSCEIVER
                } else {
                    classes::IP_BOARD
                }
            }
            PhysicalClass::Other if descr_lc.contains("switch processor") => classes::SWITCH_PROCESSOR,
            _ => return None,
        };
        Some(mapped.to_string())
    }
}

fn is_electrical(name_lc: &str, descr_lc: &str) -> bool {
    ["fastethernet", "mgmteth", "cpu", "control"]
        .iter()
        .any(|marker| name_lc.contains(marker))
        || (descr_lc.contains("ethernet") && !descr_lc.contains("gigabit"))
        || descr_lc.contains("fast")
        || descr_lc.contains("management")
}

fn is_transceiver(name: &str, name_lc: &str, descr_lc: &str) -> bool {
    if name_lc.contains("spa") || descr_lc.contains("spa") {
        return false;
    }
    // Trailing separators do not count as segments.
    let segments = name.trim().trim_end_matches('/').split('/').count();
    segments > 3
        || name_lc.contains("transceiver")
        || descr_lc.contains("transceiver")
        || ["sfp", "xfp", "cpak"].iter().any(|marker| descr_lc.contains(marker))
        || descr_lc == "ge t"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(config: &EngineConfig) -> ClassMapper<'_> {
        ClassMapper::new("Router", config)
    }

    #[test]
    fn test_chassis_maps_to_device_class() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(m.map("", "3", "R1", "Cisco 7606").as_deref(), Some("Router"));
        assert_eq!(m.map("", "3", "", "Cisco 7606"), None);
    }

    #[test]
    fn test_mini_switch_model_overrides_port_heuristics() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(
            m.map("2960-X", "10", "Te1/0/1", "Ten Gigabit optical uplink").as_deref(),
            Some("ElectricalPort")
        );
        assert_eq!(
            m.map("ASR-9006", "10", "Te1/0/1", "Ten Gigabit optical uplink").as_deref(),
            Some("OpticalPort")
        );
        // The override applies even when name and description are empty.
        assert_eq!(m.map("WS-C2960X", "10", "", "").as_deref(), Some("ElectricalPort"));
    }

    #[test]
    fn test_port_rules() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(m.map("", "10", "usb0", "USB port").as_deref(), Some("USBPort"));
        assert_eq!(m.map("", "10", "Fa0/1", "FastEthernet0/1").as_deref(), Some("ElectricalPort"));
        assert_eq!(m.map("", "10", "MgmtEth0/RSP0/CPU0/0", "x").as_deref(), Some("ElectricalPort"));
        assert_eq!(m.map("", "10", "Eth1", "Ethernet interface").as_deref(), Some("ElectricalPort"));
        assert_eq!(
            m.map("", "10", "Gi0/1", "Gigabit Ethernet interface").as_deref(),
            Some("OpticalPort")
        );
        assert_eq!(m.map("", "10", "Mg0", "Management port").as_deref(), Some("ElectricalPort"));
        assert_eq!(m.map("", "10", "Gi0/1", "").as_deref(), None);
    }

    /// Port rows with neither name nor description are unmappable; the tree
    /// builder drops them without a finding.
    #[test]
    fn test_port_without_name_or_description_is_unmappable() {
        let config = EngineConfig::default();
        assert_eq!(mapper(&config).map("", "10", "", ""), None);
    }

    #[test]
    fn test_container_rules() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(m.map("", "5", "slot 1", "Slot container").as_deref(), Some("Slot"));
        assert_eq!(m.map("", "5", "disk0", "Disk container").as_deref(), None);
    }

    #[test]
    fn test_power_supply_rules() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(m.map("", "6", "Power Supply 0", "AC").as_deref(), Some("PowerPort"));
        assert_eq!(m.map("", "6", "PS0", "AC power supply").as_deref(), Some("PowerPort"));
        assert_eq!(m.map("", "6", "Power Module 1", "AC").as_deref(), Some("HybridBoard"));
        assert_eq!(m.map("", "6", "Fan tray", "fan").as_deref(), None);
    }

    #[test]
    fn test_module_rules() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(m.map("", "9", "0/0/0/1", "module").as_deref(), Some("Transceiver"));
        assert_eq!(m.map("", "9", "Te0/1", "SFP+ 10GBASE-LR").as_deref(), Some("Transceiver"));
        assert_eq!(m.map("", "9", "GE T", "GE T").as_deref(), Some("Transceiver"));
        assert_eq!(m.map("", "9", "module 0/1", "XFP on SPA").as_deref(), Some("IPBoard"));
        assert_eq!(m.map("", "9", "Board0/0", "Line card").as_deref(), Some("IPBoard"));
        assert_eq!(m.map("", "9", "0/1/", "Line card").as_deref(), Some("IPBoard"));
    }

    #[test]
    fn test_switch_processor_rule() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        assert_eq!(
            m.map("", "1", "sup", "Switch Processor card").as_deref(),
            Some("SwitchProcessor")
        );
        assert_eq!(m.map("", "1", "sup", "other").as_deref(), None);
    }

    #[test]
    fn test_other_codes_unmappable() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        for code in ["", "2", "4", "7", "8", "11", "12", "x"] {
            assert_eq!(m.map("", code, "name", "descr"), None, "code {code:?}");
        }
    }

    #[test]
    fn test_every_class_reachable() {
        let config = EngineConfig::default();
        let m = mapper(&config);
        let tuples = [
            ("", "3", "R1", "Cisco"),
            ("2960", "10", "Gi0/1", "x"),
            ("", "10", "usb0", "usb"),
            ("", "10", "Gi0/1", "Gigabit"),
            ("", "5", "slot", "container"),
            ("", "6", "Power 1", "AC"),
            ("", "6", "Module 1", "AC"),
            ("", "9", "SFP", "transceiver"),
            ("", "9", "Board", "Line card"),
            ("", "1", "sp", "switch processor"),
        ];
        let mapped: Vec<String> = tuples
            .iter()
            .map(|(model, code, name, descr)| m.map(model, code, name, descr).unwrap())
            .collect();
        let expected = [
            "Router",
            classes::ELECTRICAL_PORT,
            classes::USB_PORT,
            classes::OPTICAL_PORT,
            classes::SLOT,
            classes::POWER_PORT,
            classes::HYBRID_BOARD,
            classes::TRANSCEIVER,
            classes::IP_BOARD,
            classes::SWITCH_PROCESSOR,
        ];
        assert_eq!(mapped, expected);
        // Deterministic on repeated calls.
        for (model, code, name, descr) in tuples {
            assert_eq!(m.map(model, code, name, descr), m.map(model, code, name, descr));
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(" GigabitEthernet0/1 ", true), "Gi0/1");
        assert_eq!(display_name("GigabitEthernet0/1", false), "GigabitEthernet0/1");
        assert_eq!(display_name("TenGigabitEthernet0/1", true), "TenGi0/1");
    }
}
