//! Resolution of free-text vendor and model strings to catalog entries.

use tracing::debug;

use crate::collaborators::CatalogRepository;
use crate::errors::SyncResult;
use crate::findings::SyncFinding;
use crate::models::{CatalogEntry, DiscoveredRow};
use crate::reconcile::session::ReconciliationSession;

/// Which discovered column feeds a list-type attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListTypeSource {
    Vendor,
    Model,
}

impl ListTypeSource {
    pub fn value(self, row: &DiscoveredRow) -> &str {
        match self {
            Self::Vendor => &row.vendor_name,
            Self::Model => &row.model_name,
        }
    }
}

/// Exact name first, then normalized equality, then a positional prefix
/// check: the normalized input must line up character for character with the
/// start of a longer entry name.
pub fn match_catalog_entry<'e>(name: &str, entries: &'e [CatalogEntry]) -> Option<&'e CatalogEntry> {
    if let Some(exact) = entries.iter().find(|e| e.name == name) {
        return Some(exact);
    }
    let wanted: Vec<char> = name.trim().to_lowercase().chars().collect();
    if wanted.is_empty() {
        return None;
    }
    entries.iter().find(|entry| {
        let candidate: Vec<char> = entry.name.trim().to_lowercase().chars().collect();
        if candidate == wanted {
            return true;
        }
        candidate.len() > wanted.len()
            && wanted
                .iter()
                .zip(candidate.iter())
                .filter(|(a, b)| a == b)
                .count()
                == wanted.len()
    })
}

pub struct ListTypeResolver<'a> {
    catalog: &'a dyn CatalogRepository,
}

impl<'a> ListTypeResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogRepository) -> Self {
        Self { catalog }
    }

    /// Catalog id for the row's vendor or model string, creating the entry
    /// (and recording a NEW finding) when nothing matches. Empty values
    /// resolve to `None`.
    pub fn resolve(
        &self,
        row: &DiscoveredRow,
        source: ListTypeSource,
        catalog_class: &str,
        session: &mut ReconciliationSession,
    ) -> SyncResult<Option<String>> {
        let name = source.value(row).trim();
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(id) = session.memoized_list_type(catalog_class, name) {
            return Ok(Some(id.to_string()));
        }

        let entries = self.catalog.list_entries(catalog_class)?;
        if let Some(entry) = match_catalog_entry(name, &entries) {
            session.memoize_list_type(catalog_class, name, &entry.id);
            return Ok(Some(entry.id.clone()));
        }

        let id = self.catalog.create_entry(catalog_class, name, name)?;
        debug!("Created list type {} in {} ({})", name, catalog_class, id);
        session.memoize_list_type(catalog_class, name, &id);
        session.stats.catalog_entries_created += 1;
        session.push(SyncFinding::list_type(catalog_class, name, &id));
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{FindingKind, FindingPayload};
    use crate::store::InventoryStore;

    fn entries(names: &[&str]) -> Vec<CatalogEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| CatalogEntry {
                id: (i + 1).to_string(),
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let list = entries(&["cisco", "Cisco"]);
        assert_eq!(match_catalog_entry("Cisco", &list).unwrap().id, "2");
    }

    #[test]
    fn test_normalized_match() {
        let list = entries(&["Juniper", " CISCO "]);
        assert_eq!(match_catalog_entry("cisco", &list).unwrap().id, "2");
    }

    #[test]
    fn test_positional_prefix_match() {
        let list = entries(&["Cisco Systems, Inc."]);
        assert_eq!(match_catalog_entry("cisco", &list).unwrap().id, "1");
        // Input longer than the entry never matches.
        assert!(match_catalog_entry("Cisco Systems, Inc. (US)", &list).is_none());
        // Same length but different spelling.
        assert!(match_catalog_entry("Cisko Systems, Inc.", &list).is_none());
        assert!(match_catalog_entry("Systems", &list).is_none());
        assert!(match_catalog_entry("   ", &list).is_none());
    }

    fn vendor_row(vendor: &str) -> DiscoveredRow {
        DiscoveredRow {
            instance_id: "4".into(),
            vendor_name: vendor.into(),
            model_name: "ASR-9006".into(),
            ..DiscoveredRow::default()
        }
    }

    #[test]
    fn test_resolve_existing_entry() {
        let store = InventoryStore::open_in_memory().unwrap();
        let id = store.create_entry("EquipmentVendor", "Cisco Systems", "").unwrap();
        let resolver = ListTypeResolver::new(&store);
        let mut session = ReconciliationSession::new();
        let got = resolver
            .resolve(&vendor_row("Cisco"), ListTypeSource::Vendor, "EquipmentVendor", &mut session)
            .unwrap();
        assert_eq!(got, Some(id));
        assert!(session.findings().is_empty());
    }

    #[test]
    fn test_resolve_creates_once_per_run() {
        let store = InventoryStore::open_in_memory().unwrap();
        let resolver = ListTypeResolver::new(&store);
        let mut session = ReconciliationSession::new();
        let row = vendor_row("");
        let first = resolver
            .resolve(&row, ListTypeSource::Model, "EquipmentModel", &mut session)
            .unwrap()
            .unwrap();
        let second = resolver
            .resolve(&row, ListTypeSource::Model, "EquipmentModel", &mut session)
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(session.count(FindingKind::New), 1);
        assert_eq!(session.stats.catalog_entries_created, 1);
        match &session.findings()[0].payload {
            FindingPayload::ListType {
                catalog_class,
                name,
                entry_id,
            } => {
                assert_eq!(catalog_class, "EquipmentModel");
                assert_eq!(name, "ASR-9006");
                assert_eq!(entry_id, &first);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(store.list_entries("EquipmentModel").unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_empty_value() {
        let store = InventoryStore::open_in_memory().unwrap();
        let resolver = ListTypeResolver::new(&store);
        let mut session = ReconciliationSession::new();
        let got = resolver
            .resolve(&vendor_row("  "), ListTypeSource::Vendor, "EquipmentVendor", &mut session)
            .unwrap();
        assert_eq!(got, None);
        assert!(store.list_entries("EquipmentVendor").unwrap().is_empty());
    }
}
