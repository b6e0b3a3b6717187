//! Column-oriented discovery table (ENTITY-MIB entPhysicalTable shape).

use std::collections::HashMap;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::{SyncError, SyncResult};
use crate::models::{DiscoveredRow, PhysicalClass};

pub const COL_INSTANCE: &str = "instance";
pub const COL_CONTAINED_IN: &str = "entPhysicalContainedIn";
pub const COL_CLASS: &str = "entPhysicalClass";
pub const COL_NAME: &str = "entPhysicalName";
pub const COL_DESCR: &str = "entPhysicalDescr";
pub const COL_MODEL: &str = "entPhysicalModelName";
pub const COL_VENDOR: &str = "entPhysicalMfgName";
pub const COL_SERIAL: &str = "entPhysicalSerialNum";

const REQUIRED_COLUMNS: &[&str] = &[COL_INSTANCE, COL_CONTAINED_IN, COL_CLASS];

#[derive(Clone, Debug, Default)]
pub struct DiscoveryTable {
    rows: Vec<DiscoveredRow>,
    index: HashMap<String, usize>,
}

impl DiscoveryTable {
    /// Build a table from rows. Duplicate instance ids keep the first row.
    pub fn from_rows(rows: Vec<DiscoveredRow>) -> Self {
        let mut kept = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for row in rows {
            if index.contains_key(&row.instance_id) {
                warn!(
                    "Duplicate discovery instance id {}; keeping the first row",
                    row.instance_id
                );
                continue;
            }
            index.insert(row.instance_id.clone(), kept.len());
            kept.push(row);
        }
        Self { rows: kept, index }
    }

    /// Build a table from named columns. Every column must have the same
    /// length; `instance`, `entPhysicalContainedIn` and `entPhysicalClass`
    /// are required, the others default to empty strings.
    pub fn from_columns<I, K>(columns: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let columns: IndexMap<String, Vec<String>> =
            columns.into_iter().map(|(k, v)| (k.into(), v)).collect();

        for required in REQUIRED_COLUMNS {
            if !columns.contains_key(*required) {
                return Err(SyncError::MalformedTable(format!(
                    "missing required column {}",
                    required
                )));
            }
        }

        let len = columns[COL_INSTANCE].len();
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != len) {
            return Err(SyncError::MalformedTable(format!(
                "column {} has {} values, expected {}",
                name,
                values.len(),
                len
            )));
        }

        let cell = |column: &str, i: usize| -> String {
            columns
                .get(column)
                .and_then(|values| values.get(i))
                .cloned()
                .unwrap_or_default()
        };

        let rows = (0..len)
            .map(|i| DiscoveredRow {
                instance_id: cell(COL_INSTANCE, i),
                contained_in: cell(COL_CONTAINED_IN, i),
                class_code: cell(COL_CLASS, i),
                name: cell(COL_NAME, i),
                description: cell(COL_DESCR, i),
                model_name: cell(COL_MODEL, i),
                vendor_name: cell(COL_VENDOR, i),
                serial_number: cell(COL_SERIAL, i),
            })
            .collect();
        Ok(Self::from_rows(rows))
    }

    /// Parse a JSON object of column name -> array of strings.
    pub fn from_json(text: &str) -> SyncResult<Self> {
        let columns: IndexMap<String, Vec<String>> = serde_json::from_str(text)?;
        Self::from_columns(columns)
    }

    pub fn rows(&self) -> &[DiscoveredRow] {
        &self.rows
    }

    pub fn get(&self, instance_id: &str) -> Option<&DiscoveredRow> {
        self.index.get(instance_id).map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The containing id of the first chassis row: the root the discovery
    /// tree hangs from.
    pub fn root_id(&self) -> SyncResult<&str> {
        self.rows
            .iter()
            .find(|row| row.physical_class() == Some(PhysicalClass::Chassis))
            .map(|row| row.contained_in.as_str())
            .ok_or(SyncError::NoChassis)
    }

    /// Hex SHA-256 over every row, in table order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.rows {
            for field in [
                &row.instance_id,
                &row.contained_in,
                &row.class_code,
                &row.name,
                &row.description,
                &row.model_name,
                &row.vendor_name,
                &row.serial_number,
            ] {
                hasher.update(field.as_bytes());
                hasher.update(b"\x1f");
            }
            hasher.update(b"\x1e");
        }
        format!("{:x}", hasher.finalize())
    }
}
