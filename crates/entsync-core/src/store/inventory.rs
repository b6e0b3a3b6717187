//! SQLite-backed inventory: class metadata, the object graph, and the
//! list-type catalog behind one connection.

use std::path::Path;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::collaborators::{CatalogRepository, InventoryGraph, MetadataRepository};
use crate::errors::{SyncError, SyncResult};
use crate::models::{
    attributes, AttributeDefinition, Attributes, CatalogEntry, ClassDefinition, InventoryObject,
    ObjectLight,
};
use crate::store::schema;

/// Guard against malformed inheritance chains.
const MAX_CLASS_DEPTH: usize = 64;

pub struct InventoryStore {
    conn: Mutex<Connection>,
}

impl InventoryStore {
    /// Open (or create) a store at `path`. Parent directories are created
    /// if they do not already exist.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        debug!("Opened inventory store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // -- metadata -------------------------------------------------------------

    pub fn create_class(&self, name: &str, parent_class: Option<&str>) -> SyncResult<()> {
        self.conn.lock().execute(
            "INSERT INTO classes(name, parent_class) VALUES(?1, ?2) \
             ON CONFLICT(name) DO UPDATE SET parent_class = excluded.parent_class;",
            params![name, parent_class],
        )?;
        Ok(())
    }

    pub fn add_attribute(&self, class_name: &str, name: &str, attribute_type: &str) -> SyncResult<()> {
        self.conn.lock().execute(
            "INSERT INTO class_attributes(class_name, name, attribute_type) VALUES(?1, ?2, ?3) \
             ON CONFLICT(class_name, name) DO UPDATE SET attribute_type = excluded.attribute_type;",
            params![class_name, name, attribute_type],
        )?;
        Ok(())
    }

    pub fn add_possible_children(&self, parent_class: &str, children: &[&str]) -> SyncResult<()> {
        let conn = self.conn.lock();
        for child in children {
            conn.execute(
                "INSERT OR IGNORE INTO containment(parent_class, child_class) VALUES(?1, ?2);",
                params![parent_class, child],
            )?;
        }
        Ok(())
    }

    // -- objects --------------------------------------------------------------

    /// Create an object under `parent_id` (or as a root) and return its id.
    /// `name` is stored both as a column and as the `name` attribute.
    pub fn create_object(
        &self,
        class_name: &str,
        name: &str,
        parent_id: Option<&str>,
        attrs: &[(&str, &str)],
    ) -> SyncResult<String> {
        let parent = parent_id.map(parse_id).transpose()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO objects(class_name, name, parent_id) VALUES(?1, ?2, ?3);",
            params![class_name, name, parent],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO object_attributes(object_id, name, value) VALUES(?1, ?2, ?3);",
            params![id, attributes::NAME, name],
        )?;
        for (key, value) in attrs {
            if *key == attributes::NAME {
                continue;
            }
            tx.execute(
                "INSERT INTO object_attributes(object_id, name, value) VALUES(?1, ?2, ?3) \
                 ON CONFLICT(object_id, name) DO UPDATE SET value = excluded.value;",
                params![id, key, value],
            )?;
        }
        tx.commit()?;
        Ok(id.to_string())
    }

    fn parent_of_class(conn: &Connection, class_name: &str) -> SyncResult<Option<Option<String>>> {
        Ok(conn
            .query_row(
                "SELECT parent_class FROM classes WHERE name = ?1;",
                params![class_name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?)
    }

    /// `class_name` followed by its ancestors, nearest first.
    fn lineage(conn: &Connection, class_name: &str) -> SyncResult<Vec<String>> {
        let mut chain = Vec::new();
        let mut current = Some(class_name.to_string());
        while let Some(name) = current {
            if chain.len() >= MAX_CLASS_DEPTH || chain.contains(&name) {
                return Err(SyncError::Store(format!(
                    "class hierarchy of {} is cyclic or too deep",
                    class_name
                )));
            }
            match Self::parent_of_class(conn, &name)? {
                Some(parent) => {
                    chain.push(name);
                    current = parent;
                }
                None if chain.is_empty() => {
                    return Err(SyncError::ClassNotFound(name));
                }
                None => {
                    return Err(SyncError::Store(format!(
                        "class {} inherits from missing class {}",
                        class_name, name
                    )));
                }
            }
        }
        Ok(chain)
    }
}

fn parse_id(id: &str) -> SyncResult<i64> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| SyncError::Store(format!("invalid object id {:?}", id)))
}

fn not_found(class_name: &str, id: &str) -> SyncError {
    SyncError::ObjectNotFound {
        class_name: class_name.to_string(),
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

impl MetadataRepository for InventoryStore {
    fn possible_children(&self, class_name: &str) -> SyncResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT child_class FROM containment WHERE parent_class = ?1 ORDER BY rowid;",
        )?;
        let rows = stmt.query_map(params![class_name], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn class_definition(&self, class_name: &str) -> SyncResult<ClassDefinition> {
        let conn = self.conn.lock();
        let lineage = Self::lineage(&conn, class_name)?;
        let mut stmt = conn.prepare(
            "SELECT name, attribute_type FROM class_attributes WHERE class_name = ?1 ORDER BY rowid;",
        )?;
        let mut attrs: IndexMap<String, AttributeDefinition> = IndexMap::new();
        // Root first, so subclasses override inherited definitions.
        for class in lineage.iter().rev() {
            let rows = stmt.query_map(params![class], |row| {
                Ok(AttributeDefinition {
                    name: row.get(0)?,
                    attribute_type: row.get(1)?,
                })
            })?;
            for def in rows {
                let def = def?;
                attrs.insert(def.name.clone(), def);
            }
        }
        Ok(ClassDefinition {
            name: class_name.to_string(),
            attributes: attrs,
        })
    }

    fn is_subclass_of(&self, class_name: &str, ancestor: &str) -> SyncResult<bool> {
        let conn = self.conn.lock();
        match Self::lineage(&conn, class_name) {
            Ok(chain) => Ok(chain.iter().any(|c| c == ancestor)),
            Err(SyncError::ClassNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl InventoryGraph for InventoryStore {
    fn children(&self, _class_name: &str, id: &str) -> SyncResult<Vec<ObjectLight>> {
        let parent = parse_id(id)?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, class_name FROM objects WHERE parent_id = ?1 ORDER BY id;",
        )?;
        let rows = stmt.query_map(params![parent], |row| {
            Ok(ObjectLight {
                id: row.get::<_, i64>(0)?.to_string(),
                name: row.get(1)?,
                class_name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn object(&self, class_name: &str, id: &str) -> SyncResult<InventoryObject> {
        let object_id = parse_id(id)?;
        let conn = self.conn.lock();
        let stored_class: Option<String> = conn
            .query_row(
                "SELECT class_name FROM objects WHERE id = ?1;",
                params![object_id],
                |row| row.get(0),
            )
            .optional()?;
        let stored_class = stored_class.ok_or_else(|| not_found(class_name, id))?;

        let mut stmt = conn.prepare(
            "SELECT name, value FROM object_attributes WHERE object_id = ?1 ORDER BY rowid;",
        )?;
        let rows = stmt.query_map(params![object_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut attrs = Attributes::new();
        for pair in rows {
            let (key, value) = pair?;
            attrs.insert(key, value);
        }
        Ok(InventoryObject {
            id: object_id.to_string(),
            class_name: stored_class,
            attributes: attrs,
        })
    }

    fn parent(&self, class_name: &str, id: &str) -> SyncResult<ObjectLight> {
        let object_id = parse_id(id)?;
        let conn = self.conn.lock();
        let parent_id: Option<Option<i64>> = conn
            .query_row(
                "SELECT parent_id FROM objects WHERE id = ?1;",
                params![object_id],
                |row| row.get(0),
            )
            .optional()?;
        let parent_id = parent_id
            .ok_or_else(|| not_found(class_name, id))?
            .ok_or_else(|| SyncError::NoParent {
                class_name: class_name.to_string(),
                id: id.to_string(),
            })?;
        conn.query_row(
            "SELECT id, name, class_name FROM objects WHERE id = ?1;",
            params![parent_id],
            |row| {
                Ok(ObjectLight {
                    id: row.get::<_, i64>(0)?.to_string(),
                    name: row.get(1)?,
                    class_name: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| not_found(class_name, &parent_id.to_string()))
    }
}

impl CatalogRepository for InventoryStore {
    fn list_entries(&self, catalog_class: &str) -> SyncResult<Vec<CatalogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name FROM catalog_entries WHERE catalog_class = ?1 ORDER BY id;",
        )?;
        let rows = stmt.query_map(params![catalog_class], |row| {
            Ok(CatalogEntry {
                id: row.get::<_, i64>(0)?.to_string(),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn create_entry(&self, catalog_class: &str, name: &str, description: &str) -> SyncResult<String> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO catalog_entries(catalog_class, name, description) VALUES(?1, ?2, ?3);",
            params![catalog_class, name, description],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created catalog entry {} in {} with id {}", name, catalog_class, id);
        Ok(id.to_string())
    }
}
