//! In-memory warehouse catalog - stores databases, schemas and tables

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Catalog, ObjectPath};
use crate::error::ExecError;

/// Warehouse catalog snapshot - databases -> schemas -> tables/views
///
/// All keys are upper-cased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseCatalog {
    pub databases: IndexMap<String, Database>,
}

impl WarehouseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a database
    pub fn get_or_create_database(&mut self, name: &str) -> &mut Database {
        let key = name.to_uppercase();
        self.databases
            .entry(key.clone())
            .or_insert_with(|| Database {
                name: key,
                schemas: IndexMap::new(),
            })
    }

    /// Get or create a schema, creating its database as needed
    pub fn get_or_create_schema(&mut self, database: &str, name: &str) -> &mut Schema {
        let key = name.to_uppercase();
        self.get_or_create_database(database)
            .schemas
            .entry(key.clone())
            .or_insert_with(|| Schema {
                name: key,
                tables: IndexMap::new(),
            })
    }

    /// Add a table or view, creating parents as needed
    pub fn add_object(&mut self, path: &ObjectPath, kind: ObjectKind) {
        self.get_or_create_schema(&path.database, &path.schema)
            .tables
            .insert(
                path.name.clone(),
                TableDef {
                    name: path.name.clone(),
                    kind,
                },
            );
    }

    pub fn get_database(&self, name: &str) -> Option<&Database> {
        self.databases.get(&name.to_uppercase())
    }

    pub fn get_schema(&self, database: &str, name: &str) -> Option<&Schema> {
        self.get_database(database)
            .and_then(|db| db.schemas.get(&name.to_uppercase()))
    }

    pub fn get_object(&self, path: &ObjectPath) -> Option<&TableDef> {
        self.get_schema(&path.database, &path.schema)
            .and_then(|s| s.tables.get(&path.name))
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.get_database(name).is_some()
    }

    pub fn has_schema(&self, database: &str, name: &str) -> bool {
        self.get_schema(database, name).is_some()
    }

    pub fn has_object(&self, path: &ObjectPath) -> bool {
        self.get_object(path).is_some()
    }

    pub fn remove_database(&mut self, name: &str) -> Option<Database> {
        self.databases.shift_remove(&name.to_uppercase())
    }

    pub fn remove_schema(&mut self, database: &str, name: &str) -> Option<Schema> {
        self.databases
            .get_mut(&database.to_uppercase())
            .and_then(|db| db.schemas.shift_remove(&name.to_uppercase()))
    }

    pub fn remove_object(&mut self, path: &ObjectPath) -> Option<TableDef> {
        self.databases
            .get_mut(&path.database)
            .and_then(|db| db.schemas.get_mut(&path.schema))
            .and_then(|s| s.tables.shift_remove(&path.name))
    }

    /// Get all table and view paths
    pub fn object_paths(&self) -> Vec<ObjectPath> {
        self.databases
            .values()
            .flat_map(|db| {
                db.schemas.values().flat_map(move |schema| {
                    schema
                        .tables
                        .keys()
                        .map(move |name| ObjectPath::new(&db.name, &schema.name, name))
                })
            })
            .collect()
    }
}

impl Catalog for WarehouseCatalog {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError> {
        Ok(self.has_database(name))
    }

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError> {
        Ok(self.has_schema(database, name))
    }

    fn table_exists(
        &mut self,
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<bool, ExecError> {
        Ok(self.has_object(&ObjectPath::new(database, schema, name)))
    }
}

/// A database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub schemas: IndexMap<String, Schema>,
}

/// A schema (namespace) within a database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: IndexMap<String, TableDef>,
}

/// Table or view entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Table,
    View,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_add_object_creates_parents() {
        let mut catalog = WarehouseCatalog::new();
        catalog.add_object(&ObjectPath::new("prod", "sales", "orders"), ObjectKind::Table);

        assert!(catalog.has_database("PROD"));
        assert!(catalog.has_schema("prod", "SALES"));
        assert!(catalog.has_object(&ObjectPath::new("PROD", "SALES", "ORDERS")));
        assert_eq!(
            catalog.object_paths(),
            vec![ObjectPath::new("PROD", "SALES", "ORDERS")]
        );
    }

    #[test]
    fn test_catalog_capability_lookups() {
        let mut catalog = WarehouseCatalog::new();
        catalog.get_or_create_schema("D", "S");

        assert_eq!(catalog.database_exists("D"), Ok(true));
        assert_eq!(catalog.database_exists("X"), Ok(false));
        assert_eq!(catalog.schema_exists("D", "S"), Ok(true));
        assert_eq!(catalog.table_exists("D", "S", "T"), Ok(false));
    }

    #[test]
    fn test_catalog_remove() {
        let mut catalog = WarehouseCatalog::new();
        let path = ObjectPath::new("D", "S", "T");
        catalog.add_object(&path, ObjectKind::View);
        assert_eq!(catalog.remove_object(&path).map(|t| t.kind), Some(ObjectKind::View));
        assert!(catalog.remove_schema("D", "S").is_some());
        assert!(!catalog.has_schema("D", "S"));
        assert!(catalog.remove_database("d").is_some());
        assert!(catalog.databases.is_empty());
    }
}
