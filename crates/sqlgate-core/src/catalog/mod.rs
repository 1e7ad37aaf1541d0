//! Catalog capability and its implementations

mod builder;
mod information_schema;
mod memory;

use serde::{Deserialize, Serialize};
use sqlparser::ast::ObjectName;

use crate::error::ExecError;

pub use builder::CatalogBuilder;
pub(crate) use builder::{apply_ddl, not_found, DdlEffect};
pub use information_schema::InformationSchemaCatalog;
pub use memory::{Database, ObjectKind, Schema, TableDef, WarehouseCatalog};

/// Existence lookups against a warehouse catalog.
///
/// Identifiers are passed upper-cased; case handling beyond that is up to
/// the implementation. Each call is one round-trip.
pub trait Catalog {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError>;

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError>;

    fn table_exists(&mut self, database: &str, schema: &str, name: &str)
        -> Result<bool, ExecError>;
}

impl<C: Catalog + ?Sized> Catalog for &mut C {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError> {
        (**self).database_exists(name)
    }

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError> {
        (**self).schema_exists(database, name)
    }

    fn table_exists(
        &mut self,
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<bool, ExecError> {
        (**self).table_exists(database, schema, name)
    }
}

/// Fully resolved `DATABASE.SCHEMA.NAME` path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectPath {
    pub database: String,
    pub schema: String,
    pub name: String,
}

impl ObjectPath {
    pub fn new(database: &str, schema: &str, name: &str) -> Self {
        Self {
            database: database.to_uppercase(),
            schema: schema.to_uppercase(),
            name: name.to_uppercase(),
        }
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.name)
    }
}

/// Default database/schema used to resolve partially qualified names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameContext {
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl NameContext {
    pub fn new(database: Option<String>, schema: Option<String>) -> Self {
        Self {
            database: database.map(|d| d.to_uppercase()),
            schema: schema.map(|s| s.to_uppercase()),
        }
    }

    /// Resolve a table-level name (`t`, `s.t`, `d.s.t`)
    pub fn resolve_object(&self, name: &ObjectName) -> Option<ObjectPath> {
        match name.0.as_slice() {
            [db, schema, table] => Some(ObjectPath::new(&db.value, &schema.value, &table.value)),
            [schema, table] => {
                let db = self.database.as_ref()?;
                Some(ObjectPath::new(db, &schema.value, &table.value))
            }
            [table] => {
                let db = self.database.as_ref()?;
                let schema = self.schema.as_ref()?;
                Some(ObjectPath::new(db, schema, &table.value))
            }
            _ => None,
        }
    }

    /// Resolve a schema-level name (`s`, `d.s`) into (database, schema)
    pub fn resolve_schema(&self, name: &ObjectName) -> Option<(String, String)> {
        match name.0.as_slice() {
            [db, schema] => Some((db.value.to_uppercase(), schema.value.to_uppercase())),
            [schema] => {
                let db = self.database.as_ref()?;
                Some((db.clone(), schema.value.to_uppercase()))
            }
            _ => None,
        }
    }
}
