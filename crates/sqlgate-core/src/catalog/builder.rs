//! Catalog builder - converts DDL snapshots to a WarehouseCatalog

use sqlparser::ast::{ObjectName, ObjectType, SchemaName, Statement};
use sqlparser::parser::Parser;

use super::{NameContext, ObjectKind, ObjectPath, WarehouseCatalog};
use crate::dialect::SqlDialect;
use crate::error::Diagnostic;
use crate::sql::{split_statements, strip_comments};

/// Builder for constructing a WarehouseCatalog from DDL definitions
/// (`CREATE DATABASE`, `CREATE SCHEMA`, `CREATE TABLE`, `CREATE VIEW`, `DROP ...`)
pub struct CatalogBuilder {
    catalog: WarehouseCatalog,
    context: NameContext,
    dialect: SqlDialect,
    warnings: Vec<String>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::default())
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self {
            catalog: WarehouseCatalog::new(),
            context: NameContext::default(),
            dialect,
            warnings: Vec::new(),
        }
    }

    /// Database/schema used for partially qualified names
    pub fn with_context(mut self, context: NameContext) -> Self {
        self.context = context;
        self
    }

    /// Parse DDL definitions into the catalog.
    ///
    /// Statements that fail to parse, or that are not catalog DDL, are
    /// skipped with a warning.
    pub fn parse(&mut self, sql: &str) {
        let dialect = self.dialect.parser_dialect();
        let cleaned = strip_comments(sql);

        // Try parsing the entire text first (fast path)
        if let Ok(statements) = Parser::parse_sql(dialect.as_ref(), &cleaned) {
            for stmt in &statements {
                self.process_statement(stmt);
            }
            return;
        }

        // Fall back to statement-by-statement parsing to skip unsupported syntax
        for raw in split_statements(&cleaned) {
            match Parser::parse_sql(dialect.as_ref(), raw) {
                Ok(stmts) => {
                    for stmt in &stmts {
                        self.process_statement(stmt);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unparseable catalog statement");
                    self.warnings.push(format!("skipped unparseable statement: {}", e));
                }
            }
        }
    }

    fn process_statement(&mut self, stmt: &Statement) {
        match apply_ddl(&mut self.catalog, &self.context, stmt, true) {
            Ok(DdlEffect::NotDdl) => {
                self.warnings
                    .push(format!("ignored non-catalog statement: {}", stmt));
            }
            Ok(_) => {}
            Err(diag) => self.warnings.push(diag.message),
        }
    }

    pub fn build(self) -> (WarehouseCatalog, Vec<String>) {
        (self.catalog, self.warnings)
    }
}

/// What a statement does to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DdlEffect {
    NotDdl,
    Changed,
    Unchanged,
}

fn unresolved(name: &ObjectName) -> Diagnostic {
    Diagnostic::new(format!(
        "Cannot resolve '{}': no current database/schema for partially qualified name",
        name
    ))
}

pub(crate) fn not_found(kind: &str, name: &str) -> Diagnostic {
    Diagnostic::new(format!("{} '{}' does not exist or not authorized.", kind, name))
        .with_code("002003")
        .with_sql_state("02000")
}

fn already_exists(kind: &str, name: &str) -> Diagnostic {
    Diagnostic::new(format!("{} '{}' already exists.", kind, name))
        .with_code("002002")
        .with_sql_state("42710")
}

/// Check a DDL statement against the catalog and, when `apply` is set,
/// apply it.
///
/// Parents must exist: a schema needs its database, a table its schema.
pub(crate) fn apply_ddl(
    catalog: &mut WarehouseCatalog,
    context: &NameContext,
    stmt: &Statement,
    apply: bool,
) -> Result<DdlEffect, Diagnostic> {
    match stmt {
        Statement::CreateDatabase { db_name, .. } => {
            let name = match db_name.0.as_slice() {
                [ident] => ident.value.to_uppercase(),
                _ => return Err(unresolved(db_name)),
            };
            if catalog.has_database(&name) {
                return Ok(DdlEffect::Unchanged);
            }
            if apply {
                catalog.get_or_create_database(&name);
            }
            Ok(DdlEffect::Changed)
        }
        Statement::CreateSchema {
            schema_name: SchemaName::Simple(name),
            ..
        } => {
            let (db, schema) = context.resolve_schema(name).ok_or_else(|| unresolved(name))?;
            if !catalog.has_database(&db) {
                return Err(not_found("Database", &db));
            }
            if catalog.has_schema(&db, &schema) {
                return Ok(DdlEffect::Unchanged);
            }
            if apply {
                catalog.get_or_create_schema(&db, &schema);
            }
            Ok(DdlEffect::Changed)
        }
        Statement::CreateTable(create) => create_object(
            catalog,
            context,
            &create.name,
            ObjectKind::Table,
            create.or_replace,
            create.if_not_exists,
            apply,
        ),
        Statement::CreateView {
            name, or_replace, ..
        } => create_object(
            catalog,
            context,
            name,
            ObjectKind::View,
            *or_replace,
            false,
            apply,
        ),
        Statement::Drop {
            object_type,
            if_exists,
            names,
            ..
        } => {
            let mut effect = DdlEffect::Unchanged;
            for name in names {
                if drop_object(catalog, context, object_type, name, *if_exists, apply)? {
                    effect = DdlEffect::Changed;
                }
            }
            Ok(effect)
        }
        _ => Ok(DdlEffect::NotDdl),
    }
}

fn create_object(
    catalog: &mut WarehouseCatalog,
    context: &NameContext,
    name: &ObjectName,
    kind: ObjectKind,
    or_replace: bool,
    if_not_exists: bool,
    apply: bool,
) -> Result<DdlEffect, Diagnostic> {
    let path = context.resolve_object(name).ok_or_else(|| unresolved(name))?;
    if !catalog.has_database(&path.database) {
        return Err(not_found("Database", &path.database));
    }
    if !catalog.has_schema(&path.database, &path.schema) {
        return Err(not_found(
            "Schema",
            &format!("{}.{}", path.database, path.schema),
        ));
    }
    if catalog.has_object(&path) && !or_replace {
        if if_not_exists {
            return Ok(DdlEffect::Unchanged);
        }
        return Err(already_exists("Object", &path.to_string()));
    }
    if apply {
        catalog.add_object(&path, kind);
    }
    Ok(DdlEffect::Changed)
}

/// Returns whether something was (or would be) dropped
fn drop_object(
    catalog: &mut WarehouseCatalog,
    context: &NameContext,
    object_type: &ObjectType,
    name: &ObjectName,
    if_exists: bool,
    apply: bool,
) -> Result<bool, Diagnostic> {
    let missing = |kind: &str, display: String| {
        if if_exists {
            Ok(false)
        } else {
            Err(not_found(kind, &display))
        }
    };

    match object_type {
        ObjectType::Table | ObjectType::View => {
            let path = context.resolve_object(name).ok_or_else(|| unresolved(name))?;
            if !catalog.has_object(&path) {
                return missing("Object", path.to_string());
            }
            if apply {
                catalog.remove_object(&path);
            }
            Ok(true)
        }
        ObjectType::Schema => {
            let (db, schema) = context.resolve_schema(name).ok_or_else(|| unresolved(name))?;
            if !catalog.has_schema(&db, &schema) {
                return missing("Schema", format!("{}.{}", db, schema));
            }
            if apply {
                catalog.remove_schema(&db, &schema);
            }
            Ok(true)
        }
        ObjectType::Database => {
            let db = name.to_string().to_uppercase();
            if !catalog.has_database(&db) {
                return missing("Database", db);
            }
            if apply {
                catalog.remove_database(&db);
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}
