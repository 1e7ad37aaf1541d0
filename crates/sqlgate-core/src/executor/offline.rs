//! Executor over an in-memory catalog snapshot
//!
//! Plan checks parse the statement and resolve every qualified relation
//! against the catalog. Running a statement additionally applies catalog DDL,
//! so later statements of the same script see the objects it creates. No data
//! is read or written.

use std::ops::ControlFlow;

use sqlparser::ast::{visit_relations, ObjectName, Statement, Visit};
use sqlparser::parser::Parser;

use super::{Executor, PlanInfo, RowSet};
use crate::catalog::{apply_ddl, not_found, Catalog, DdlEffect, NameContext, WarehouseCatalog};
use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, ExecError};

pub struct OfflineExecutor {
    catalog: WarehouseCatalog,
    context: NameContext,
    dialect: SqlDialect,
}

impl OfflineExecutor {
    pub fn new(catalog: WarehouseCatalog) -> Self {
        Self {
            catalog,
            context: NameContext::default(),
            dialect: SqlDialect::default(),
        }
    }

    pub fn with_context(mut self, context: NameContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn catalog(&self) -> &WarehouseCatalog {
        &self.catalog
    }

    fn parse(&self, sql: &str) -> Result<Statement, ExecError> {
        let dialect = self.dialect.parser_dialect();
        let mut statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
            ExecError::Statement(
                Diagnostic::new(format!("SQL compilation error: {}", e))
                    .with_code("001003")
                    .with_sql_state("42000"),
            )
        })?;
        match statements.len() {
            1 => Ok(statements.remove(0)),
            n => Err(ExecError::statement(format!(
                "Expected exactly one statement, found {}",
                n
            ))),
        }
    }

    /// Validate a statement; apply its catalog effect when `apply` is set
    fn check(&mut self, sql: &str, apply: bool) -> Result<usize, ExecError> {
        let stmt = self.parse(sql)?;
        let effect = apply_ddl(&mut self.catalog, &self.context, &stmt, false)
            .map_err(ExecError::Statement)?;

        let mut names = Vec::new();
        match &stmt {
            Statement::CreateTable(create) => {
                if let Some(query) = &create.query {
                    collect_relations(query.as_ref(), &mut names);
                }
            }
            Statement::CreateView { query, .. } => collect_relations(query.as_ref(), &mut names),
            _ if effect == DdlEffect::NotDdl => {
                collect_relations(&stmt, &mut names);
                if let Statement::Insert(insert) = &stmt {
                    names.push(insert.table_name.clone());
                }
            }
            _ => {}
        }
        names.dedup();

        let mut resolved = 0;
        for name in &names {
            // Single-part names may be CTEs; only qualified names are checked
            if name.0.len() < 2 {
                continue;
            }
            let Some(path) = self.context.resolve_object(name) else {
                continue;
            };
            if !self.catalog.has_object(&path) {
                return Err(ExecError::Statement(not_found(
                    "Object",
                    &path.to_string(),
                )));
            }
            resolved += 1;
        }

        if apply && effect == DdlEffect::Changed {
            apply_ddl(&mut self.catalog, &self.context, &stmt, true)
                .map_err(ExecError::Statement)?;
        }
        Ok(resolved)
    }
}

fn collect_relations<V: Visit>(node: &V, names: &mut Vec<ObjectName>) {
    let _ = visit_relations(node, |name| {
        names.push(name.clone());
        ControlFlow::<()>::Continue(())
    });
}

impl Executor for OfflineExecutor {
    fn plan_check(&mut self, statement: &str) -> Result<PlanInfo, ExecError> {
        let resolved = self.check(statement, false)?;
        Ok(PlanInfo {
            text: format!("offline plan: {} qualified object(s) resolved", resolved),
        })
    }

    fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
        self.check(statement, true)?;
        Ok(RowSet::default())
    }
}

impl Catalog for OfflineExecutor {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError> {
        self.catalog.database_exists(name)
    }

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError> {
        self.catalog.schema_exists(database, name)
    }

    fn table_exists(
        &mut self,
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<bool, ExecError> {
        self.catalog.table_exists(database, schema, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ObjectKind, ObjectPath};

    fn executor() -> OfflineExecutor {
        let mut catalog = WarehouseCatalog::new();
        catalog.add_object(&ObjectPath::new("DB", "SCH", "TBL"), ObjectKind::Table);
        OfflineExecutor::new(catalog)
    }

    fn message(err: ExecError) -> String {
        match err {
            ExecError::Statement(diag) => diag.message,
            ExecError::Connection(msg) => panic!("unexpected connection error: {}", msg),
        }
    }

    #[test]
    fn test_plan_check_valid_statements() {
        let mut exec = executor();
        assert!(exec.plan_check("SELECT * FROM db.sch.tbl").is_ok());
        assert!(exec.plan_check("INSERT INTO db.sch.tbl VALUES (1)").is_ok());
        assert!(exec.plan_check("SELECT 1").is_ok());
    }

    #[test]
    fn test_plan_check_syntax_error() {
        let mut exec = executor();
        let err = exec.plan_check("SELEC 1").unwrap_err();
        assert!(message(err).starts_with("SQL compilation error"));
    }

    #[test]
    fn test_plan_check_missing_join_table() {
        let mut exec = executor();
        let err = exec
            .plan_check("SELECT * FROM db.sch.tbl a JOIN db.sch.other b ON a.id = b.id")
            .unwrap_err();
        assert!(message(err).contains("DB.SCH.OTHER"));
    }

    #[test]
    fn test_plan_check_does_not_apply_ddl() {
        let mut exec = executor();
        exec.plan_check("CREATE TABLE db.sch.new_tbl (id INT)").unwrap();
        assert!(!exec.catalog().has_object(&ObjectPath::new("DB", "SCH", "NEW_TBL")));
    }

    #[test]
    fn test_run_applies_ddl_for_later_statements() {
        let mut exec = executor();
        exec.run("CREATE TABLE db.sch.new_tbl (id INT)").unwrap();
        assert!(exec.run("INSERT INTO db.sch.new_tbl VALUES (1)").is_ok());
        exec.run("DROP TABLE db.sch.new_tbl").unwrap();
        assert!(exec.run("INSERT INTO db.sch.new_tbl VALUES (1)").is_err());
    }

    #[test]
    fn test_ctas_checks_source_query() {
        let mut exec = executor();
        let err = exec
            .run("CREATE TABLE db.sch.tbl_copy AS SELECT * FROM db.sch.missing")
            .unwrap_err();
        assert!(message(err).contains("DB.SCH.MISSING"));
        assert!(!exec.catalog().has_object(&ObjectPath::new("DB", "SCH", "TBL_COPY")));
    }

    #[test]
    fn test_create_in_missing_schema_fails() {
        let mut exec = executor();
        let err = exec.run("CREATE TABLE db.nope.t (id INT)").unwrap_err();
        assert!(message(err).contains("DB.NOPE"));
    }
}
