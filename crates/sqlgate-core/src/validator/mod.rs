//! Statement validation: catalog existence checks and plan checks

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{ExecError, RunError};
use crate::executor::{Executor, PlanInfo, RowSet};
use crate::sql::{ObjectReference, SourceFile, Statement};

/// Outcome of validating one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    MissingDatabase,
    MissingSchema,
    MissingTable,
    PlanError,
    /// No qualified reference to check; passes, but is not `Valid`
    NoReference,
}

impl ValidationOutcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, ValidationOutcome::Valid | ValidationOutcome::NoReference)
    }

    pub fn is_catalog_miss(&self) -> bool {
        matches!(
            self,
            ValidationOutcome::MissingDatabase
                | ValidationOutcome::MissingSchema
                | ValidationOutcome::MissingTable
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValidationOutcome::Valid => "valid",
            ValidationOutcome::MissingDatabase => "missing-database",
            ValidationOutcome::MissingSchema => "missing-schema",
            ValidationOutcome::MissingTable => "missing-table",
            ValidationOutcome::PlanError => "plan-error",
            ValidationOutcome::NoReference => "no-reference",
        }
    }
}

/// Validation result for one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub statement: Statement,
    pub outcome: ValidationOutcome,
    pub message: String,
    pub reference: Option<ObjectReference>,
}

impl ValidationResult {
    fn new(statement: &Statement, outcome: ValidationOutcome, message: impl Into<String>) -> Self {
        Self {
            statement: statement.clone(),
            outcome,
            message: message.into(),
            reference: None,
        }
    }

    fn with_reference(mut self, reference: ObjectReference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Which checks to run per statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reference extraction + catalog existence
    #[default]
    Catalog,
    /// Dry-run plan check
    Plan,
    /// Catalog first; the plan check decides when the catalog check passes
    Full,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "catalog" => Ok(ValidationMode::Catalog),
            "plan" => Ok(ValidationMode::Plan),
            "full" => Ok(ValidationMode::Full),
            _ => Err(format!(
                "Unknown validation mode: '{}'. Supported modes: catalog, plan, full.",
                s
            )),
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMode::Catalog => write!(f, "catalog"),
            ValidationMode::Plan => write!(f, "plan"),
            ValidationMode::Full => write!(f, "full"),
        }
    }
}

/// Check that a reference exists: database, then schema, then table.
///
/// Stops at the first missing level, so at most three catalog round-trips
/// are made. Catalog errors are returned as-is.
pub fn validate_reference<C: Catalog + ?Sized>(
    statement: &Statement,
    reference: ObjectReference,
    catalog: &mut C,
) -> Result<ValidationResult, ExecError> {
    let ObjectReference {
        database,
        schema,
        table,
        ..
    } = &reference;
    let raw = &reference.raw;

    tracing::debug!(database = %database, "checking database");
    if !catalog.database_exists(database)? {
        let message = format!("Database {} does not exist for the query: {}", database, raw);
        return Ok(
            ValidationResult::new(statement, ValidationOutcome::MissingDatabase, message)
                .with_reference(reference),
        );
    }

    tracing::debug!(database = %database, schema = %schema, "checking schema");
    if !catalog.schema_exists(database, schema)? {
        let message = format!(
            "Schema {} does not exist in database {} for the query: {}",
            schema, database, raw
        );
        return Ok(
            ValidationResult::new(statement, ValidationOutcome::MissingSchema, message)
                .with_reference(reference),
        );
    }

    tracing::debug!(database = %database, schema = %schema, table = %table, "checking table");
    if !catalog.table_exists(database, schema, table)? {
        let message = format!(
            "Table {} does not exist in schema {} of database {} for the query: {}",
            table, schema, database, raw
        );
        return Ok(
            ValidationResult::new(statement, ValidationOutcome::MissingTable, message)
                .with_reference(reference),
        );
    }

    let message = format!("{} exists", reference.qualified_name());
    Ok(ValidationResult::new(statement, ValidationOutcome::Valid, message).with_reference(reference))
}

/// Extract the statement's reference and check it against the catalog
pub fn check_catalog<C: Catalog + ?Sized>(
    statement: &Statement,
    catalog: &mut C,
) -> Result<ValidationResult, ExecError> {
    match statement.reference() {
        Some(reference) => validate_reference(statement, reference, catalog),
        None => Ok(ValidationResult::new(
            statement,
            ValidationOutcome::NoReference,
            "No fully-qualified object reference",
        )),
    }
}

/// Dry-run a statement. Statement failures become `PlanError` with the
/// diagnostic attached verbatim; connection failures are returned.
pub fn check_plan<E: Executor + ?Sized>(
    statement: &Statement,
    executor: &mut E,
) -> Result<ValidationResult, ExecError> {
    tracing::debug!(statement = %statement.location(), "plan check");
    match executor.plan_check(&statement.text) {
        Ok(_) => Ok(ValidationResult::new(
            statement,
            ValidationOutcome::Valid,
            "Plan check passed",
        )),
        Err(ExecError::Statement(diag)) => Ok(ValidationResult::new(
            statement,
            ValidationOutcome::PlanError,
            diag.to_string(),
        )),
        Err(err) => Err(err),
    }
}

/// Validation of one file. `error` is set when a connection failure
/// stopped the run; `results` then covers the statements before it.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub results: Vec<ValidationResult>,
    pub error: Option<RunError>,
}

impl ValidationRun {
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.results.iter().all(|r| !r.outcome.is_error())
    }
}

/// Validates statements against one warehouse connection
pub struct Validator<'a, W: ?Sized> {
    warehouse: &'a mut W,
    mode: ValidationMode,
}

impl<'a, W: Catalog + Executor + ?Sized> Validator<'a, W> {
    pub fn new(warehouse: &'a mut W, mode: ValidationMode) -> Self {
        Self { warehouse, mode }
    }

    /// Exactly one result per statement
    pub fn validate_statement(
        &mut self,
        statement: &Statement,
    ) -> Result<ValidationResult, ExecError> {
        match self.mode {
            ValidationMode::Catalog => check_catalog(statement, &mut *self.warehouse),
            ValidationMode::Plan => check_plan(statement, &mut *self.warehouse),
            ValidationMode::Full => {
                let catalog = check_catalog(statement, &mut *self.warehouse)?;
                if catalog.outcome.is_error() {
                    return Ok(catalog);
                }
                let plan = check_plan(statement, &mut *self.warehouse)?;
                if plan.outcome.is_error() {
                    Ok(ValidationResult {
                        reference: catalog.reference,
                        ..plan
                    })
                } else {
                    Ok(catalog)
                }
            }
        }
    }

    /// Validate every statement of a file.
    ///
    /// A failing statement does not stop the run; a connection failure does.
    pub fn validate_file(&mut self, file: &SourceFile) -> ValidationRun {
        let mut results = Vec::new();
        for statement in file.statements() {
            match self.validate_statement(&statement) {
                Ok(result) => {
                    if result.outcome.is_error() {
                        tracing::warn!(
                            file = %file.path().display(),
                            statement = statement.number(),
                            outcome = result.outcome.name(),
                            "{}",
                            result.message
                        );
                    }
                    results.push(result);
                }
                Err(err) => {
                    tracing::warn!(
                        file = %file.path().display(),
                        statement = statement.number(),
                        error = %err,
                        "validation aborted"
                    );
                    return ValidationRun {
                        results,
                        error: Some(RunError::Connection {
                            statement: statement.number(),
                            message: err.to_string(),
                        }),
                    };
                }
            }
        }
        tracing::info!(
            file = %file.path().display(),
            statements = results.len(),
            "validation finished"
        );
        ValidationRun {
            results,
            error: None,
        }
    }
}

/// Validate one file against one warehouse connection
pub fn validate_file<W: Catalog + Executor + ?Sized>(
    file: &SourceFile,
    mode: ValidationMode,
    warehouse: &mut W,
) -> ValidationRun {
    Validator::new(warehouse, mode).validate_file(file)
}

/// Joins a separate Catalog and Executor into one warehouse
pub struct Capabilities<C, E> {
    pub catalog: C,
    pub executor: E,
}

impl<C: Catalog, E> Catalog for Capabilities<C, E> {
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

impl<C, E: Executor> Executor for Capabilities<C, E> {
    fn plan_check(&mut self, statement: &str) -> Result<PlanInfo, ExecError> {
        self.executor.plan_check(statement)
    }

    fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
        self.executor.run(statement)
    }
}
