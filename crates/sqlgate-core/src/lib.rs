//! sqlgate-core: SQL change-script validation and execution
//!
//! This library splits SQL scripts into statements, extracts the
//! `database.schema.table` objects they reference, checks those objects
//! against a warehouse catalog (or dry-runs the statements), and executes
//! approved scripts statement by statement.

pub mod catalog;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod executor;
pub mod report;
pub mod sql;
pub mod validator;

pub use catalog::{Catalog, CatalogBuilder, InformationSchemaCatalog, WarehouseCatalog};
pub use dialect::SqlDialect;
pub use driver::{execute, execute_file, ExecutionOutcome, ExecutionResult, ExecutionRun};
pub use error::{Diagnostic, ExecError, RunError};
pub use executor::{Executor, OfflineExecutor, SnowflakeSession, WarehouseConfig};
pub use report::{FileReport, ReportFormat, Summary};
pub use sql::{ObjectReference, SourceFile, Statement};
pub use validator::{validate_file, ValidationMode, ValidationOutcome, ValidationResult};
