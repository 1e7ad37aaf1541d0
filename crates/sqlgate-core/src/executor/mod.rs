//! Executor capability: plan checks and statement execution

mod offline;
mod snowflake;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

pub use offline::OfflineExecutor;
pub use snowflake::{SnowflakeSession, WarehouseConfig};

/// A stateful connection that can plan and run statements
pub trait Executor {
    /// Dry-run a statement: request its plan without executing it
    fn plan_check(&mut self, statement: &str) -> Result<PlanInfo, ExecError>;

    /// Execute a statement
    fn run(&mut self, statement: &str) -> Result<RowSet, ExecError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn plan_check(&mut self, statement: &str) -> Result<PlanInfo, ExecError> {
        (**self).plan_check(statement)
    }

    fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
        (**self).run(statement)
    }
}

/// Plan text returned by a dry run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    pub text: String,
}

/// Rows returned by a statement; cells are kept as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}
