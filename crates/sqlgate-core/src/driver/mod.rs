//! Execution driver: runs a file's statements in order, halting on the
//! first failure

use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::executor::Executor;
use crate::sql::{SourceFile, Statement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed,
}

/// Result of executing one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub statement: Statement,
    pub outcome: ExecutionOutcome,
    /// Rows returned on success
    pub rows: usize,
    pub error: Option<ExecError>,
}

/// Driver state for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    /// About to run the statement at this index
    Running(usize),
    Completed,
    /// Statement at `index` failed; nothing after it runs
    Halted { index: usize, error: ExecError },
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Halted { .. }
        )
    }
}

/// Runs one file's statements against one executor
pub struct ExecutionDriver<'s, E> {
    statements: &'s [Statement],
    executor: E,
    state: ExecutionState,
    results: Vec<ExecutionResult>,
}

impl<'s, E: Executor> ExecutionDriver<'s, E> {
    pub fn new(statements: &'s [Statement], executor: E) -> Self {
        Self {
            statements,
            executor,
            state: ExecutionState::Pending,
            results: Vec::with_capacity(statements.len()),
        }
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Advance by one transition
    pub fn step(&mut self) -> &ExecutionState {
        self.state = match std::mem::replace(&mut self.state, ExecutionState::Pending) {
            ExecutionState::Pending if self.statements.is_empty() => ExecutionState::Completed,
            ExecutionState::Pending => ExecutionState::Running(0),
            ExecutionState::Running(index) => self.run_statement(index),
            terminal => terminal,
        };
        &self.state
    }

    fn run_statement(&mut self, index: usize) -> ExecutionState {
        let statements = self.statements;
        let statement = &statements[index];
        tracing::info!(statement = %statement.location(), "executing: {}", statement.text);

        match self.executor.run(&statement.text) {
            Ok(rows) => {
                tracing::info!(
                    statement = %statement.location(),
                    rows = rows.rows.len(),
                    "statement executed successfully"
                );
                self.results.push(ExecutionResult {
                    statement: statement.clone(),
                    outcome: ExecutionOutcome::Succeeded,
                    rows: rows.rows.len(),
                    error: None,
                });
                if index + 1 < self.statements.len() {
                    ExecutionState::Running(index + 1)
                } else {
                    ExecutionState::Completed
                }
            }
            Err(error) => {
                tracing::warn!(
                    statement = %statement.location(),
                    error = %error,
                    "statement failed; halting"
                );
                self.results.push(ExecutionResult {
                    statement: statement.clone(),
                    outcome: ExecutionOutcome::Failed,
                    rows: 0,
                    error: Some(error.clone()),
                });
                ExecutionState::Halted { index, error }
            }
        }
    }

    /// Step until a terminal state
    pub fn run_to_end(mut self) -> ExecutionRun {
        while !self.state.is_terminal() {
            self.step();
        }
        ExecutionRun {
            results: self.results,
            state: self.state,
        }
    }
}

/// Finished execution of one file
#[derive(Debug, Clone)]
pub struct ExecutionRun {
    pub results: Vec<ExecutionResult>,
    /// `Completed` or `Halted`
    pub state: ExecutionState,
}

impl ExecutionRun {
    pub fn succeeded(&self) -> bool {
        self.state == ExecutionState::Completed
    }
}

/// Execute statements in order, stopping at the first failure
pub fn execute<E: Executor + ?Sized>(statements: &[Statement], executor: &mut E) -> ExecutionRun {
    ExecutionDriver::new(statements, executor).run_to_end()
}

/// Execute one file as an independent run
pub fn execute_file<E: Executor + ?Sized>(file: &SourceFile, executor: &mut E) -> ExecutionRun {
    let statements = file.statements();
    tracing::info!(
        file = %file.path().display(),
        statements = statements.len(),
        "executing file"
    );
    let run = execute(&statements, executor);
    if run.succeeded() {
        tracing::info!(file = %file.path().display(), "all statements executed successfully");
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{PlanInfo, RowSet};

    /// Fails any statement containing "FAIL"
    #[derive(Default)]
    struct Scripted {
        ran: Vec<String>,
    }

    impl Executor for Scripted {
        fn plan_check(&mut self, _statement: &str) -> Result<PlanInfo, ExecError> {
            Ok(PlanInfo::default())
        }

        fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
            self.ran.push(statement.to_string());
            if statement.contains("FAIL") {
                Err(ExecError::statement("boom"))
            } else {
                Ok(RowSet::default())
            }
        }
    }

    fn statements(texts: &[&str]) -> Vec<Statement> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Statement::new(i, *t))
            .collect()
    }

    #[test]
    fn test_state_transitions() {
        let stmts = statements(&["S1", "S2"]);
        let mut exec = Scripted::default();
        let mut driver = ExecutionDriver::new(&stmts, &mut exec);

        assert_eq!(driver.state(), &ExecutionState::Pending);
        assert_eq!(driver.step(), &ExecutionState::Running(0));
        assert_eq!(driver.step(), &ExecutionState::Running(1));
        assert_eq!(driver.step(), &ExecutionState::Completed);
        assert_eq!(driver.step(), &ExecutionState::Completed);
    }

    #[test]
    fn test_halts_on_first_failure() {
        let stmts = statements(&["S1", "S2 FAIL", "S3"]);
        let mut exec = Scripted::default();
        let run = execute(&stmts, &mut exec);

        let outcomes: Vec<_> = run.results.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![ExecutionOutcome::Succeeded, ExecutionOutcome::Failed]
        );
        assert_eq!(
            run.state,
            ExecutionState::Halted {
                index: 1,
                error: ExecError::statement("boom")
            }
        );
        assert_eq!(exec.ran, vec!["S1", "S2 FAIL"]);
    }

    #[test]
    fn test_empty_file_completes() {
        let mut exec = Scripted::default();
        let run = execute(&[], &mut exec);
        assert!(run.succeeded());
        assert!(run.results.is_empty());
    }
}
