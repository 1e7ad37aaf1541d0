//! Catalog lookups through the warehouse's INFORMATION_SCHEMA views

use super::Catalog;
use crate::error::ExecError;
use crate::executor::Executor;

/// Catalog capability backed by count queries run on an Executor.
///
/// Borrows the executor, so lookups share the file's single connection.
pub struct InformationSchemaCatalog<'a, E: Executor + ?Sized> {
    executor: &'a mut E,
}

impl<'a, E: Executor + ?Sized> InformationSchemaCatalog<'a, E> {
    pub fn new(executor: &'a mut E) -> Self {
        Self { executor }
    }

    fn count_exists(&mut self, sql: &str) -> Result<bool, ExecError> {
        tracing::debug!(sql, "catalog lookup");
        let rows = self.executor.run(sql)?;
        if rows.is_empty() {
            return Err(ExecError::Connection(
                "unexpected catalog lookup response: no rows returned".to_string(),
            ));
        }
        let count = rows
            .scalar()
            .and_then(|cell| cell.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                ExecError::Connection(format!(
                    "unexpected catalog lookup response: {:?} is not a count",
                    rows.scalar()
                ))
            })?;
        Ok(count > 0)
    }
}

/// Escape a value for use inside a single-quoted SQL literal
fn literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Quote an identifier used as a query prefix
fn identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

impl<E: Executor + ?Sized> Catalog for InformationSchemaCatalog<'_, E> {
    fn database_exists(&mut self, name: &str) -> Result<bool, ExecError> {
        self.count_exists(&format!(
            "SELECT COUNT(*) FROM SNOWFLAKE.INFORMATION_SCHEMA.DATABASES WHERE DATABASE_NAME = '{}'",
            literal(name)
        ))
    }

    fn schema_exists(&mut self, database: &str, name: &str) -> Result<bool, ExecError> {
        self.count_exists(&format!(
            "SELECT COUNT(*) FROM {}.INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = '{}'",
            identifier(database),
            literal(name)
        ))
    }

    fn table_exists(
        &mut self,
        database: &str,
        schema: &str,
        name: &str,
    ) -> Result<bool, ExecError> {
        self.count_exists(&format!(
            "SELECT COUNT(*) FROM {}.INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}'",
            identifier(database),
            literal(schema),
            literal(name)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{PlanInfo, RowSet};

    /// Executor answering every query with a fixed cell and recording SQL
    struct Counting {
        count: &'static str,
        seen: Vec<String>,
    }

    /// Executor answering with no rows at all
    struct Empty;

    impl Executor for Empty {
        fn plan_check(&mut self, _statement: &str) -> Result<PlanInfo, ExecError> {
            unreachable!("catalog lookups never plan")
        }

        fn run(&mut self, _statement: &str) -> Result<RowSet, ExecError> {
            Ok(RowSet::default())
        }
    }

    impl Executor for Counting {
        fn plan_check(&mut self, _statement: &str) -> Result<PlanInfo, ExecError> {
            unreachable!("catalog lookups never plan")
        }

        fn run(&mut self, statement: &str) -> Result<RowSet, ExecError> {
            self.seen.push(statement.to_string());
            Ok(RowSet {
                columns: vec!["COUNT(*)".into()],
                rows: vec![vec![Some(self.count.to_string())]],
            })
        }
    }

    #[test]
    fn test_lookup_queries() {
        let mut exec = Counting {
            count: "1",
            seen: Vec::new(),
        };
        let mut catalog = InformationSchemaCatalog::new(&mut exec);
        assert_eq!(catalog.database_exists("DB"), Ok(true));
        assert_eq!(catalog.schema_exists("DB", "SCH"), Ok(true));
        assert_eq!(catalog.table_exists("DB", "SCH", "TBL"), Ok(true));

        assert_eq!(
            exec.seen,
            vec![
                "SELECT COUNT(*) FROM SNOWFLAKE.INFORMATION_SCHEMA.DATABASES WHERE DATABASE_NAME = 'DB'",
                "SELECT COUNT(*) FROM \"DB\".INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = 'SCH'",
                "SELECT COUNT(*) FROM \"DB\".INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = 'SCH' AND TABLE_NAME = 'TBL'",
            ]
        );
    }

    #[test]
    fn test_zero_count_is_missing() {
        let mut exec = Counting {
            count: "0",
            seen: Vec::new(),
        };
        let mut catalog = InformationSchemaCatalog::new(&mut exec);
        assert_eq!(catalog.database_exists("DB"), Ok(false));
    }

    #[test]
    fn test_malformed_count_is_not_a_miss() {
        let mut exec = Counting {
            count: "n/a",
            seen: Vec::new(),
        };
        let mut catalog = InformationSchemaCatalog::new(&mut exec);
        let err = catalog.schema_exists("DB", "SCH").unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("unexpected catalog lookup response"));
    }

    #[test]
    fn test_empty_response_is_not_a_miss() {
        let mut exec = Empty;
        let mut catalog = InformationSchemaCatalog::new(&mut exec);
        let err = catalog.table_exists("DB", "SCH", "TBL").unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(literal("O'BRIEN"), "O''BRIEN");
        assert_eq!(identifier("A\"B"), "\"A\"\"B\"");
    }
}
