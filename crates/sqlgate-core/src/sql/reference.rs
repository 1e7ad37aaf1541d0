//! Fully-qualified object reference extraction
//!
//! This is a pattern heuristic, not a parser. Exactly one reference is taken
//! per statement: the `INSERT INTO` target if present, otherwise the first
//! `FROM` source. Further tables (joins, subqueries) are not validated.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INSERT_INTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bINSERT\s+INTO\s+([\w$]+)\.([\w$]+)\.([\w$]+)(?:[^\w$.]|$)").unwrap()
});

static FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bFROM\s+([\w$]+)\.([\w$]+)\.([\w$]+)(?:[^\w$.]|$)").unwrap()
});

/// Clause a reference was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    InsertTarget,
    FromSource,
}

impl std::fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClauseKind::InsertTarget => write!(f, "INSERT INTO target"),
            ClauseKind::FromSource => write!(f, "FROM source"),
        }
    }
}

/// A `database.schema.table` reference
///
/// The three identifiers are upper-cased for catalog lookups and are never
/// empty; `raw` keeps the text as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub raw: String,
    pub clause: ClauseKind,
    /// Index of the owning statement within its file
    pub statement: usize,
}

impl ObjectReference {
    pub fn new(
        database: &str,
        schema: &str,
        table: &str,
        clause: ClauseKind,
        statement: usize,
    ) -> Self {
        Self {
            database: database.to_uppercase(),
            schema: schema.to_uppercase(),
            table: table.to_uppercase(),
            raw: format!("{}.{}.{}", database, schema, table),
            clause,
            statement,
        }
    }

    /// Canonical `DATABASE.SCHEMA.TABLE` form
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Extract the first qualified reference from a statement.
///
/// `statement` is the index recorded on the returned reference.
pub fn extract_reference(sql: &str, statement: usize) -> Option<ObjectReference> {
    [
        (&*INSERT_INTO_RE, ClauseKind::InsertTarget),
        (&*FROM_RE, ClauseKind::FromSource),
    ]
    .into_iter()
    .find_map(|(pattern, clause)| {
        let caps = pattern.captures(sql)?;
        Some(ObjectReference::new(
            &caps[1], &caps[2], &caps[3], clause, statement,
        ))
    })
}
