//! SQL text handling: source files, comment stripping, statement splitting
//! and object reference extraction

mod comments;
mod reference;
mod splitter;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use comments::strip_comments;
pub use reference::{extract_reference, ClauseKind, ObjectReference};
pub use splitter::split_statements;

/// A SQL script as read from disk
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        Ok(Self { path, text })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Strip comments and split into ordered statements
    pub fn statements(&self) -> Vec<Statement> {
        let cleaned = strip_comments(&self.text);
        split_statements(&cleaned)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Statement::new(index, text).with_source(&self.path))
            .collect()
    }
}

/// One statement of a file, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// 0-based position within the file
    pub index: usize,
    pub text: String,
    /// Path of the file the statement came from, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl Statement {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// `path:number`, or `#number` for statements without a file
    pub fn location(&self) -> String {
        match &self.source {
            Some(path) => format!("{}:{}", path.display(), self.number()),
            None => format!("#{}", self.number()),
        }
    }

    /// 1-based position, as shown to users
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn reference(&self) -> Option<ObjectReference> {
        extract_reference(&self.text, self.index)
    }
}

/// Unique references of a file in first-seen order
pub fn list_references(file: &SourceFile) -> Vec<ObjectReference> {
    let mut seen = std::collections::HashSet::new();
    file.statements()
        .iter()
        .filter_map(Statement::reference)
        .filter(|r| seen.insert(r.qualified_name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_from_source() {
        let file = SourceFile::new(
            "deploy.sql",
            "-- header\nINSERT INTO DB.SCH.TBL VALUES (1); /* note */\nSELECT 1;",
        );
        let stmts = file.statements();
        assert_eq!(stmts.len(), 2);
        assert_eq!(
            stmts[0],
            Statement::new(0, "INSERT INTO DB.SCH.TBL VALUES (1)").with_source("deploy.sql")
        );
        assert_eq!(stmts[0].location(), "deploy.sql:1");
        assert_eq!(stmts[1].text, "SELECT 1");
        assert_eq!(stmts[1].number(), 2);
    }

    #[test]
    fn test_list_references_dedups_in_order() {
        let file = SourceFile::new(
            "x.sql",
            "SELECT * FROM a.b.c; INSERT INTO d.e.f SELECT 1; select * from A.B.C",
        );
        let names: Vec<_> = list_references(&file)
            .iter()
            .map(ObjectReference::qualified_name)
            .collect();
        assert_eq!(names, vec!["A.B.C", "D.E.F"]);
    }
}
