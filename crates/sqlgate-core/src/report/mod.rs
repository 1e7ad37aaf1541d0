//! Report rendering for validation and execution results
//!
//! Everything here is pure: renderers return strings and the caller decides
//! where they go.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::driver::{ExecutionOutcome, ExecutionResult, ExecutionRun, ExecutionState};
use crate::sql::{SourceFile, Statement};
use crate::validator::{ValidationOutcome, ValidationResult, ValidationRun};

/// Severity of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Output format for rendered reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
    /// GitHub Actions workflow-command annotations
    Github,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(ReportFormat::Human),
            "json" => Ok(ReportFormat::Json),
            "github" => Ok(ReportFormat::Github),
            _ => Err(format!(
                "Unknown report format: '{}'. Supported formats: human, json, github.",
                s
            )),
        }
    }
}

/// Anything that can be reported per statement
pub trait ReportEntry {
    fn statement(&self) -> &Statement;

    fn status(&self) -> &'static str;

    fn severity(&self) -> Severity;

    fn message(&self) -> String;

    /// Whether this entry fails the run
    fn is_failure(&self) -> bool;
}

impl ReportEntry for ValidationResult {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn status(&self) -> &'static str {
        self.outcome.name()
    }

    fn severity(&self) -> Severity {
        match self.outcome {
            outcome if outcome.is_catalog_miss() => Severity::Warning,
            ValidationOutcome::PlanError => Severity::Error,
            _ => Severity::Info,
        }
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn is_failure(&self) -> bool {
        self.outcome.is_error()
    }
}

impl ReportEntry for ExecutionResult {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn status(&self) -> &'static str {
        match self.outcome {
            ExecutionOutcome::Succeeded => "succeeded",
            ExecutionOutcome::Failed => "failed",
        }
    }

    fn severity(&self) -> Severity {
        match self.outcome {
            ExecutionOutcome::Succeeded => Severity::Info,
            ExecutionOutcome::Failed => Severity::Error,
        }
    }

    fn message(&self) -> String {
        match &self.error {
            Some(error) => error.to_string(),
            None => format!("{} row(s)", self.rows),
        }
    }

    fn is_failure(&self) -> bool {
        self.outcome == ExecutionOutcome::Failed
    }
}

/// One rendered statement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// 1-based statement number
    pub statement: usize,
    pub status: String,
    pub severity: Severity,
    pub failed: bool,
    pub message: String,
    pub sql: String,
}

impl ReportLine {
    fn from_entry<R: ReportEntry>(entry: &R) -> Self {
        Self {
            statement: entry.statement().number(),
            status: entry.status().to_string(),
            severity: entry.severity(),
            failed: entry.is_failure(),
            message: entry.message(),
            sql: entry.statement().text.clone(),
        }
    }
}

/// Report for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub lines: Vec<ReportLine>,
    /// File-level failure (unreadable file, connection failure, halted run)
    pub fatal: Option<String>,
}

impl FileReport {
    pub fn new<R: ReportEntry>(path: impl Into<PathBuf>, results: &[R]) -> Self {
        Self {
            path: path.into(),
            lines: results.iter().map(ReportLine::from_entry).collect(),
            fatal: None,
        }
    }

    /// A file that could not be processed at all
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
            fatal: Some(message.into()),
        }
    }

    pub fn from_validation(path: impl Into<PathBuf>, run: &ValidationRun) -> Self {
        Self {
            fatal: run.error.as_ref().map(|e| e.to_string()),
            ..Self::new(path, &run.results)
        }
    }

    /// `total` is the file's statement count, used to report skipped ones
    pub fn from_execution(path: impl Into<PathBuf>, run: &ExecutionRun, total: usize) -> Self {
        let fatal = match &run.state {
            ExecutionState::Halted { index, .. } => Some(format!(
                "halted at statement {}; {} statement(s) not attempted",
                index + 1,
                total.saturating_sub(index + 1)
            )),
            _ => None,
        };
        Self {
            fatal,
            ..Self::new(path, &run.results)
        }
    }

    pub fn passed(&self) -> bool {
        self.fatal.is_none() && self.lines.iter().all(|l| !l.failed)
    }

    pub fn failures(&self) -> usize {
        self.lines.iter().filter(|l| l.failed).count()
    }
}

/// Aggregate over all files of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub files: usize,
    pub statements: usize,
    pub failures: usize,
    pub failed_files: usize,
    /// True only if every statement of every file passed
    pub passed: bool,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let failed_files = reports.iter().filter(|r| !r.passed()).count();
        Self {
            files: reports.len(),
            statements: reports.iter().map(|r| r.lines.len()).sum(),
            failures: reports.iter().map(FileReport::failures).sum(),
            failed_files,
            passed: failed_files == 0,
        }
    }
}

/// Render one file's results as plain text
pub fn format<R: ReportEntry>(file: &SourceFile, results: &[R]) -> String {
    render_file(&FileReport::new(file.path(), results), false)
}

pub fn render(reports: &[FileReport], format: ReportFormat, color: bool) -> String {
    let mut out: String = reports
        .iter()
        .map(|report| render_file_report(report, format, color))
        .collect();
    out.push_str(&render_summary(reports, format));
    out
}

/// Render one finished file, for printing while later files still run.
///
/// JSON output is a single document, so it renders nothing here and
/// everything in [`render_summary`].
pub fn render_file_report(report: &FileReport, format: ReportFormat, color: bool) -> String {
    match format {
        ReportFormat::Human => format!("{}\n", render_file(report, color)),
        ReportFormat::Json => String::new(),
        ReportFormat::Github => render_annotations(report),
    }
}

/// Closing part of a report over all files
pub fn render_summary(reports: &[FileReport], format: ReportFormat) -> String {
    let summary = Summary::from_reports(reports);
    match format {
        ReportFormat::Json => render_json(reports),
        ReportFormat::Human if summary.passed => format!(
            "All {} file(s) passed ({} statement(s))\n",
            summary.files, summary.statements
        ),
        ReportFormat::Human => format!(
            "Found {} failing statement(s) in {} of {} file(s)\n",
            summary.failures, summary.failed_files, summary.files
        ),
        ReportFormat::Github if summary.passed => {
            "All database, schema, and table checks passed.\n".to_string()
        }
        ReportFormat::Github => format!(
            "{} failing statement(s) in {} file(s)\n",
            summary.failures, summary.failed_files
        ),
    }
}

fn paint(text: &str, severity: Severity, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    let code = match severity {
        Severity::Error => "31",
        Severity::Warning => "33",
        Severity::Info => "32",
    };
    format!("\x1b[{}m{}\x1b[0m", code, text)
}

/// First line of a statement, shortened for display
fn snippet(sql: &str) -> String {
    let first = sql.lines().next().unwrap_or_default();
    let mut out: String = first.chars().take(72).collect();
    if out.len() < first.len() || sql.lines().nth(1).is_some() {
        out.push_str(" ...");
    }
    out
}

fn render_file(report: &FileReport, color: bool) -> String {
    let mut out = format!("{}\n", report.path.display());
    for line in &report.lines {
        out.push_str(&format!(
            "  {:>3}  {:<16}  {}\n",
            line.statement,
            paint(&line.status, line.severity, color),
            snippet(&line.sql)
        ));
        if line.severity != Severity::Info || !line.message.is_empty() {
            for msg_line in line.message.lines() {
                out.push_str(&format!("       = {}\n", msg_line));
            }
        }
    }
    if let Some(fatal) = &report.fatal {
        out.push_str(&format!(
            "  {}: {}\n",
            paint("error", Severity::Error, color),
            fatal
        ));
    }
    let verdict = if report.passed() {
        paint("passed", Severity::Info, color)
    } else {
        paint("failed", Severity::Error, color)
    };
    out.push_str(&format!(
        "  {} ({} statement(s), {} failure(s))\n",
        verdict,
        report.lines.len(),
        report.failures()
    ));
    out
}

fn render_json(reports: &[FileReport]) -> String {
    let output = serde_json::json!({
        "files": reports,
        "summary": Summary::from_reports(reports),
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Escape workflow-command message data
fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape workflow-command property values
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

fn render_annotations(report: &FileReport) -> String {
    let mut out = String::new();
    let file = escape_property(&report.path.display().to_string());
    for line in report.lines.iter().filter(|l| l.failed) {
        let level = match line.severity {
            Severity::Error => "error",
            _ => "warning",
        };
        out.push_str(&format!(
            "::{} file={},title=statement {} ({})::{}\n",
            level,
            file,
            line.statement,
            line.status,
            escape_data(&line.message)
        ));
    }
    if let Some(fatal) = &report.fatal {
        out.push_str(&format!("::error file={}::{}\n", file, escape_data(fatal)));
    }
    out
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// HTML body of an approval request for one file.
///
/// `approve_url` gets the file path appended as the `file_path` query
/// parameter.
pub fn render_approval_request(
    path: &Path,
    sql: &str,
    report: &str,
    approve_url: &str,
) -> Result<String, url::ParseError> {
    let path_str = path.display().to_string();
    let link = url::Url::parse_with_params(approve_url, &[("file_path", &path_str)])?;

    let mut body = String::new();
    body.push_str(
        "<p>A new SQL file has been uploaded and is pending approval for execution.</p>\n",
    );
    body.push_str(&format!(
        "<p><strong>File:</strong> {}</p>\n",
        escape_html(&path_str)
    ));
    body.push_str(&format!("<pre>{}</pre>\n", escape_html(sql)));
    if !report.is_empty() {
        body.push_str(&format!(
            "<p><strong>Validation:</strong></p>\n<pre>{}</pre>\n",
            escape_html(report)
        ));
    }
    body.push_str(&format!(
        "<p><a href=\"{}\">Approve</a></p>\n",
        escape_html(link.as_str())
    ));
    Ok(body)
}
