//! Output formatting

use std::io::{IsTerminal, Write};
use std::path::Path;

use sqlgate_core::report::{render_file_report, render_summary, FileReport};
use sqlgate_core::{ObjectReference, ReportFormat};

/// Writes reports to stdout in the configured format
pub struct OutputFormatter {
    format: ReportFormat,
    color: bool,
}

impl OutputFormatter {
    pub fn new(format: ReportFormat, no_color: bool) -> Self {
        let color = !no_color
            && format == ReportFormat::Human
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();
        Self { format, color }
    }

    /// Print one file's report as soon as it is finished
    pub fn print_file(&self, report: &FileReport) {
        print!("{}", render_file_report(report, self.format, self.color));
        let _ = std::io::stdout().flush();
    }

    pub fn print_summary(&self, reports: &[FileReport]) {
        print!("{}", render_summary(reports, self.format));
    }

    /// Print the references found per file; `None` marks an unreadable file
    pub fn print_references(&self, files: &[(&Path, Option<Vec<ObjectReference>>)]) {
        match self.format {
            ReportFormat::Json => self.print_references_json(files),
            _ => self.print_references_text(files),
        }
    }

    fn print_references_text(&self, files: &[(&Path, Option<Vec<ObjectReference>>)]) {
        for (path, refs) in files {
            println!("{}:", path.display());
            match refs {
                None => println!("  (could not read file)"),
                Some(refs) if refs.is_empty() => println!("  (no fully-qualified tables)"),
                Some(refs) => {
                    for r in refs {
                        println!(
                            "  {} ({}, statement {})",
                            r.qualified_name(),
                            r.clause,
                            r.statement + 1
                        );
                    }
                }
            }
        }
    }

    fn print_references_json(&self, files: &[(&Path, Option<Vec<ObjectReference>>)]) {
        let output: Vec<serde_json::Value> = files
            .iter()
            .map(|(path, refs)| {
                serde_json::json!({
                    "file": path.display().to_string(),
                    "readable": refs.is_some(),
                    "tables": refs.as_deref().unwrap_or_default(),
                })
            })
            .collect();
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("failed to serialize references: {}", e),
        }
    }
}
