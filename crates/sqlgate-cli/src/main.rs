//! sqlgate CLI - SQL change-script validation and execution

mod args;
mod backend;
mod config;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sqlgate_core::report::{self, FileReport, Summary};
use sqlgate_core::sql::list_references;
use sqlgate_core::{execute_file, validate_file, SourceFile, ValidationMode};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};
use crate::backend::{Backend, Connector, Warehouse};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::ERROR
    } else {
        match args.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    match run(args) {
        Ok(has_failures) => {
            if has_failures {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Check {
            files,
            mode,
            backend,
        } => {
            let config = config.merge_with_args(args.format, &args.dialect, mode, &backend);
            let mode = config.validation_mode()?;
            let output = OutputFormatter::new(config.report_format()?, args.no_color);
            let backend = Backend::from_config(&config)?;

            let reports = run_files(&expand_files(&files)?, &output, |path| {
                check_file(path, mode, &backend)
            });
            Ok(!Summary::from_reports(&reports).passed)
        }

        Command::Execute { files, backend } => {
            let config = config.merge_with_args(args.format, &args.dialect, None, &backend);
            let output = OutputFormatter::new(config.report_format()?, args.no_color);
            let backend = Backend::from_config(&config)?;

            let reports = run_files(&expand_files(&files)?, &output, |path| {
                execute_path(path, &backend)
            });
            Ok(!Summary::from_reports(&reports).passed)
        }

        Command::Tables { files } => {
            let config = config.merge_with_args(args.format, &args.dialect, None, &Default::default());
            let output = OutputFormatter::new(config.report_format()?, args.no_color);

            let paths = expand_files(&files)?;
            let mut listed = Vec::new();
            for path in &paths {
                let refs = match SourceFile::read(path) {
                    Ok(file) => Some(list_references(&file)),
                    Err(e) => {
                        tracing::warn!(file = %path.display(), "could not read file: {}", e);
                        None
                    }
                };
                listed.push((path.as_path(), refs));
            }

            output.print_references(&listed);
            Ok(listed.iter().any(|(_, refs)| refs.is_none()))
        }

        Command::Approval {
            file,
            approve_url,
            validate,
            mode,
            backend,
        } => {
            let config = config.merge_with_args(args.format, &args.dialect, mode, &backend);
            let source = SourceFile::read(&file).into_diagnostic()?;

            let (summary, passed) = if validate {
                let backend = Backend::from_config(&config)?;
                let report = check_file(&file, config.validation_mode()?, &backend);
                let passed = report.passed();
                (report::render(&[report], Default::default(), false), passed)
            } else {
                (String::new(), true)
            };

            let body =
                report::render_approval_request(source.path(), source.text(), &summary, &approve_url)
                    .into_diagnostic()?;
            print!("{}", body);
            Ok(!passed)
        }
    }
}

/// Expand glob patterns; plain paths are kept as given so missing files are reported
fn expand_files(patterns: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.display().to_string();
        if pattern_str.contains('*') {
            for path in glob::glob(&pattern_str).into_diagnostic()?.flatten() {
                files.push(path);
            }
        } else {
            files.push(pattern.clone());
        }
    }

    if files.is_empty() {
        miette::bail!("No SQL files matched the given arguments");
    }
    Ok(files)
}

/// Process files in order, printing each report as soon as it is ready
fn run_files<F>(paths: &[PathBuf], output: &OutputFormatter, mut process: F) -> Vec<FileReport>
where
    F: FnMut(&Path) -> FileReport,
{
    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let report = process(path);
        output.print_file(&report);
        reports.push(report);
    }
    output.print_summary(&reports);
    reports
}

fn read_or_report(path: &Path) -> std::result::Result<SourceFile, FileReport> {
    SourceFile::read(path).map_err(|e| {
        tracing::warn!(file = %path.display(), "could not read file: {}", e);
        FileReport::failed(path, format!("could not read file: {}", e))
    })
}

/// A session that cannot be opened fails only the file it was opened for
fn connect_or_report(
    path: &Path,
    connector: &dyn Connector,
) -> std::result::Result<Box<dyn Warehouse>, FileReport> {
    connector.connect().map_err(|e| {
        tracing::error!(file = %path.display(), error = %e, "could not open warehouse session");
        FileReport::failed(path, format!("could not open warehouse session: {}", e))
    })
}

fn close(mut warehouse: Box<dyn Warehouse>) {
    if let Err(e) = warehouse.close() {
        tracing::warn!(error = %e, "failed to close warehouse connection");
    }
}

fn check_file(path: &Path, mode: ValidationMode, connector: &dyn Connector) -> FileReport {
    let file = match read_or_report(path) {
        Ok(file) => file,
        Err(report) => return report,
    };
    let mut warehouse = match connect_or_report(path, connector) {
        Ok(warehouse) => warehouse,
        Err(report) => return report,
    };

    let run = validate_file(&file, mode, warehouse.as_mut());
    close(warehouse);

    FileReport::from_validation(file.path(), &run)
}

fn execute_path(path: &Path, connector: &dyn Connector) -> FileReport {
    let file = match read_or_report(path) {
        Ok(file) => file,
        Err(report) => return report,
    };
    let mut warehouse = match connect_or_report(path, connector) {
        Ok(warehouse) => warehouse,
        Err(report) => return report,
    };

    let total = file.statements().len();
    let run = execute_file(&file, warehouse.as_mut());
    close(warehouse);

    FileReport::from_execution(file.path(), &run, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlgate_core::catalog::{CatalogBuilder, NameContext};
    use sqlgate_core::{ExecError, ReportFormat, SqlDialect};
    use std::cell::Cell;

    fn offline_backend() -> Backend {
        let mut builder = CatalogBuilder::new();
        builder.parse(
            "CREATE DATABASE ANALYTICS;\n\
             CREATE SCHEMA ANALYTICS.RAW;\n\
             CREATE TABLE ANALYTICS.RAW.EVENTS (id INT, payload VARCHAR);",
        );
        let (catalog, warnings) = builder.build();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        Backend::Offline {
            catalog,
            context: NameContext::default(),
            dialect: SqlDialect::default(),
        }
    }

    /// Fresh directory holding the given scripts
    fn workspace(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sqlgate-cli-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, sql) in files {
            std::fs::write(dir.join(file), sql).unwrap();
        }
        dir
    }

    fn quiet() -> OutputFormatter {
        OutputFormatter::new(ReportFormat::Json, true)
    }

    /// Opens sessions until `remaining` runs out, then refuses
    struct Flaky {
        inner: Backend,
        remaining: Cell<usize>,
    }

    impl Connector for Flaky {
        fn connect(&self) -> std::result::Result<Box<dyn Warehouse>, ExecError> {
            match self.remaining.get() {
                0 => Err(ExecError::Connection("HTTP 503 Service Unavailable".into())),
                n => {
                    self.remaining.set(n - 1);
                    self.inner.connect()
                }
            }
        }
    }

    #[test]
    fn test_unreadable_file_does_not_stop_check() {
        let dir = workspace(
            "check",
            &[
                ("ok.sql", "SELECT id FROM ANALYTICS.RAW.EVENTS;"),
                ("ok2.sql", "INSERT INTO ANALYTICS.RAW.EVENTS VALUES (1, 'x');"),
            ],
        );
        let paths = vec![dir.join("ok.sql"), dir.join("missing.sql"), dir.join("ok2.sql")];
        let backend = offline_backend();

        let reports = run_files(&paths, &quiet(), |path| {
            check_file(path, ValidationMode::Catalog, &backend)
        });

        assert_eq!(reports.len(), 3);
        assert!(reports[0].passed());
        assert!(!reports[1].passed());
        assert!(reports[1]
            .fatal
            .as_deref()
            .unwrap()
            .starts_with("could not read file"));
        assert!(reports[2].passed());
        assert_eq!(reports[2].lines.len(), 1);

        let summary = Summary::from_reports(&reports);
        assert_eq!((summary.files, summary.failed_files), (3, 1));
        assert!(!summary.passed);
    }

    #[test]
    fn test_halted_file_does_not_stop_execute() {
        let dir = workspace(
            "execute",
            &[
                (
                    "halts.sql",
                    "SELECT * FROM ANALYTICS.RAW.MISSING;\nSELECT id FROM ANALYTICS.RAW.EVENTS;",
                ),
                (
                    "ok.sql",
                    "CREATE TABLE ANALYTICS.RAW.DAILY (id INT);\n\
                     INSERT INTO ANALYTICS.RAW.DAILY SELECT id FROM ANALYTICS.RAW.EVENTS;",
                ),
            ],
        );
        let paths = vec![dir.join("halts.sql"), dir.join("ok.sql")];
        let backend = offline_backend();

        let reports = run_files(&paths, &quiet(), |path| execute_path(path, &backend));

        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0].fatal.as_deref(),
            Some("halted at statement 1; 1 statement(s) not attempted")
        );
        assert!(reports[1].passed(), "{:?}", reports[1]);
        assert_eq!(reports[1].lines.len(), 2);
    }

    #[test]
    fn test_session_failure_fails_only_that_file() {
        let dir = workspace(
            "connect",
            &[
                ("first.sql", "SELECT id FROM ANALYTICS.RAW.EVENTS;"),
                ("second.sql", "SELECT id FROM ANALYTICS.RAW.EVENTS;"),
            ],
        );
        let paths = vec![dir.join("first.sql"), dir.join("second.sql")];
        let connector = Flaky {
            inner: offline_backend(),
            remaining: Cell::new(1),
        };

        let reports = run_files(&paths, &quiet(), |path| execute_path(path, &connector));

        assert_eq!(reports.len(), 2);
        assert!(reports[0].passed());
        assert!(reports[1].lines.is_empty());
        assert_eq!(
            reports[1].fatal.as_deref(),
            Some("could not open warehouse session: connection failure: HTTP 503 Service Unavailable")
        );
        assert!(!Summary::from_reports(&reports).passed);

        let report = check_file(&dir.join("first.sql"), ValidationMode::Plan, &connector);
        assert!(report
            .fatal
            .as_deref()
            .unwrap()
            .starts_with("could not open warehouse session"));
    }
}
