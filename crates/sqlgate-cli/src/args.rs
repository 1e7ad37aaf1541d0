//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sqlgate_core::{ReportFormat, ValidationMode};

#[derive(Parser)]
#[command(name = "sqlgate")]
#[command(author, version, about = "Validate and execute SQL change scripts against a warehouse")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to sqlgate.toml in this or a parent directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// SQL dialect
    #[arg(short, long, global = true)]
    pub dialect: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate SQL files without executing them
    Check {
        /// SQL files to check (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Which checks to run per statement
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Execute SQL files statement by statement, halting a file on its first failure
    Execute {
        /// SQL files to execute (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// List the fully-qualified tables each file references
    Tables {
        /// SQL files to scan (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the approval request for a file
    Approval {
        /// SQL file awaiting approval
        file: PathBuf,

        /// Endpoint that approves the file; the path is appended as `file_path`
        #[arg(long, value_name = "URL")]
        approve_url: String,

        /// Validate the file and include the report in the request
        #[arg(long)]
        validate: bool,

        /// Which checks to run with --validate
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        #[command(flatten)]
        backend: BackendArgs,
    },
}

/// Where catalog lookups and statements go
#[derive(clap::Args, Clone, Default)]
pub struct BackendArgs {
    /// Check against DDL snapshot files in this directory instead of a live warehouse
    #[arg(long = "catalog-dir", value_name = "DIR")]
    pub catalog_dir: Option<PathBuf>,

    /// Database for unqualified names in catalog snapshots
    #[arg(long, value_name = "NAME")]
    pub default_database: Option<String>,

    /// Schema for unqualified names in catalog snapshots
    #[arg(long, value_name = "NAME")]
    pub default_schema: Option<String>,

    #[command(flatten)]
    pub warehouse: WarehouseArgs,
}

/// Live warehouse connection settings
#[derive(clap::Args, Clone, Default)]
pub struct WarehouseArgs {
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub account: Option<String>,

    #[arg(long, env = "SNOWFLAKE_USER")]
    pub user: Option<String>,

    #[arg(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Option<String>,

    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub role: Option<String>,

    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "SNOWFLAKE_SCHEMA")]
    pub schema: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Default, Debug)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// GitHub Actions annotations
    Github,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => ReportFormat::Human,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Github => ReportFormat::Github,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Mode {
    /// Check referenced objects against the catalog
    Catalog,
    /// Dry-run each statement
    Plan,
    /// Catalog check, then dry run
    Full,
}

impl From<Mode> for ValidationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Catalog => ValidationMode::Catalog,
            Mode::Plan => ValidationMode::Plan,
            Mode::Full => ValidationMode::Full,
        }
    }
}
