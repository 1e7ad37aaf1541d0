//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use sqlgate_core::catalog::NameContext;
use sqlgate_core::{ReportFormat, SqlDialect, ValidationMode, WarehouseConfig};
use std::path::{Path, PathBuf};

use crate::args::{BackendArgs, Mode, OutputFormat};

const CONFIG_FILE: &str = "sqlgate.toml";

/// Configuration for sqlgate
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// SQL dialect ("snowflake" or "generic")
    #[serde(default)]
    pub dialect: Option<String>,

    /// Output format (human, json, github)
    #[serde(default)]
    pub format: Option<String>,

    /// Validation mode (catalog, plan, full)
    #[serde(default)]
    pub mode: Option<String>,

    /// Directory of DDL snapshot files for offline checks
    pub catalog_dir: Option<String>,

    pub default_database: Option<String>,

    pub default_schema: Option<String>,

    #[serde(default)]
    pub warehouse: WarehouseSection,
}

/// `[warehouse]` table. Passwords are never read from the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct WarehouseSection {
    pub account: Option<String>,
    pub user: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub host: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        let config: Config = toml::from_str(&contents).into_diagnostic()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to find and load sqlgate.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Load from `path` when given, otherwise search for sqlgate.toml
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::find_and_load()?.unwrap_or_default()),
        }
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(
        mut self,
        format: Option<OutputFormat>,
        dialect: &Option<String>,
        mode: Option<Mode>,
        backend: &BackendArgs,
    ) -> Self {
        if let Some(fmt) = format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if dialect.is_some() {
            self.dialect = dialect.clone();
        }

        if let Some(mode) = mode {
            self.mode = Some(ValidationMode::from(mode).to_string());
        }

        if let Some(dir) = &backend.catalog_dir {
            self.catalog_dir = Some(dir.display().to_string());
        }

        override_with(&mut self.default_database, &backend.default_database);
        override_with(&mut self.default_schema, &backend.default_schema);

        let wh = &backend.warehouse;
        override_with(&mut self.warehouse.account, &wh.account);
        override_with(&mut self.warehouse.user, &wh.user);
        override_with(&mut self.warehouse.password, &wh.password);
        override_with(&mut self.warehouse.warehouse, &wh.warehouse);
        override_with(&mut self.warehouse.role, &wh.role);
        override_with(&mut self.warehouse.database, &wh.database);
        override_with(&mut self.warehouse.schema, &wh.schema);

        self
    }

    pub fn report_format(&self) -> Result<ReportFormat> {
        match &self.format {
            Some(fmt) => fmt.parse().map_err(|e: String| miette::miette!(e)),
            None => Ok(ReportFormat::default()),
        }
    }

    pub fn sql_dialect(&self) -> Result<SqlDialect> {
        match &self.dialect {
            Some(dialect) => dialect.parse().map_err(|e: String| miette::miette!(e)),
            None => Ok(SqlDialect::default()),
        }
    }

    pub fn validation_mode(&self) -> Result<ValidationMode> {
        match &self.mode {
            Some(mode) => mode.parse().map_err(|e: String| miette::miette!(e)),
            None => Ok(ValidationMode::default()),
        }
    }

    pub fn catalog_dir(&self) -> Option<PathBuf> {
        self.catalog_dir.as_ref().map(PathBuf::from)
    }

    pub fn name_context(&self) -> NameContext {
        NameContext::new(self.default_database.clone(), self.default_schema.clone())
    }

    /// Connection settings for a live session
    pub fn warehouse_config(&self) -> Result<WarehouseConfig> {
        let wh = &self.warehouse;
        let (Some(account), Some(user)) = (&wh.account, &wh.user) else {
            miette::bail!(
                "No warehouse credentials. Use --account/--user (or SNOWFLAKE_ACCOUNT/SNOWFLAKE_USER), or --catalog-dir for offline checks"
            );
        };
        Ok(WarehouseConfig {
            account: account.clone(),
            user: user.clone(),
            password: wh.password.clone().unwrap_or_default(),
            warehouse: wh.warehouse.clone(),
            role: wh.role.clone(),
            database: wh.database.clone(),
            schema: wh.schema.clone(),
            host: wh.host.clone(),
            timeout_secs: wh.timeout_secs.unwrap_or(0),
        })
    }
}

fn override_with(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        *slot = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::WarehouseArgs;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
        dialect = "snowflake"
        format = "github"
        mode = "catalog"
        catalog_dir = "snapshots"

        [warehouse]
        account = "acme"
        user = "deployer"
        role = "SYSADMIN"
    "#;

    #[test]
    fn test_cli_overrides_file() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let backend = BackendArgs {
            warehouse: WarehouseArgs {
                role: Some("DEPLOYER".into()),
                password: Some("secret".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = config.merge_with_args(
            Some(OutputFormat::Json),
            &None,
            Some(Mode::Full),
            &backend,
        );

        assert_eq!(config.report_format().unwrap(), ReportFormat::Json);
        assert_eq!(config.validation_mode().unwrap(), ValidationMode::Full);
        assert_eq!(config.sql_dialect().unwrap(), SqlDialect::Snowflake);
        assert_eq!(config.catalog_dir(), Some(PathBuf::from("snapshots")));

        let wh = config.warehouse_config().unwrap();
        assert_eq!(wh.account, "acme");
        assert_eq!(wh.role.as_deref(), Some("DEPLOYER"));
        assert_eq!(wh.password, "secret");
    }

    #[test]
    fn test_password_in_file_is_rejected() {
        let result = toml::from_str::<Config>("[warehouse]\npassword = \"hunter2\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_credentials() {
        assert!(Config::default().warehouse_config().is_err());
    }
}
