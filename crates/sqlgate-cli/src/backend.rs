//! Warehouse backends: an offline DDL snapshot or a live session

use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, Result};
use sqlgate_core::catalog::{CatalogBuilder, NameContext, WarehouseCatalog};
use sqlgate_core::{
    Catalog, ExecError, Executor, OfflineExecutor, SnowflakeSession, SqlDialect, WarehouseConfig,
};

use crate::config::Config;

/// One connection serving as both catalog and executor
pub trait Warehouse: Catalog + Executor {
    fn close(&mut self) -> Result<(), ExecError> {
        Ok(())
    }
}

impl Warehouse for OfflineExecutor {}

impl Warehouse for SnowflakeSession {
    fn close(&mut self) -> Result<(), ExecError> {
        SnowflakeSession::close(self)
    }
}

/// Opens one connection per file
pub trait Connector {
    fn connect(&self) -> Result<Box<dyn Warehouse>, ExecError>;
}

pub enum Backend {
    Offline {
        catalog: WarehouseCatalog,
        context: NameContext,
        dialect: SqlDialect,
    },
    Live(WarehouseConfig),
}

impl Backend {
    /// Offline when a catalog directory is configured, live otherwise
    pub fn from_config(config: &Config) -> Result<Self> {
        let dialect = config.sql_dialect()?;
        match config.catalog_dir() {
            Some(dir) => {
                let context = config.name_context();
                let catalog = load_snapshot(&dir, dialect, context.clone())?;
                Ok(Backend::Offline {
                    catalog,
                    context,
                    dialect,
                })
            }
            None => Ok(Backend::Live(config.warehouse_config()?)),
        }
    }
}

impl Connector for Backend {
    fn connect(&self) -> Result<Box<dyn Warehouse>, ExecError> {
        match self {
            Backend::Offline {
                catalog,
                context,
                dialect,
            } => Ok(Box::new(
                OfflineExecutor::new(catalog.clone())
                    .with_context(context.clone())
                    .with_dialect(*dialect),
            )),
            Backend::Live(config) => Ok(Box::new(SnowflakeSession::open(config)?)),
        }
    }
}

/// Build a catalog from every `.sql` file under `dir`
fn load_snapshot(dir: &Path, dialect: SqlDialect, context: NameContext) -> Result<WarehouseCatalog> {
    let pattern = format!("{}/**/*.sql", dir.display());
    let mut files: Vec<_> = glob::glob(&pattern).into_diagnostic()?.flatten().collect();
    files.sort();

    if files.is_empty() {
        miette::bail!("No catalog snapshot files found in {}", dir.display());
    }

    let mut builder = CatalogBuilder::with_dialect(dialect).with_context(context);
    for file in &files {
        let content = fs::read_to_string(file).into_diagnostic()?;
        builder.parse(&content);
    }
    let (catalog, warnings) = builder.build();

    for warning in &warnings {
        tracing::warn!("catalog snapshot: {}", warning);
    }
    tracing::info!(
        files = files.len(),
        objects = catalog.object_paths().len(),
        "loaded catalog snapshot"
    );
    Ok(catalog)
}
