use std::path::{Path, PathBuf};

use advisory_common::gateway::GatewayConfig;

use crate::error::AppError;

/// Worksheet used when `SHEETS_RANGE` is not set.
const DEFAULT_SHEETS_RANGE: &str = "Sheet1";

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON catalog of goals, methods, tools and KPIs.
    pub catalog_path: PathBuf,
    pub banner_path: Option<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Required:
    /// - `CATALOG_PATH`: path to the strategy catalog JSON
    /// - `RECORD_CSV_PATH`, or `SHEETS_SPREADSHEET_ID` with `SHEETS_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `BANNER_IMAGE_PATH`, `LOGO_IMAGE_PATH`: report branding images
    /// - `SHEETS_RANGE`, `SHEETS_API_BASE`, `SHEETS_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, AppError> {
        let catalog_path = std::env::var("CATALOG_PATH").map_err(|_| {
            AppError::Config("CATALOG_PATH environment variable is required".to_string())
        })?;
        let catalog_path = existing_file(PathBuf::from(catalog_path))?;

        let banner_path = optional_file("BANNER_IMAGE_PATH")?;
        let logo_path = optional_file("LOGO_IMAGE_PATH")?;

        let gateway = GatewayConfig::from_env(DEFAULT_SHEETS_RANGE)
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            catalog_path,
            banner_path,
            logo_path,
            gateway,
        })
    }

    pub fn banner_path(&self) -> Option<&Path> {
        self.banner_path.as_deref()
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }
}

fn optional_file(var: &str) -> Result<Option<PathBuf>, AppError> {
    std::env::var(var)
        .ok()
        .map(|p| existing_file(PathBuf::from(p)))
        .transpose()
}

fn existing_file(path: PathBuf) -> Result<PathBuf, AppError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(AppError::Config(format!("required file not found: {}", path.display())))
    }
}
