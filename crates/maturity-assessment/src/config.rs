use std::path::{Path, PathBuf};

use advisory_common::gateway::GatewayConfig;
use advisory_common::report::ReportProfile;

use crate::error::AppError;

const DEFAULT_TITLE: &str = "Maturity Assessment Report";
const DEFAULT_FILE_NAME: &str = "maturity_assessment_report.pdf";
const DEFAULT_SHEETS_RANGE: &str = "AssessmentData";

/// Application configuration loaded explicitly from environment variables.
///
/// One binary serves any assessment profile (ERP, R&D, ...): the profile is the
/// question bank plus report title, download name and target worksheet.
#[derive(Debug, Clone)]
pub struct Config {
    pub question_bank_path: PathBuf,
    pub profile: ReportProfile,
    pub banner_path: Option<PathBuf>,
    pub logo_path: Option<PathBuf>,
    pub gateway: GatewayConfig,
}

impl Config {
    /// Required:
    /// - `QUESTION_BANK_PATH`: path to the question bank JSON
    /// - `RECORD_CSV_PATH`, or `SHEETS_SPREADSHEET_ID` with `SHEETS_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `ASSESSMENT_TITLE`: cover page title (default "Maturity Assessment Report")
    /// - `REPORT_FILE_NAME`: download name (default "maturity_assessment_report.pdf")
    /// - `BANNER_IMAGE_PATH`, `LOGO_IMAGE_PATH`: report branding images
    /// - `SHEETS_RANGE` (default "AssessmentData"), `SHEETS_API_BASE`, `SHEETS_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, AppError> {
        let question_bank_path = std::env::var("QUESTION_BANK_PATH").map_err(|_| {
            AppError::Config("QUESTION_BANK_PATH environment variable is required".to_string())
        })?;
        let question_bank_path = existing_file(PathBuf::from(question_bank_path))?;

        let profile = ReportProfile {
            title: non_empty_var("ASSESSMENT_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            file_name: non_empty_var("REPORT_FILE_NAME")
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        };

        let banner_path = optional_file("BANNER_IMAGE_PATH")?;
        let logo_path = optional_file("LOGO_IMAGE_PATH")?;

        let gateway = GatewayConfig::from_env(DEFAULT_SHEETS_RANGE)
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            question_bank_path,
            profile,
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

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
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
