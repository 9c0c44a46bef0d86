/// Record persistence: append one submission row to a remote sheet or a local CSV file.
///
/// The target gets a header row first when it is empty. There are no retries; a failed
/// append is returned to the caller, which decides what the user sees.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use tracing::{debug, info};

use crate::record::{self, Record};
use crate::sheets::{SheetsClient, SheetsConfig};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("append task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Config(String),
}

#[derive(Clone, Debug)]
pub enum GatewayConfig {
    Sheets(SheetsConfig),
    Csv { path: PathBuf },
}

impl GatewayConfig {
    /// `RECORD_CSV_PATH` wins over `SHEETS_SPREADSHEET_ID`; one of them is required.
    pub fn from_env(default_range: &str) -> Result<Self, GatewayError> {
        if let Ok(path) = std::env::var("RECORD_CSV_PATH") {
            return Ok(Self::Csv {
                path: PathBuf::from(path),
            });
        }
        match SheetsConfig::from_env(default_range)? {
            Some(config) => Ok(Self::Sheets(config)),
            None => Err(GatewayError::Config(
                "RECORD_CSV_PATH or SHEETS_SPREADSHEET_ID environment variable is required"
                    .to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub enum Gateway {
    Sheets(SheetsClient),
    Csv(CsvSink),
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(match config {
            GatewayConfig::Sheets(config) => Self::Sheets(SheetsClient::new(config)?),
            GatewayConfig::Csv { path } => Self::Csv(CsvSink::new(path)),
        })
    }

    /// Short description of the target for startup logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Sheets(client) => format!(
                "sheets:{}/{}",
                client.config().spreadsheet_id,
                client.config().range
            ),
            Self::Csv(sink) => format!("csv:{}", sink.path().display()),
        }
    }

    pub async fn append(&self, record: &Record) -> Result<(), GatewayError> {
        match self {
            Self::Sheets(client) => client.append(record).await?,
            Self::Csv(sink) => sink.append(record).await?,
        }
        info!(sink = %self.describe(), columns = record.len(), "record appended");
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &Record) -> Result<(), GatewayError> {
        let path = self.path.clone();
        let header = record::header(record);
        let row = record::cells(record);
        tokio::task::spawn_blocking(move || append_rows(&path, &header, &row)).await?
    }
}

fn append_rows(path: &Path, header: &[String], row: &[String]) -> Result<(), GatewayError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if empty {
        debug!(path = %path.display(), "csv file is empty, writing header row");
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
