use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::GatewayError;
use crate::record::{self, Record};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    /// A1 range or worksheet name the rows are appended to.
    pub range: String,
    pub access_token: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl SheetsConfig {
    /// Read `SHEETS_*` variables. Returns `None` when no spreadsheet is configured.
    pub fn from_env(default_range: &str) -> Result<Option<Self>, GatewayError> {
        let Ok(spreadsheet_id) = std::env::var("SHEETS_SPREADSHEET_ID") else {
            return Ok(None);
        };
        let access_token = std::env::var("SHEETS_ACCESS_TOKEN").map_err(|_| {
            GatewayError::Config("SHEETS_ACCESS_TOKEN environment variable is required".to_string())
        })?;

        let api_base =
            std::env::var("SHEETS_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let range = std::env::var("SHEETS_RANGE").unwrap_or_else(|_| default_range.to_string());

        let timeout = std::env::var("SHEETS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(15));

        let max_error_body_bytes = std::env::var("SHEETS_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Ok(Some(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id,
            range,
            access_token,
            timeout,
            max_error_body_bytes,
        }))
    }
}

/// Minimal Sheets v4 values client: read a range, append rows. No retries.
#[derive(Clone)]
pub struct SheetsClient {
    config: SheetsConfig,
    http: reqwest::Client,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent("advisory-tools/record-gateway")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Append the record, preceded by its header row when the sheet has no values yet.
    pub async fn append(&self, record: &Record) -> Result<(), GatewayError> {
        let mut rows = Vec::with_capacity(2);
        if self.is_empty().await? {
            debug!(range = %self.config.range, "sheet is empty, writing header row");
            rows.push(record::header(record).into_iter().map(Value::from).collect());
        }
        rows.push(row_values(record));

        let url = self.values_url(&format!("{}:append", self.config.range))?;
        let resp = self
            .http
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(&self.config.access_token)
            .timeout(self.config.timeout)
            .json(&ValueRange {
                values: Some(rows),
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool, GatewayError> {
        let url = self.values_url(&self.config.range)?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.config.access_token)
            .timeout(self.config.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        let range = resp.json::<ValueRange>().await?;
        Ok(range.is_blank())
    }

    fn values_url(&self, range_segment: &str) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| GatewayError::Config(format!("invalid SHEETS_API_BASE: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Config("SHEETS_API_BASE cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str(), "values"])
            .push(range_segment);
        Ok(url)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Vec<Value>>>,
}

impl ValueRange {
    fn is_blank(&self) -> bool {
        self.values
            .as_ref()
            .map_or(true, |rows| rows.iter().all(|row| row.iter().all(blank_cell)))
    }
}

fn blank_cell(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Record values as sent with `RAW`: numbers stay numeric, `null` becomes an empty cell.
fn row_values(record: &Record) -> Vec<Value> {
    record
        .values()
        .map(|value| match value {
            Value::Null => Value::from(""),
            other => other.clone(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorObject,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorObject {
    message: Option<String>,
    #[allow(dead_code)]
    status: Option<String>,
    #[allow(dead_code)]
    code: Option<Value>,
}

async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> GatewayError {
    let status = resp.status();
    let body = read_limited_text(resp, max_error_body_bytes).await;
    upstream_error(status, body)
}

fn upstream_error(status: StatusCode, body: String) -> GatewayError {
    if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown upstream error".to_string());
        return GatewayError::Upstream { status, message };
    }
    GatewayError::UpstreamBody { status, body }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read sheets error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str, range: &str) -> SheetsClient {
        SheetsClient::new(SheetsConfig {
            api_base: api_base.to_string(),
            spreadsheet_id: "abc123".to_string(),
            range: range.to_string(),
            access_token: "token".to_string(),
            timeout: Duration::from_secs(1),
            max_error_body_bytes: 1024,
        })
        .unwrap()
    }

    #[test]
    fn range_is_percent_encoded_into_path() {
        let c = client("https://sheets.googleapis.com/", "Assessment Data");
        let url = c.values_url("Assessment Data:append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Assessment%20Data:append"
        );
    }

    #[test]
    fn blank_value_ranges() {
        let missing: ValueRange = serde_json::from_str(r#"{"range": "Sheet1!A1:Z1000"}"#).unwrap();
        assert!(missing.is_blank());
        let blank: ValueRange = serde_json::from_str(r#"{"values": [[""]]}"#).unwrap();
        assert!(blank.is_blank());
        let filled: ValueRange = serde_json::from_str(r#"{"values": [["Timestamp"]]}"#).unwrap();
        assert!(!filled.is_blank());
    }

    #[test]
    fn levels_are_sent_as_numbers() {
        let mut record = Record::new();
        record.insert("Name".to_string(), Value::from("Ada"));
        record.insert("Q1".to_string(), Value::from(4));
        record.insert("Q2".to_string(), Value::Null);

        let body = serde_json::to_value(ValueRange {
            values: Some(vec![row_values(&record)]),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "values": [["Ada", 4, ""]] }));
    }

    #[test]
    fn google_error_envelope_is_unwrapped() {
        let err = upstream_error(
            StatusCode::FORBIDDEN,
            r#"{"error": {"code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED"}}"#
                .to_string(),
        );
        match err {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "The caller does not have permission");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            upstream_error(StatusCode::BAD_GATEWAY, "<html>".to_string()),
            GatewayError::UpstreamBody { .. }
        ));
    }
}
