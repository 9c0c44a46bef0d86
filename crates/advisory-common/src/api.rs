use base64::Engine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contact::ContactInfo;
use crate::pdf::PDF_MIME_TYPE;
use crate::report::RenderedReport;
use crate::session::SessionId;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SessionParams {
    /// Id returned by `start_session`.
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContactParams {
    pub session_id: SessionId,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct OkResponse {
    pub ok: bool,
}

/// A finished report, ready to save under `file_name`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReportDownload {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub pdf_base64: String,
}

impl From<&RenderedReport> for ReportDownload {
    fn from(report: &RenderedReport) -> Self {
        Self {
            file_name: report.file_name.clone(),
            mime_type: PDF_MIME_TYPE.to_string(),
            size_bytes: report.pdf.len(),
            pdf_base64: base64::engine::general_purpose::STANDARD.encode(&report.pdf),
        }
    }
}
