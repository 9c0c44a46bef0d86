/// Report finalization: compose, render to PDF, then append the submission record.
///
/// The PDF is only handed back once the record has been persisted.
use tracing::{error, info};

use crate::assessment::ReportRequest;
use crate::canvas::Assets;
use crate::compose;
use crate::contact::ContactInfo;
use crate::error::CommonError;
use crate::gateway::Gateway;
use crate::pdf;
use crate::question_bank::QuestionBank;
use crate::record;
use crate::strategy::StrategySummary;

pub const STRATEGY_FILE_NAME: &str = "strategy_report.pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub file_name: String,
    pub pdf: Vec<u8>,
}

/// Title and download name of an assessment report.
#[derive(Debug, Clone)]
pub struct ReportProfile {
    pub title: String,
    pub file_name: String,
}

pub async fn finalize_strategy_report(
    summary: &StrategySummary,
    contact: &ContactInfo,
    assets: &Assets,
    gateway: &Gateway,
) -> Result<RenderedReport, CommonError> {
    let document = compose::compose_strategy_report(summary, assets);
    let pdf = pdf::render_pdf(&document)?;

    let record = record::strategy_record(summary, contact, &record::timestamp_now());
    gateway.append(&record).await.inspect_err(|e| {
        error!(error = %e, "failed to persist strategy submission");
    })?;

    info!(goal = %summary.goal, bytes = pdf.len(), "strategy report ready");
    Ok(RenderedReport {
        file_name: STRATEGY_FILE_NAME.to_string(),
        pdf,
    })
}

pub async fn finalize_assessment_report(
    bank: &QuestionBank,
    profile: &ReportProfile,
    request: &ReportRequest,
    assets: &Assets,
    gateway: &Gateway,
) -> Result<RenderedReport, CommonError> {
    let document = compose::compose_assessment_report(
        bank,
        &profile.title,
        &request.contact,
        &request.responses,
        &request.completed_topics,
        assets,
    )?;
    let pdf = pdf::render_pdf(&document)?;

    let record = record::assessment_record(
        bank,
        &request.contact,
        &request.responses,
        &record::timestamp_now(),
    );
    gateway.append(&record).await.inspect_err(|e| {
        error!(error = %e, "failed to persist assessment submission");
    })?;

    info!(
        pages = document.pages.len(),
        bytes = pdf.len(),
        "assessment report ready"
    );
    Ok(RenderedReport {
        file_name: profile.file_name.clone(),
        pdf,
    })
}
