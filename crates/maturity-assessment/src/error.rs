use advisory_common::error::CommonError;
use advisory_common::session::SessionNotFound;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Session(#[from] SessionNotFound),

    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    /// Short message returned to the client. Infrastructure detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Common(e) if e.is_user_facing() => e.to_string(),
            AppError::Common(CommonError::Gateway(_)) => "Failed to save assessment data.".to_string(),
            AppError::Common(_) => "Failed to generate the PDF report.".to_string(),
            AppError::Session(e) => e.to_string(),
            AppError::Config(_) => self.to_string(),
        }
    }
}
