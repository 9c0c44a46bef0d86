/// Error types shared across the advisory server crates.
///
/// These cover data loading (catalog, question bank), the selection flows, document
/// rendering and the record gateway. Server-specific errors are defined in each server
/// crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid question bank: {0}")]
    InvalidQuestionBank(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Please fill in all fields.")]
    IncompleteContact,

    #[error("{0}")]
    EmptyPrerequisite(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("gateway error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),
}

impl CommonError {
    /// Whether the error is a user-facing rejection (the request is refused but the
    /// session can continue) rather than an infrastructure failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CommonError::NotFound(_)
                | CommonError::Validation(_)
                | CommonError::IncompleteContact
                | CommonError::EmptyPrerequisite(_)
        )
    }
}
