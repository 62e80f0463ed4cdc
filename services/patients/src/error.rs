use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clinic_domain::patient::FieldError;

/// Patients service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum PatientsServiceError {
    #[error("email address already exists")]
    DuplicateEmail,
    #[error("invalid registration fields")]
    InvalidFields(Vec<FieldError>),
    #[error("{0}")]
    InvalidDocumentPhoto(&'static str),
    #[error("malformed form data")]
    MalformedForm,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl PatientsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::InvalidFields(_) => "INVALID_FIELD",
            Self::InvalidDocumentPhoto(_) => "INVALID_DOCUMENT_PHOTO",
            Self::MalformedForm => "MALFORMED_FORM",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Text for logs. Internal errors keep their whole context chain, which
    /// the client-facing message hides.
    pub fn log_detail(&self) -> String {
        match self {
            Self::Internal(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for PatientsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::InvalidFields(_) | Self::InvalidDocumentPhoto(_) | Self::MalformedForm => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Internal(_) = self {
            tracing::error!(error = %self.log_detail(), kind = "INTERNAL", "internal error");
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match &self {
            Self::InvalidFields(errors) => body["errors"] = serde_json::json!(errors),
            Self::DuplicateEmail => body["field"] = "email".into(),
            Self::InvalidDocumentPhoto(_) => body["field"] = "documentPhoto".into(),
            _ => {}
        }
        (status, axum::Json(body)).into_response()
    }
}

/// Mail transport failure. The display text is what gets recorded on a failed
/// outbox entry.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address {0}")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("{0}")]
    Transport(String),
}
