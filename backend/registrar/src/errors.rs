//! Application-wide error types.
//!
//! Nothing here is fatal: every variant maps to a response the front end
//! can show as a toast, and the draft stays in place for a retry.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reunion_wizard::{ValidationReport, WizardError};
use serde::Serialize;
use thiserror::Error;

/// Shown when the backend gave no message of its own.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Where the front end should send an admin whose session ended.
pub const ADMIN_LOGIN_VIEW: &str = "/admin/login";

#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    /// The backend answered with a non-success status.
    #[error("Upstream error {status}: {message}")]
    Api { status: u16, message: String },

    /// Bad OTP or similar; the user may simply try again.
    #[error("{0}")]
    Verification(String),

    #[error("Payment failed: {0}")]
    Payment(String),

    /// The chosen amount undershoots the suggested contribution and the
    /// registrant has not confirmed it.
    #[error("Chosen amount is {shortfall} below the suggested contribution of {quote}")]
    BelowQuote { quote: u64, shortfall: u64 },

    #[error("Admin session expired or missing")]
    Unauthorized,

    /// Another action on the same wizard is still in flight.
    #[error("Another request for this registration is still in progress")]
    Busy,

    /// The wizard was reset while the request was in flight.
    #[error("Request was superseded by a reset")]
    Cancelled,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RegistrarError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<u64>,
}

impl RegistrarError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Wizard(WizardError::MalformedDraft(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Wizard(WizardError::EmailLocked | WizardError::ReadOnlyField(_)) => {
                StatusCode::FORBIDDEN
            }
            Self::Wizard(_) | Self::Verification(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Payment(_) => StatusCode::PAYMENT_REQUIRED,
            Self::BelowQuote { .. } | Self::Busy | Self::Cancelled => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api { status: 404, .. } => StatusCode::NOT_FOUND,
            Self::Api { .. } | Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Migrate(_) | Self::Json(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text fit for a toast. Internal failures collapse to the fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Http(_)
            | Self::Database(_)
            | Self::Migrate(_)
            | Self::Json(_)
            | Self::Config(_) => FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RegistrarError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("request rejected: {self}");
        }

        let (field, validation) = match &self {
            Self::Wizard(WizardError::Invalid { field, report, .. }) => {
                (Some(*field), Some(report.clone()))
            }
            _ => (None, None),
        };

        let body = ErrorResponse {
            error: self.user_message(),
            field,
            validation,
            redirect: matches!(self, Self::Unauthorized).then_some(ADMIN_LOGIN_VIEW),
            quote: match self {
                Self::BelowQuote { quote, .. } => Some(quote),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}
