use thiserror::Error;

use super::replicate_api::PredictionStatus;

/// Errors returned by the Replicate HTTP API
#[derive(Debug, Error)]
pub enum ReplicateApiError {
    #[error("Authentication failed (401): {message}")]
    Authentication { message: String },

    #[error("Payment required (402): {message}")]
    PaymentRequired { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Invalid input (422): {message}")]
    InvalidInput { message: String },

    #[error("Rate limit exceeded (429): {message}")]
    RateLimit { message: String },

    /// Catch-all for unexpected status codes
    #[error("Unexpected API error ({status}): {message}")]
    Unexpected { status: u16, message: String },

    #[error("Prediction {id} {status}: {message}")]
    PredictionFailed {
        id: String,
        status: PredictionStatus,
        message: String,
    },
}

impl ReplicateApiError {
    /// Error bodies look like `{"title": ..., "detail": ..., "status": ...}`,
    /// anything else is passed through verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        match status {
            401 => Self::Authentication { message },
            402 => Self::PaymentRequired { message },
            404 => Self::NotFound { message },
            422 => Self::InvalidInput { message },
            429 => Self::RateLimit { message },
            status => Self::Unexpected { status, message },
        }
    }
}
