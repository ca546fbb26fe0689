use color_eyre::Report;
use thiserror::Error;

/// Everything that can go wrong between receiving a prompt and handing back an
/// image reference.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Prompt is required")]
    MissingPrompt,

    #[error(
        "API token not configured. Please set REPLICATE_API_TOKEN in your environment or config file."
    )]
    MissingToken,

    /// Every strategy of the retry policy failed, `message` describes the first one
    #[error("Replicate API error: {message}")]
    Provider { message: String, details: String },

    #[error("Stream processing error: {message}")]
    StreamProcessing { message: String, details: String },

    #[error("Model did not return a valid image URL")]
    NoImageUrl,

    #[error("Invalid image URL format")]
    InvalidUrlFormat,
}

impl GenerateError {
    pub fn provider(primary: &Report) -> Self {
        Self::Provider {
            message: primary.to_string(),
            details: format!("{primary:?}"),
        }
    }

    pub fn stream_processing(err: &Report) -> Self {
        Self::StreamProcessing {
            message: err.to_string(),
            details: format!("{err:?}"),
        }
    }

    /// Errors caused by the caller rather than the provider or the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingPrompt)
    }

    /// Extended diagnostics, only meant to be shown in development mode
    pub fn details(&self) -> String {
        match self {
            Self::Provider { details, .. } | Self::StreamProcessing { details, .. } => {
                details.clone()
            }
            other => format!("{other:?}"),
        }
    }
}
