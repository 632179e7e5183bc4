use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("gave up on {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("no references section in paper text")]
    NoReferences,
}

impl SourceError {
    /// A non-success status the platform will keep returning.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}
