use std::time::Duration;
use thiserror::Error;

/// Local token verification failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token has expired, please login again")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Failures of the export flow. A 404 on status polling is not listed here:
/// it is handled inside the poller by resubmitting the job.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export request rejected ({status}): {body}")]
    Submit { status: u16, body: String },

    #[error("export failed: {payload}")]
    JobFailed { payload: serde_json::Value },

    #[error("download failed ({status}): {body}")]
    Download { status: u16, body: String },

    #[error("export service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed export response: {0}")]
    Parse(String),

    #[error("failed to write exported document: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the authenticated search flow.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("rate limit exceeded, next request allowed in {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("invalid API key, check your news API credentials")]
    RemoteAuth,

    #[error("news API rate limit exceeded, try again later")]
    RemoteRateLimited,

    #[error("upgrade required: the free plan only covers recent articles")]
    UpgradeRequired,

    #[error("HTTP {status} - {reason}")]
    Http { status: u16, reason: String },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("request timed out, check your internet connection")]
    Timeout,

    #[error("unable to connect to the news API: {0}")]
    Connection(String),

    #[error("error parsing API response: {0}")]
    Parse(String),
}

impl SearchError {
    /// Transport-level failures become Timeout/Connection; everything else is a parse
    /// problem because status codes are classified before any body is read.
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() || e.is_request() {
            SearchError::Connection(e.to_string())
        } else {
            SearchError::Parse(e.to_string())
        }
    }
}

/// Invalid interactive search input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid {field} date: '{value}'. Use DD-MM-YYYY format (e.g., 25-12-2024).")]
    BadDate { field: &'static str, value: String },

    #[error("From date cannot be later than to date.")]
    InvertedRange,
}
