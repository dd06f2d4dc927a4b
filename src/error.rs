use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("{context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: request timed out")]
    Timeout { context: String },

    #[error("{context}: backend returned status {status}")]
    Status { context: String, status: u16 },

    #[error("{context}: {message}")]
    Decode { context: String, message: String },

    /// Raised by in-memory sources and anything else that is not an HTTP failure.
    #[error("{0}")]
    Source(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DashboardError {
    pub fn from_reqwest(context: impl Into<String>, err: reqwest::Error) -> Self {
        let context = context.into();
        if err.is_timeout() {
            DashboardError::Timeout { context }
        } else if err.is_decode() {
            DashboardError::Decode { context, message: err.to_string() }
        } else {
            DashboardError::Fetch { context, source: err }
        }
    }

    /// Every variant except a bad config is a failed fetch from the caller's point of view.
    pub fn is_fetch_failure(&self) -> bool {
        !matches!(self, DashboardError::InvalidConfig(_))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
