use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Run failed with status: {0}")]
    RunFailed(String),

    #[error("Run {run_id} still not finished after {polls} polls")]
    PollExhausted { run_id: String, polls: u32 },

    #[error("Run {0} abandoned: caller cancelled")]
    Cancelled(String),
}

impl ApifyError {
    /// Whether the actor itself reported a terminal non-success status, as opposed
    /// to a transport or decoding problem on our side.
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self,
            ApifyError::RunFailed(_) | ApifyError::PollExhausted { .. }
        )
    }
}

impl From<reqwest::Error> for ApifyError {
    fn from(err: reqwest::Error) -> Self {
        ApifyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ApifyError {
    fn from(err: serde_json::Error) -> Self {
        ApifyError::Parse(err.to_string())
    }
}
