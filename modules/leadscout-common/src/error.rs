use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadScoutError {
    /// Missing credentials or invalid settings. The only error a pipeline run returns.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Adapter error ({source_tag}): {message}")]
    Adapter { source_tag: String, message: String },

    #[error("Provider job failed: {0}")]
    ProviderJob(String),

    #[error("Daily search quota exhausted ({used}/{limit})")]
    QuotaExceeded { used: u64, limit: u64 },

    #[error("History store error: {0}")]
    History(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LeadScoutError>;
