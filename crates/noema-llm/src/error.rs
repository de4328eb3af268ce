//! Errors from LLM driver operations

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The upstream provider could not be reached or returned a non-success status
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The provider's response did not match the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No tier in the closed set satisfies the requested budget
    #[error("budget exceeded: no tier fits budget {budget:.4} for quality {quality:?}")]
    BudgetExceeded { budget: f64, quality: Option<String> },

    /// Environment/config issue (e.g. missing API key)
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
