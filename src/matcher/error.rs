/// Failures of the delegated classifier path. None of these reach the
/// caller of a fill operation; they only trigger the local fallback.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// No API key (or other required setting) is available.
    #[error("classifier not configured: {0}")]
    NotConfigured(String),

    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classifier returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("classifier reply carried no completion text")]
    EmptyCompletion,

    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}
