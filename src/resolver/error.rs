use thiserror::Error;

/// Resolution error taxonomy. `Fetch`, `Parse` and `NoCandidates` are
/// non-fatal: the orchestrator logs them and advances to the next strategy.
/// The remaining variants surface to the caller.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("malformed or missing structured data: {0}")]
    Parse(String),

    #[error("strategy yielded no candidates")]
    NoCandidates,

    #[error("no media found after exhausting all strategies")]
    NoMediaFound,

    #[error("provider misconfigured: {0}")]
    ProviderMisconfigured(&'static str),

    #[error("download failed: {0}")]
    DownloadFailed(String),
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        ResolveError::Fetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
