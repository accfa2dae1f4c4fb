use thiserror::Error;

/// Failures talking to the external sources (bank, XContest, Telegram).
///
/// Fetch failures are transient: a failed discovery cycle is simply retried
/// on the next scheduled trigger. Lookup failures surface to the operator who
/// issued the command that needed the lookup.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("pilot {0:?} not found")]
    Lookup(String),
}
