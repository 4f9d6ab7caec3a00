use thiserror::Error;

/// Failures of a snapshot query.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("No token configured")]
    NotAuthenticated,
}
