use thiserror::Error;

/// Failure taxonomy shared by every search component.
///
/// Components propagate these unchanged; only the gateway turns them into an
/// external response.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The index reported it is overloaded (HTTP 503).
    #[error("Backend busy ({status}): {body}")]
    Busy { status: u16, body: String },

    #[error("Search failed after multiple attempts ({attempts} attempts)")]
    RetryExhausted { attempts: u32 },

    #[error("{service} error: {status} {body}")]
    Upstream { service: &'static str, status: u16, body: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn is_busy(&self) -> bool { matches!(self, Error::Busy { .. }) }

    pub fn is_validation(&self) -> bool { matches!(self, Error::Validation(_)) }
}

pub type Result<T> = std::result::Result<T, Error>;
