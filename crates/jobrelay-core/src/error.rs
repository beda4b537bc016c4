use thiserror::Error;

/// Gateway error taxonomy. Display strings are what callers may see; store
/// and upstream variants keep their detail out of the message so SQL text or
/// transport internals never reach a response body.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("store operation failed")]
    Store(String),

    #[error("no backend available")]
    UpstreamUnavailable,

    #[error("backend request failed")]
    Upstream(String),

    #[error("backend response malformed")]
    Decode(String),

    #[error("authentication failed")]
    Auth(String),

    #[error("provider already registered: {0}")]
    ProviderExists(String),

    #[error("no such provider: {0}")]
    ProviderNotFound(String),
}

impl Error {
    /// Internal detail for log output, if the variant carries any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Store(d) | Error::Upstream(d) | Error::Decode(d) | Error::Auth(d) => Some(d),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
