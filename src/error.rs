use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }
}

/// Failure reported by the raw-fetch collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    #[error("symbol {0} is unknown upstream")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {status} for {symbol}")]
    Status { status: u16, symbol: String },
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Outcome taxonomy exposed to the routing layer for a single symbol.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("stock {0} not found")]
    NotFound(String),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl FetchError {
    pub fn upstream(symbol: &str, err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound(_) => FetchError::NotFound(symbol.to_string()),
            other => FetchError::UpstreamFailure(format!("{symbol}: {other}")),
        }
    }
}
