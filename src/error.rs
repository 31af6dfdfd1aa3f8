use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load catalog from {source_name}: {message}")]
    Catalog {
        source_name: String,
        message: String,
    },

    #[error("Cannot sample {requested} {what} from a population of {available}")]
    Sampling {
        what: &'static str,
        requested: usize,
        available: usize,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn catalog(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Catalog {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    /// Errors the stream consumer is allowed to retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::Status {
                status: status.as_u16(),
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
            },
            None => Error::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
