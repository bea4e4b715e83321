//! Wayback URLs error types.

use std::{io, time::Duration};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("archive index request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("archive index returned {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed archive index response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gave up after {0:?}")]
    Timeout(Duration),
    #[error("fetch task did not complete: {0}")]
    Task(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unknown IO error")]
    Io(#[from] io::Error),
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
