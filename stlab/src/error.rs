//! Application-level error, for `main` functions of stlab applications.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] crate::config::Error),

    #[error("{0}")]
    Http(#[from] crate::http::Error),

    #[error("{0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("{0}")]
    View(#[from] crate::view::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
