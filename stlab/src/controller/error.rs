//! Errors a controller can return.
//!
//! Every layer a page touches (form parsing, templates, session signing, config) converts
//! into [`Error`], so handlers can use `?` throughout. Anything else goes through [`Error::new`].
use crate::http::Error as HttpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The request was malformed or missing something the page needs.
    #[error("http error: {0}")]
    Http(Box<HttpError>),

    /// A template failed to compile or render. User-submitted templates end up here.
    #[error("template error: {0}")]
    Template(#[from] crate::view::Error),

    #[error("session error: {0}")]
    Session(#[from] crate::crypto::Error),

    #[error("config error: {0}")]
    Config(#[from] crate::config::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Sync + Send>),
}

impl Error {
    /// Wrap any other error.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Other(Box::new(err))
    }

    /// Status code of the error page this error turns into.
    pub fn code(&self) -> u16 {
        match self {
            Error::Http(err) => err.code(),
            _ => 500,
        }
    }
}

impl From<HttpError> for Error {
    fn from(error: HttpError) -> Self {
        Error::Http(Box::new(error))
    }
}
