use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("request headers are larger than {0} bytes")]
    HeadersTooLarge(usize),

    #[error("request body is larger than {0} bytes")]
    BodyTooLarge(usize),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("{0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Regex(#[from] regex::Error),

    #[error("{0}")]
    Time(#[from] time::error::Format),

    #[error("parameter \"{0}\" is missing")]
    MissingParameter(String),
}

impl Error {
    /// HTTP status code this error should produce.
    pub fn code(&self) -> u16 {
        match self {
            Self::MissingParameter(_) => 400,
            Self::MalformedRequest(_) => 400,
            Self::HeadersTooLarge(_) | Self::BodyTooLarge(_) => 413,
            _ => 500,
        }
    }
}
