//! Response body.
//!
//! The body can be text, HTML, JSON or raw bytes. The `Content-Type` and `Content-Length`
//! headers are set from it automatically.
use std::marker::Unpin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// UTF-8 encoded HTML.
    Html(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 encoded text.
    Text(String),
    /// UTF-8 encoded JSON string.
    Json(Vec<u8>),
}

impl Body {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }

    pub fn html(text: impl ToString) -> Self {
        Self::Html(text.to_string())
    }

    /// Write the body to the stream. The stream isn't flushed.
    pub async fn send(&self, mut stream: impl AsyncWrite + Unpin) -> Result<(), std::io::Error> {
        stream.write_all(self.as_bytes()).await
    }

    pub fn as_bytes(&self) -> &[u8] {
        use Body::*;

        match self {
            Html(html) => html.as_bytes(),
            Text(text) => text.as_bytes(),
            Bytes(bytes) | Json(bytes) => bytes,
        }
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).to_string()
    }

    /// Body size, for the `Content-Length` header.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Body MIME type, for the `Content-Type` header.
    ///
    /// # Example
    ///
    /// ```
    /// # use stlab::http::Body;
    /// let body = Body::html("<h1>Hello from stlab!</h1>");
    /// assert_eq!(body.mime_type(), "text/html; charset=utf-8");
    /// ```
    pub fn mime_type(&self) -> &'static str {
        use Body::*;

        match self {
            Text(_) => "text/plain; charset=utf-8",
            Html(_) => "text/html; charset=utf-8",
            Json(_) => "application/json",
            Bytes(_) => "application/octet-stream",
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(body: Vec<u8>) -> Self {
        Self::Bytes(body)
    }
}

impl From<&[u8]> for Body {
    fn from(body: &[u8]) -> Self {
        Self::Bytes(body.to_vec())
    }
}

impl TryFrom<serde_json::Value> for Body {
    type Error = serde_json::Error;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(Self::Json(serde_json::to_vec(&json)?))
    }
}
