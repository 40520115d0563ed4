//! Request head: method, path, HTTP version and headers.

use std::marker::Unpin;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{Cookies, Error, Headers, Path, Query};
use crate::config::get_config;

/// HTTP method, e.g. GET, POST, etc.
#[derive(PartialEq, Clone, Debug, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    /// Some other method we don't have a name for.
    Other(String),
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "PATCH" => Method::Patch,
            _ => Method::Other(value.to_string()),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Method::*;

        let name = match self {
            Get => "GET",
            Post => "POST",
            Put => "PUT",
            Delete => "DELETE",
            Head => "HEAD",
            Patch => "PATCH",
            Other(other) => other.as_str(),
        };

        write!(f, "{}", name)
    }
}

/// HTTP version.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Version {
    #[default]
    Http1,
    Http10,
    Unknown,
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        match value {
            "HTTP/1.1" => Version::Http1,
            "HTTP/1.0" => Version::Http10,
            _ => Version::Unknown,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Version::Http1 | Version::Unknown => write!(f, "HTTP/1.1"),
            Version::Http10 => write!(f, "HTTP/1.0"),
        }
    }
}

/// Request HTTP method, path, HTTP version and headers.
#[derive(Debug, Clone, Default)]
pub struct Head {
    method: Method,
    path: Path,
    version: Version,
    headers: Headers,
}

impl Head {
    /// Read request head from a stream, up to the configured `header_max_size` bytes.
    pub async fn read(stream: impl AsyncRead + Unpin) -> Result<Self, Error> {
        Self::read_limited(stream, get_config().general.header_max_size).await
    }

    /// Read request head, reading at most `limit` bytes.
    pub async fn read_limited(
        mut stream: impl AsyncRead + Unpin,
        limit: usize,
    ) -> Result<Self, Error> {
        let mut bytes_remaining = limit;

        let request = Self::read_line(&mut stream, &mut bytes_remaining, limit).await?;

        if request.is_empty() {
            return Err(Error::MalformedRequest("empty request line"));
        }

        let mut request = request.split(' ').filter(|s| !s.is_empty());

        let method = Method::from(request.next().ok_or(Error::MalformedRequest("method"))?);
        let path = Path::parse(request.next().ok_or(Error::MalformedRequest("path"))?);
        let version = Version::from(request.next().ok_or(Error::MalformedRequest("version"))?);

        let mut headers = Headers::new();

        loop {
            let header = Self::read_line(&mut stream, &mut bytes_remaining, limit).await?;

            if header.is_empty() {
                break;
            }

            let (name, value) = header
                .split_once(':')
                .ok_or(Error::MalformedRequest("header"))?;

            headers.insert(name.trim(), value.trim());
        }

        Ok(Head {
            method,
            path,
            version,
            headers,
        })
    }

    /// Get cookies sent with this request.
    pub fn cookies(&self) -> Cookies {
        if let Some(cookie) = self.headers.get("cookie") {
            Cookies::parse(cookie)
        } else {
            Cookies::default()
        }
    }

    /// Is this a HTTP/1.1 request?
    pub fn http1(&self) -> bool {
        self.version == Version::Http1
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Request path, including query parameters, e.g., `/?input=hello`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed query string, e.g. `input=hello`.
    pub fn query(&self) -> &Query {
        self.path().query()
    }

    /// Request method, e.g. `GET`, `POST`, etc.
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn post(&self) -> bool {
        self.method() == &Method::Post
    }

    pub fn get(&self) -> bool {
        self.method() == &Method::Get
    }

    /// Size of the request body, from the `Content-Length` header.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("content-length")
            .and_then(|cl| cl.parse::<usize>().ok())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a header value by name. Case insensitive.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Should the connection stay open after this request?
    ///
    /// HTTP/1.1 connections are persistent unless the client says `Connection: close`.
    pub fn keep_alive(&self) -> bool {
        let connection = self
            .headers
            .get("connection")
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        if self.http1() {
            !connection.contains("close")
        } else {
            connection.contains("keep-alive")
        }
    }

    /// Read a line from the stream, parsing out \r\n.
    async fn read_line(
        mut stream: impl AsyncRead + Unpin,
        bytes_remaining: &mut usize,
        limit: usize,
    ) -> Result<String, Error> {
        let mut buf = Vec::new();
        let (mut cr, mut lf) = (false, false);

        loop {
            if *bytes_remaining == 0 {
                return Err(Error::HeadersTooLarge(limit));
            }

            // `stream` should be buffered.
            let b = stream.read_u8().await?;
            *bytes_remaining -= 1;

            if b == b'\r' {
                cr = true;
                if lf {
                    return Err(Error::MalformedRequest("nl before cr"));
                }
            } else if b == b'\n' {
                lf = true;
            } else {
                buf.push(b);
            }

            if cr && lf {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_read_line() {
        let line = b"Content-Type: application/json\r\n";
        let mut remaining = 4096;
        let result = Head::read_line(&line[..], &mut remaining, 4096)
            .await
            .expect("read_line");
        assert_eq!(result, "Content-Type: application/json");
        assert_eq!(remaining, 4096 - line.len());
    }

    #[tokio::test]
    async fn test_parse_header() {
        let body = ("POST /?hello=world&apples=oranges HTTP/1.1\r\n".to_owned()
            + "Host: localhost:5000\r\n"
            + "Content-Type: application/x-www-form-urlencoded\r\n"
            + "Accept: */*\r\n"
            + "Content-Length: 4\r\n"
            + "Cookie: session=eyJ1c2VyIjoiYWRtaW4ifQ.Zk.sig; theme=dark\r\n"
            + "\r\n"
            + "hello")
            .as_bytes()
            .to_vec();
        let head = Head::read(&body[..]).await.expect("head");
        assert!(head.http1());
        assert!(head.post());
        assert_eq!(head.path().path(), "/");
        assert_eq!(head.content_length(), Some(4));
        assert_eq!(head.header("host"), Some(&String::from("localhost:5000")));
        assert_eq!(
            head.header("ConTent-TypE"), // case insensitive
            Some(&String::from("application/x-www-form-urlencoded"))
        );
        assert!(head.keep_alive());
        assert_eq!(head.query().get::<String>("hello"), Some("world".into()));
        assert_eq!(head.cookies().get("theme").unwrap().value(), "dark");
        assert_eq!(
            head.cookies().get("session").unwrap().value(),
            "eyJ1c2VyIjoiYWRtaW4ifQ.Zk.sig"
        );
    }

    #[tokio::test]
    async fn test_connection_close() {
        let head = Head::read("GET / HTTP/1.1\r\nConnection: close\r\n\r\n".as_bytes())
            .await
            .expect("head");
        assert!(!head.keep_alive());

        let head = Head::read("GET / HTTP/1.0\r\n\r\n".as_bytes())
            .await
            .expect("head");
        assert!(!head.keep_alive());
    }

    #[tokio::test]
    async fn test_nl_before_cr() {
        let err = Head::read("GET / HTTP/1.1\n\r".as_bytes())
            .await
            .expect_err("parser should throw err");

        assert!(matches!(err, Error::MalformedRequest("nl before cr")));
    }

    #[tokio::test]
    async fn test_headers_too_large() {
        let request = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(128));
        let err = Head::read_limited(request.as_bytes(), 64)
            .await
            .expect_err("too large");

        assert!(matches!(err, Error::HeadersTooLarge(64)));
        assert_eq!(err.code(), 413);
    }
}
