//! HTTP request.

use std::marker::Unpin;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{Cookies, Error, FormData, Head, Params};
use crate::config::get_config;
use crate::controller::Session;

/// HTTP request.
///
/// The request is fully loaded into memory. It's cheap to clone
/// since the contents are behind an [`std::sync::Arc`]. Clones share the session.
#[derive(Debug, Clone)]
pub struct Request {
    head: Head,
    session: Arc<Mutex<Session>>,
    inner: Arc<Inner>,
    params: Option<Arc<Params>>,
    received_at: OffsetDateTime,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            head: Head::default(),
            session: Arc::new(Mutex::new(Session::default())),
            inner: Arc::new(Inner::default()),
            params: None,
            received_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    body: Vec<u8>,
    cookies: Cookies,
    peer: Option<SocketAddr>,
}

impl Request {
    /// Read the request in its entirety from a stream and open its session.
    /// Bodies larger than the configured `body_max_size` are refused.
    pub async fn read(peer: SocketAddr, stream: impl AsyncRead + Unpin) -> Result<Self, Error> {
        Self::read_limited(peer, stream, get_config().general.body_max_size).await
    }

    /// Read the request, accepting a body of at most `max_body` bytes.
    pub async fn read_limited(
        peer: SocketAddr,
        mut stream: impl AsyncRead + Unpin,
        max_body: usize,
    ) -> Result<Self, Error> {
        let head = Head::read(&mut stream).await?;
        let content_length = head.content_length().unwrap_or(0);

        if content_length > max_body {
            return Err(Error::BodyTooLarge(max_body));
        }

        let mut body = vec![0u8; content_length];
        stream
            .read_exact(&mut body)
            .await
            .map_err(|_| Error::MalformedRequest("incorrect content length"))?;

        let cookies = head.cookies();
        let session = Session::open(&cookies);

        Ok(Request {
            head,
            params: None,
            session: Arc::new(Mutex::new(session)),
            inner: Arc::new(Inner {
                body,
                peer: Some(peer),
                cookies,
            }),
            received_at: OffsetDateTime::now_utc(),
        })
    }

    /// The client's address, if the request came from the network.
    pub fn peer(&self) -> Option<&SocketAddr> {
        self.inner.peer.as_ref()
    }

    /// Set the route params on the request.
    pub fn with_params(mut self, params: Arc<Params>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Extract a route parameter, e.g. `:id` in `/users/:id`.
    pub fn parameter<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.params
            .as_ref()?
            .parameter(self.path().base(), name)?
            .parse()
            .ok()
    }

    /// Request's body as bytes.
    pub fn body(&self) -> &[u8] {
        &self.inner.body
    }

    /// Request's body as a UTF-8 string. Invalid characters are replaced.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(self.body()).to_string()
    }

    /// Submitted form fields.
    pub fn form_data(&self) -> FormData {
        FormData::from_request(self)
    }

    /// Request's body deserialized from JSON.
    pub fn json<'a, T: Deserialize<'a>>(&'a self) -> Result<T, Error> {
        Ok(serde_json::from_slice(self.body())?)
    }

    /// Cookies sent by the client.
    pub fn cookies(&self) -> &Cookies {
        &self.inner.cookies
    }

    /// The session opened from the session cookie. Empty if the cookie was
    /// missing or its signature didn't check out.
    ///
    /// Changes made here are saved to the session cookie with the response,
    /// error pages included. Don't hold on to it across an `.await`.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock()
    }

    /// When the request was received.
    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }
}

impl Deref for Request {
    type Target = Head;

    fn deref(&self) -> &Self::Target {
        &self.head
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::crypto::SessionSerializer;
    use crate::config::get_config;
    use serde_json::json;

    /// Build a request from raw HTTP.
    pub async fn request(raw: &str) -> Result<Request, Error> {
        Request::read("127.0.0.1:1337".parse().unwrap(), raw.as_bytes()).await
    }

    /// Build a form POST to `/`.
    pub async fn post_form(body: &str, cookie: Option<&str>) -> Result<Request, Error> {
        let cookie = cookie
            .map(|cookie| format!("Cookie: {}\r\n", cookie))
            .unwrap_or_default();

        request(&format!(
            "POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n{}\r\n{}",
            body.len(),
            cookie,
            body
        ))
        .await
    }

    #[tokio::test]
    async fn test_body() {
        #[derive(Deserialize)]
        struct Hello {
            hello: String,
        }

        let body = r#"{"hello": "world"}"#;
        let request = request(&format!(
            "POST /?hello=world HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
        .await
        .unwrap();

        let json = request.json::<Hello>().expect("deserialize body");
        assert_eq!(json.hello, "world");
        assert!(request.form_data().get::<String>("hello").is_none());
        assert_eq!(request.peer().unwrap().port(), 1337);
    }

    #[tokio::test]
    async fn test_short_body() {
        let result = request("POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").await;
        assert!(matches!(
            result,
            Err(Error::MalformedRequest("incorrect content length"))
        ));
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let result = request("POST / HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n").await;
        assert!(matches!(result, Err(Error::BodyTooLarge(_))));

        let raw = "POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\ninput=hello";
        let peer = "127.0.0.1:1337".parse().unwrap();

        let result = Request::read_limited(peer, raw.as_bytes(), 10).await;
        assert!(matches!(result, Err(Error::BodyTooLarge(10))));
        assert_eq!(Error::BodyTooLarge(10).code(), 413);

        let request = Request::read_limited(peer, raw.as_bytes(), 11).await.unwrap();
        assert_eq!(request.string(), "input=hello");
    }

    #[tokio::test]
    async fn test_form() {
        let request = post_form("input=%7B%7B7*7%7D%7D", None).await.unwrap();
        assert_eq!(
            request.form_data().get_required::<String>("input").unwrap(),
            "{{7*7}}"
        );
        assert!(request.session().is_empty());
        assert!(request.session().new());
    }

    #[tokio::test]
    async fn test_session_opened() {
        let name = &get_config().general.session_cookie_name;
        let cookie = SessionSerializer::from_config()
            .dumps(&json!({"user": "visitor"}))
            .unwrap();

        let request = post_form("input=x", Some(&format!("{}={}", name, cookie)))
            .await
            .unwrap();
        assert_eq!(request.session().get_str("user"), Some("visitor"));
        assert!(!request.session().new());

        // Signed with some other key: ignored.
        let forged = SessionSerializer::new("guess")
            .dumps(&json!({"user": "admin"}))
            .unwrap();
        let request = post_form("input=x", Some(&format!("{}={}", name, forged)))
            .await
            .unwrap();
        assert!(request.session().is_empty());
    }
}
