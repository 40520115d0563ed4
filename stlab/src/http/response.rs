//! HTTP response.

use serde::Serialize;
use std::collections::HashMap;
use std::marker::Unpin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{head::Version, Body, Cookies, Error, Headers, Request};
use crate::{config::get_config, controller::Session, safe_html};

/// Response status, e.g. 404, 200, etc.
#[derive(Debug, PartialEq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    ContentTooLarge,
    InternalServerError,
    Code(u16),
}

impl Status {
    pub fn code(&self) -> u16 {
        use Status::*;

        match self {
            Ok => 200,
            BadRequest => 400,
            NotFound => 404,
            MethodNotAllowed => 405,
            ContentTooLarge => 413,
            InternalServerError => 500,
            Code(code) => *code,
        }
    }

    pub fn ok(&self) -> bool {
        self.code() < 400
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &'static str {
        match self.code() {
            200 => "OK",
            302 => "Found",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Content Too Large",
            500 => "Internal Server Error",
            _ => "",
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Status {
        use Status::*;

        match code {
            200 => Ok,
            400 => BadRequest,
            404 => NotFound,
            405 => MethodNotAllowed,
            413 => ContentTooLarge,
            500 => InternalServerError,
            code => Code(code),
        }
    }
}

/// HTTP response.
#[derive(Debug)]
pub struct Response {
    code: u16,
    headers: Headers,
    version: Version,
    body: Body,
    cookies: Cookies,
    session: Option<Session>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Create empty response.
    pub fn new() -> Self {
        Self {
            code: 200,
            headers: Headers::from(HashMap::from([
                ("content-type".to_string(), "text/plain".to_string()),
                ("content-length".to_string(), "0".to_string()),
                ("server".to_string(), "stlab".to_string()),
                ("connection".to_string(), "keep-alive".to_string()),
            ])),
            body: Body::bytes(vec![]),
            version: Version::Http1,
            cookies: Cookies::new(),
            session: None,
        }
    }

    /// Save the session, if it changed: the one set on the response, or else
    /// the request's own.
    ///
    /// A modified session is signed into the session cookie. A session that was emptied
    /// deletes the cookie, if the client had one.
    pub fn from_request(mut self, request: &Request) -> Result<Self, Error> {
        let session = match self.session.take() {
            Some(session) => session,
            None => request.session().clone(),
        };

        if session.modified() {
            let name = &get_config().general.session_cookie_name;

            if !session.is_empty() {
                self.cookies.add_session(&session)?;
            } else if request.cookies().get(name).is_some() {
                self.cookies.add_removal(name);
            }
        }

        self.session = Some(session);

        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self.headers
            .insert("content-length", self.body.len().to_string());
        self.headers.insert("content-type", self.body.mime_type());
        self
    }

    /// The response body.
    pub fn get_body(&self) -> &Body {
        &self.body
    }

    /// Response status, e.g. 200 OK.
    pub fn status(&self) -> Status {
        self.code.into()
    }

    /// Set response code.
    ///
    /// # Example
    ///
    /// ```
    /// use stlab::http::Response;
    ///
    /// let response = Response::new().text("OK").code(200);
    /// ```
    pub fn code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// Response with a JSON body serialized from a Rust type.
    pub fn json(self, body: impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_vec(&body)?;
        Ok(self.body(Body::Json(body)))
    }

    /// Response with an HTML body.
    ///
    /// # Example
    ///
    /// ```
    /// use stlab::http::Response;
    ///
    /// let response = Response::new().html("<h1>Hello world</h1>");
    /// ```
    pub fn html(self, body: impl ToString) -> Self {
        self.body(Body::Html(body.to_string()))
    }

    /// Response with a plain text body.
    pub fn text(self, body: impl ToString) -> Self {
        self.body(Body::Text(body.to_string()))
    }

    /// Add a header to the response.
    ///
    /// Header name is lowercased automatically. The value is set as-is.
    pub fn header(mut self, name: impl ToString, value: impl ToString) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Send the response to a stream, serialized as bytes.
    pub async fn send(self, mut stream: impl AsyncWrite + Unpin) -> Result<(), std::io::Error> {
        let status = self.status();
        let mut response = format!("{} {} {}\r\n", self.version, status.code(), status.reason())
            .as_bytes()
            .to_vec();

        response.extend_from_slice(&self.headers.to_bytes());
        response.extend_from_slice(&self.cookies.to_headers());
        response.extend_from_slice(b"\r\n");

        stream.write_all(&response).await?;
        self.body.send(stream).await
    }

    /// Mutable reference to response cookies.
    pub fn cookies(&mut self) -> &mut Cookies {
        &mut self.cookies
    }

    /// Cookies that will be sent with this response.
    pub fn get_cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// Return a session from the controller. It's saved to the session cookie if it was modified.
    pub fn set_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> &Option<Session> {
        &self.session
    }

    /// Default not found (404) error.
    pub fn not_found() -> Self {
        Self::error_page(404, "Not Found", None)
    }

    /// Default method not allowed (405) error.
    pub fn method_not_allowed() -> Self {
        Self::error_page(405, "Method Not Allowed", None)
    }

    /// Default bad request (400) error. The reason is shown to the client.
    pub fn bad_request(reason: Option<&str>) -> Self {
        Self::error_page(400, "Bad Request", reason)
    }

    /// Headers or body were too large (413). The connection is closed after this.
    pub fn content_too_large() -> Self {
        Self::error_page(413, "Content Too Large", None).header("connection", "close")
    }

    /// Internal server error (500). The error is shown only when `debug` is on.
    pub fn internal_error(err: impl std::error::Error) -> Self {
        let detail = if get_config().general.debug {
            Some(format!("{:?}", err))
        } else {
            None
        };

        Self::error_page(500, "Internal Server Error", detail.as_deref())
    }

    /// Internal server error (500) with a title and preformatted details, e.g. a template error.
    pub fn internal_error_pretty(title: &str, message: &str) -> Self {
        Self::new()
            .html(format!(
                r#"<!doctype html>
<html>
<head><title>{title}</title></head>
<body>
    <h3><center>500 - {title}</center></h3>
    <pre style="padding: 25px; background: #f5f5f5;">{message}</pre>
</body>
</html>
"#,
                title = safe_html(title),
                message = safe_html(message)
            ))
            .code(500)
    }

    fn error_page(code: u16, reason: &str, detail: Option<&str>) -> Self {
        let detail = detail
            .map(|detail| {
                format!(
                    "\n<br><br>\n<center><code style=\"padding: 25px;\">{}</code></center>",
                    safe_html(detail)
                )
            })
            .unwrap_or_default();

        Self::new()
            .html(format!(
                "<h3>\n    <center>{} - {}</center>\n</h3>{}\n",
                code, reason, detail
            ))
            .code(code)
    }

    pub fn redirect(self, to: impl ToString) -> Self {
        self.html("")
            .header("location", to)
            .code(302)
            .header("cache-control", "no-cache")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::request::test::request;

    #[tokio::test]
    async fn test_send() {
        let response = Response::new().html("<p>49</p>");
        let mut buf = Vec::new();
        response.send(&mut buf).await.unwrap();

        let raw = String::from_utf8(buf).unwrap();
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("content-length: 9\r\n"));
        assert!(raw.contains("content-type: text/html; charset=utf-8\r\n"));
        assert!(raw.ends_with("\r\n\r\n<p>49</p>"));
    }

    #[tokio::test]
    async fn test_session_saved_when_modified() {
        let request = request("GET / HTTP/1.1\r\n\r\n").await.unwrap();
        let name = get_config().general.session_cookie_name.clone();

        // Untouched session: no cookie.
        let response = Response::new()
            .set_session(request.session().clone())
            .from_request(&request)
            .unwrap();
        assert!(response.get_cookies().get(&name).is_none());

        let mut session = request.session().clone();
        session.insert("user", "admin");
        let response = Response::new()
            .set_session(session)
            .from_request(&request)
            .unwrap();
        assert!(response.get_cookies().get(&name).is_some());
    }

    #[tokio::test]
    async fn test_emptied_session_deletes_cookie() {
        let name = get_config().general.session_cookie_name.clone();
        let request = request(&format!("GET / HTTP/1.1\r\nCookie: {}=stale\r\n\r\n", name))
            .await
            .unwrap();

        let mut session = request.session().clone();
        session.clear();
        let mut response = Response::new()
            .set_session(session)
            .from_request(&request)
            .unwrap();

        let cookie = response.cookies().get(&name).expect("removal cookie");
        assert_eq!(cookie.value(), "");
        assert!(cookie.to_string().contains("Max-Age=0"));
    }

    #[test]
    fn test_error_pages() {
        assert_eq!(Response::not_found().status(), Status::NotFound);
        let bad = Response::bad_request(Some("parameter \"input\" is missing"));
        assert_eq!(bad.status().code(), 400);
        assert!(bad
            .get_body()
            .to_string_lossy()
            .contains("parameter &#34;input&#34; is missing"));

        let pretty = Response::internal_error_pretty("Template error", "<b>line 1</b>");
        assert!(pretty.get_body().to_string_lossy().contains("&lt;b&gt;line 1&lt;/b&gt;"));
    }
}
