//! HTTP cookies.
//!
//! This module handles decoding the `Cookie` header,
//! and generating `Set-Cookie` headers.
use std::collections::HashMap;
use time::{macros::format_description, Duration, OffsetDateTime};

use super::Error;
use crate::config::get_config;
use crate::controller::Session;
use crate::crypto::SessionSerializer;

/// Cookies storage.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, Cookie>,
}

impl Cookies {
    pub fn new() -> Self {
        Self {
            cookies: HashMap::new(),
        }
    }

    /// Parse cookies from the `Cookie` header.
    ///
    /// # Example
    ///
    /// ```
    /// # use stlab::http::Cookies;
    /// let cookies = Cookies::parse("session=eyJ1c2VyIjoiYWRtaW4ifQ.Zk.sig; theme=dark");
    /// assert_eq!(
    ///     cookies
    ///         .get("theme")
    ///         .unwrap()
    ///         .value(),
    ///     "dark"
    /// );
    /// ```
    pub fn parse(value: &str) -> Cookies {
        let mut cookies = HashMap::new();

        for part in value.split(';') {
            if let Some(cookie) = Cookie::parse(part.trim()) {
                cookies.insert(cookie.name.to_string(), cookie);
            }
        }

        Cookies { cookies }
    }

    /// Add a cookie.
    ///
    /// If this is done to the response, the cookie is sent to the client
    /// with the `Set-Cookie` header.
    pub fn add(&mut self, cookie: impl ToCookie) {
        let cookie = cookie.to_cookie();
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    /// Get a cookie sent by the client.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Get a cookie, returning HTTP 400 if the client didn't send it.
    pub fn get_required(&self, name: &str) -> Result<&Cookie, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Remove a cookie from this storage.
    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        self.cookies.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// Sign the session and set it as the session cookie.
    ///
    /// The cookie has no expiration, so the browser drops it when it closes.
    /// The signature expires after the configured session lifetime anyway.
    pub fn add_session(&mut self, session: &Session) -> Result<(), Error> {
        let config = get_config();
        let value = SessionSerializer::from_config().dumps(&session.to_json())?;

        self.add(
            CookieBuilder::new()
                .name(&config.general.session_cookie_name)
                .value(value)
                .http_only()
                .path("/")
                .lax()
                .build(),
        );

        Ok(())
    }

    /// Tell the client to delete a cookie.
    pub fn add_removal(&mut self, name: &str) {
        self.add(
            CookieBuilder::new()
                .name(name)
                .value("")
                .expiration(OffsetDateTime::UNIX_EPOCH)
                .max_age(Duration::ZERO)
                .http_only()
                .path("/")
                .lax()
                .build(),
        );
    }

    /// Convert cookies to `Set-Cookie` headers which will be sent to the client.
    pub fn to_headers(&self) -> Vec<u8> {
        let mut headers = vec![];
        for cookie in self.cookies.values() {
            headers.extend_from_slice(format!("set-cookie: {}\r\n", cookie).as_bytes());
        }
        headers
    }
}

/// Convert a value to a cookie.
///
/// Syntax sugar for simple cookies. Use the [`CookieBuilder`] to set attributes.
pub trait ToCookie {
    fn to_cookie(self) -> Cookie;
}

impl ToCookie for (&str, &str) {
    fn to_cookie(self) -> Cookie {
        CookieBuilder::new().name(self.0).value(self.1).build()
    }
}

impl ToCookie for (String, String) {
    fn to_cookie(self) -> Cookie {
        CookieBuilder::new().name(self.0).value(self.1).build()
    }
}

impl ToCookie for Cookie {
    fn to_cookie(self) -> Cookie {
        self
    }
}

/// A browser cookie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cookie {
    name: String,
    value: String,
    expiration: Option<OffsetDateTime>,
    max_age: Option<Duration>,
    path: Option<String>,
    domain: Option<String>,
    http_only: bool,
    secure: bool,
    same_site: Option<String>,
}

impl Cookie {
    /// Parse a single `name=value` pair from the `Cookie` header.
    ///
    /// Values can contain `=` (e.g. padded base64) and may be wrapped in double quotes.
    fn parse(value: &str) -> Option<Self> {
        let (name, value) = value.split_once('=').unwrap_or((value, ""));
        let name = name.trim();

        if name.is_empty() {
            return None;
        }

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        Some(CookieBuilder::new().name(name).value(value).build())
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

impl std::fmt::Display for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(ref expiration) = self.expiration {
            let expires = expiration
                .format(format_description!(
                    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
                ))
                .map_err(|_| std::fmt::Error)?;
            write!(f, "; Expires={}", expires)?;
        }

        if let Some(ref max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.whole_seconds())?;
        }

        if self.secure {
            write!(f, "; Secure")?;
        }

        if self.http_only {
            write!(f, "; HttpOnly")?;
        }

        if let Some(ref path) = self.path {
            write!(f, "; Path={}", path)?;
        }

        if let Some(ref domain) = self.domain {
            write!(f, "; Domain={}", domain)?;
        }

        if let Some(ref same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }

        Ok(())
    }
}

/// Cookie builder which helps with creating cookies with multiple attributes.
///
/// # Example
///
/// ```
/// # use stlab::http::CookieBuilder;
/// use time::Duration;
///
/// let cookie = CookieBuilder::new()
///     .name("theme")
///     .value("dark")
///     .max_age(Duration::days(4))
///     .http_only()
///     .build();
///
/// assert_eq!(cookie.to_string(), "theme=dark; Max-Age=345600; HttpOnly");
/// ```
#[derive(Clone, Debug, Default)]
pub struct CookieBuilder {
    cookie: Cookie,
}

impl CookieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl ToString) -> Self {
        self.cookie.name = name.to_string();
        self
    }

    /// Set cookie value. The value is stored in plain text.
    pub fn value(mut self, value: impl ToString) -> Self {
        self.cookie.value = value.to_string();
        self
    }

    /// Set cookie `Expires` attribute.
    pub fn expiration(mut self, expiration: OffsetDateTime) -> Self {
        self.cookie.expiration = Some(expiration);
        self
    }

    /// Set cookie `Max-Age` attribute.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.cookie.max_age = Some(max_age);
        self
    }

    pub fn path(mut self, path: impl ToString) -> Self {
        self.cookie.path = Some(path.to_string());
        self
    }

    pub fn domain(mut self, domain: impl ToString) -> Self {
        self.cookie.domain = Some(domain.to_string());
        self
    }

    /// Hide the cookie from JavaScript (`HttpOnly`).
    pub fn http_only(mut self) -> Self {
        self.cookie.http_only = true;
        self
    }

    /// Send the cookie over HTTPS only (`Secure`).
    pub fn secure(mut self) -> Self {
        self.cookie.secure = true;
        self
    }

    /// `SameSite=Lax`.
    pub fn lax(mut self) -> Self {
        self.cookie.same_site = Some("Lax".to_string());
        self
    }

    /// `SameSite=Strict`.
    pub fn strict(mut self) -> Self {
        self.cookie.same_site = Some("Strict".to_string());
        self
    }

    pub fn build(self) -> Cookie {
        self.cookie
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::decode_unverified;
    use serde_json::json;

    #[test]
    fn test_parsing_cookies() {
        let cookies = Cookies::parse("session=\"a.b.c\"; padded=YQ==; flag; =bad");
        assert_eq!(cookies.get("session").unwrap().value(), "a.b.c");
        assert_eq!(cookies.get("padded").unwrap().value(), "YQ==");
        assert_eq!(cookies.get("flag").unwrap().value(), "");
        assert!(cookies.get("").is_none());
        assert!(matches!(
            cookies.get_required("missing"),
            Err(Error::MissingParameter(_))
        ));
    }

    #[test]
    fn test_removal() {
        let mut cookies = Cookies::new();
        cookies.add_removal("session");
        let header = String::from_utf8(cookies.to_headers()).unwrap();

        assert_eq!(
            header,
            "set-cookie: session=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; Path=/; SameSite=Lax\r\n"
        );
    }

    #[test]
    fn test_session_cookie() {
        let mut session = Session::default();
        session.insert("user", "admin");

        let mut cookies = Cookies::new();
        cookies.add_session(&session).unwrap();

        let name = &get_config().general.session_cookie_name;
        let cookie = cookies.get(name).expect("session cookie");
        assert!(cookie.http_only());
        assert!(cookie.to_string().ends_with("; HttpOnly; Path=/; SameSite=Lax"));

        let decoded = decode_unverified(cookie.value()).unwrap();
        assert_eq!(decoded.payload, json!({"user": "admin"}));
    }
}
