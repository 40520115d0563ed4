//! Client-side sessions.
//!
//! The session lives entirely in a signed cookie: a JSON object the client holds and sends
//! back with every request. It's readable by anyone holding the cookie and, with the secret key,
//! writable by anyone too.
use serde_json::{Map, Value};
use time::Duration;
use tracing::debug;

use crate::config::get_config;
use crate::crypto::SessionSerializer;
use crate::http::{Cookies, Error as HttpError};

/// Session data, a JSON object keyed by strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    data: Map<String, Value>,
    modified: bool,
    new: bool,
}

impl Session {
    /// A new empty session, for a client that didn't send a valid session cookie.
    pub fn empty() -> Self {
        Self {
            new: true,
            ..Default::default()
        }
    }

    /// Open the session from the request cookies.
    ///
    /// A missing, tampered with or expired cookie opens an empty session.
    pub fn open(cookies: &Cookies) -> Self {
        let config = get_config();

        match cookies.get(&config.general.session_cookie_name) {
            Some(cookie) => Self::load(
                &SessionSerializer::from_config(),
                cookie.value(),
                config.general.session_lifetime,
            ),
            None => Self::empty(),
        }
    }

    /// Open a session cookie with the given serializer.
    pub fn load(serializer: &SessionSerializer, cookie: &str, max_age: Duration) -> Self {
        match serializer.loads(cookie, Some(max_age)) {
            Ok(Value::Object(data)) => Self {
                data,
                modified: false,
                new: false,
            },

            Ok(_) => {
                debug!("session cookie is not a JSON object");
                Self::empty()
            }

            Err(err) => {
                debug!("session cookie rejected: {}", err);
                Self::empty()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|value| value.as_str())
    }

    /// Get a value, or fail with HTTP 400 like a missing form field would.
    pub fn get_required(&self, key: &str) -> Result<&Value, HttpError> {
        self.get(key)
            .ok_or_else(|| HttpError::MissingParameter(format!("session[{}]", key)))
    }

    /// Set a value. The session is saved to the cookie when the response is sent.
    pub fn insert(&mut self, key: impl ToString, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
        self.modified = true;
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Remove everything. The session cookie is deleted when the response is sent.
    pub fn clear(&mut self) {
        self.data.clear();
        self.modified = true;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Was the session changed while handling the request?
    pub fn modified(&self) -> bool {
        self.modified
    }

    /// Is this a new session, i.e. the client had no valid session cookie?
    pub fn new(&self) -> bool {
        self.new
    }

    /// The session as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.data.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}
