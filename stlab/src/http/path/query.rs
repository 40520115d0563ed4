use std::collections::{hash_map::IntoIter, HashMap};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use crate::http::{urldecode, urlencode, Error};

/// Query string or URL-encoded form, e.g. `input=%7B%7B7*7%7D%7D&debug=1`.
///
/// Keys and values are decoded once, when parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    query: HashMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self {
            query: HashMap::new(),
        }
    }

    pub fn parse(data: &str) -> Self {
        let mut query = Self::new();

        // Remove the anchor if any.
        let without_anchor = data.split('#').next().unwrap_or_default();

        for part in without_anchor.split('&') {
            if part.is_empty() {
                continue;
            }

            let (key, value) = part.split_once('=').unwrap_or((part, "")); // ?key&value=two

            query.insert(urldecode(key), urldecode(value));
        }

        query
    }

    /// Get a value converted to the requested type.
    pub fn get<T: FromStr>(&self, name: &str) -> Option<T> {
        self.query.get(name).and_then(|value| value.parse::<T>().ok())
    }

    /// Get a parameter, returning HTTP 400 if it's not set.
    pub fn get_required<T: FromStr>(&self, name: &str) -> Result<T, Error> {
        self.get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.query).unwrap_or_default()
    }

    /// An owning iterator over the query.
    pub fn into_iter(self) -> IntoIter<String, String> {
        self.query.into_iter()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut params = self
            .query
            .iter()
            .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
            .collect::<Vec<_>>();
        params.sort();

        write!(f, "{}", params.join("&"))
    }
}

impl Deref for Query {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.query
    }
}

impl DerefMut for Query {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.query
    }
}
