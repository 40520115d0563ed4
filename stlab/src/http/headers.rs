//! HTTP headers.
use std::collections::{hash_map::Iter, HashMap};

/// HTTP headers. Names are stored lowercase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    headers: HashMap<String, String>,
}

impl Headers {
    /// Create new empty headers storage.
    pub fn new() -> Self {
        Self {
            headers: HashMap::new(),
        }
    }

    /// Add a header. The name is converted to lowercase.
    ///
    /// # Example
    ///
    /// ```
    /// # use stlab::http::Headers;
    /// let mut headers = Headers::new();
    /// headers.insert("X-Frame-Options", "DENY");
    /// assert_eq!(headers.get("x-frame-options"), Some(&String::from("DENY")));
    /// ```
    ///
    /// Multiple headers with the same name aren't supported. `Set-Cookie`
    /// is the only one that needs it and cookies are handled separately.
    pub fn insert(&mut self, name: impl ToString, value: impl ToString) {
        self.headers
            .insert(name.to_string().to_lowercase(), value.to_string());
    }

    /// Get a header value by name. Case insensitive.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Remove a header by name. Case insensitive.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> Iter<String, String> {
        self.headers.iter()
    }

    /// Serialize headers for the wire, sorted by name.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut headers = self.headers.iter().collect::<Vec<_>>();
        headers.sort();

        let mut bytes = Vec::new();
        for (name, value) in headers {
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(b": ");
            bytes.extend_from_slice(value.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }
        bytes
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }
}
