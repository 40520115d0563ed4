//! HTTP URL path, e.g. `/?input=%7B%7B7*7%7D%7D#result`.
//!
//! Paths are parsed for each incoming request and matched against
//! the route regexes to find a handler.
pub mod params;
pub mod query;
pub mod with_regex;

pub use params::Params;
pub use query::Query;
pub use with_regex::{PathType, PathWithRegex};

/// HTTP URL path.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    query: Query,
    base: String,
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }

        Ok(())
    }
}

impl Default for Path {
    fn default() -> Self {
        Path {
            query: Query::new(),
            base: "/".to_string(),
        }
    }
}

impl Path {
    /// Path without the query, e.g. `/users`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Get the parsed query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn path(&self) -> &str {
        &self.base
    }

    /// Parse the path from the request line.
    ///
    /// # Example
    ///
    /// ```
    /// # use stlab::http::Path;
    /// let path = Path::parse("/users?id=5");
    ///
    /// assert_eq!(path.path(), "/users");
    /// assert_eq!(path.query().get::<i64>("id").unwrap(), 5);
    /// ```
    pub fn parse(path: &str) -> Path {
        // All paths must be absolute.
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            "/".to_string() + path
        };

        match path.split_once('?') {
            Some((base, query)) => Path {
                base: base.to_string(),
                query: Query::parse(query),
            },
            None => Path {
                base: path.split('#').next().unwrap_or("/").to_string(),
                query: Query::new(),
            },
        }
    }

    /// Compile the regex this path is routed with.
    pub fn with_regex(self, path_type: PathType) -> Result<PathWithRegex, super::Error> {
        PathWithRegex::new(self, path_type)
    }
}
