//! Path with regex is used to:
//!
//! 1. Route requests to a controller
//! 2. Extract parameters from the URL
//!
//! Parameters are denoted by the colon-name notation, e.g. `:name`.

use super::{Params, Path};
use crate::http::Error;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Path compiled into the regex the [`crate::http::Router`] matches requests against.
#[derive(Debug, Clone)]
pub struct PathWithRegex {
    path: Path,
    params: Arc<Params>,
    path_type: PathType,
}

/// How a route matches paths.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum PathType {
    /// Matches only this path.
    Route,
    /// Matches this path and all paths below it.
    Wildcard,
}

impl PathWithRegex {
    pub fn new(path: Path, path_type: PathType) -> Result<Self, Error> {
        let mut params = HashMap::new();
        // Group 0 is the whole match.
        let mut i = 1;
        let mut regex = Vec::new();

        for part in path.base().split('/') {
            let re = if let Some(name) = part.strip_prefix(':') {
                params.insert(name.to_owned(), i);
                i += 1;
                "([a-zA-Z0-9_-]+)".to_string()
            } else {
                regex::escape(part)
            };
            regex.push(re);
        }

        let regex = "^".to_string()
            + &regex.join(r#"\/"#)
            + match path_type {
                PathType::Route => "",
                PathType::Wildcard => ".*",
            }
            // Last slash is optional.
            + if path.base().ends_with('/') { "$" } else { r#"\/?$"# };

        let regex = Regex::new(&regex)?;

        Ok(Self {
            path,
            params: Arc::new(Params::new(regex, params)),
            path_type,
        })
    }

    pub fn params(&self) -> Arc<Params> {
        self.params.clone()
    }

    pub fn regex(&self) -> &Regex {
        self.params.regex()
    }

    pub fn path_type(&self) -> PathType {
        self.path_type
    }
}

impl std::ops::Deref for PathWithRegex {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}
