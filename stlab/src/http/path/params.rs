//! URL parameters, e.g. `/users/:id`.
use regex::Regex;
use std::collections::HashMap;

/// Extracts named parameters from a path using the route's regex.
#[derive(Debug)]
pub struct Params {
    params: HashMap<String, usize>,
    regex: Regex,
}

impl Params {
    /// `params` maps parameter names to capture group indices in `regex`.
    pub fn new(regex: Regex, params: HashMap<String, usize>) -> Self {
        Self { params, regex }
    }

    /// Extract a parameter from the URL.
    pub fn parameter<'a>(&'a self, base: &'a str, name: &str) -> Option<&'a str> {
        let index = self.params.get(name)?;
        let captures = self.regex.captures(base)?;
        captures.get(*index).map(|capture| capture.as_str())
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}
