//! Forms submitted with `application/x-www-form-urlencoded`.
use super::{Error, Query, Request};
use std::collections::hash_map::IntoIter;
use std::str::FromStr;

use tracing::debug;

/// Data submitted with a form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormData {
    fields: Query,
}

impl FormData {
    /// Extract form data from the request body.
    ///
    /// Bodies that aren't URL-encoded forms produce an empty form, so reading a field
    /// from them is a missing parameter (HTTP 400), not a server error.
    pub fn from_request(request: &Request) -> Self {
        let content_type = request
            .header("content-type")
            .map(|ct| ct.to_lowercase())
            .unwrap_or_default();

        if content_type.contains("application/x-www-form-urlencoded") {
            Self::parse(&request.string())
        } else {
            if !request.body().is_empty() {
                debug!("ignoring form body with content type \"{}\"", content_type);
            }
            Self::default()
        }
    }

    /// Parse a URL-encoded form body.
    pub fn parse(body: &str) -> Self {
        Self {
            fields: Query::parse(body.trim_end_matches(['\r', '\n'])),
        }
    }

    /// Get a form field converted to the requested type.
    ///
    /// #### Example
    ///
    /// ```rust,ignore
    /// let form_data = request.form_data();
    /// if let Some(input) = form_data.get::<String>("input") {
    ///     // do something with the value
    /// }
    /// ```
    pub fn get<T: FromStr>(&self, name: &str) -> Option<T> {
        self.fields.get::<T>(name)
    }

    /// Same as [`FormData::get`], but a missing field is an error, which controllers
    /// turn into `400 - Bad Request` when it's returned with `?`.
    pub fn get_required<T: FromStr>(&self, name: &str) -> Result<T, Error> {
        self.fields.get_required(name)
    }

    pub fn fields(&self) -> &Query {
        &self.fields
    }

    pub fn into_iter(self) -> IntoIter<String, String> {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let form = FormData::parse("input=%7B%7B+config.SECRET_KEY+%7D%7D&submit=Send\r\n");
        assert_eq!(
            form.get::<String>("input"),
            Some("{{ config.SECRET_KEY }}".into())
        );
        assert_eq!(form.get::<String>("submit"), Some("Send".into()));
        assert!(form.get_required::<String>("missing").is_err());
    }
}
