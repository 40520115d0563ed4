//! stlab is a small web framework for demonstrating server-side template injection (SSTI)
//! and session cookie forgery. It comes with everything the demo applications need: an HTTP/1.1
//! server, controllers, a Jinja-flavoured template engine and signed (not encrypted) session cookies
//! compatible with the Flask/itsdangerous cookie format.
//!
//! # Getting started
//!
//! ```
//! use stlab::prelude::*;
//! ```
//!
//! ### Controllers
//!
//! Serving HTTP requests requires implementing the [`controller::Controller`] trait for a struct:
//!
//! ```rust
//! use stlab::prelude::*;
//!
//! #[derive(Default)]
//! struct Index;
//!
//! #[stlab::async_trait]
//! impl Controller for Index {
//!     async fn handle(&self, request: &Request) -> Result<Response, Error> {
//!         Ok(Response::new().html("<h1>Hello from stlab!</h1>"))
//!     }
//! }
//! ```
//!
//! ### HTTP server
//!
//! ```rust,ignore
//! use stlab::http::{Server, self};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), http::Error> {
//!     Server::new(vec![
//!         route!("/" => Index),
//!     ])
//!     .launch()
//!     .await
//! }
//! ```
//!
//! ### Why the templates are dangerous
//!
//! Rendering a template built from user input (see [`view::render_template_string`]) evaluates
//! whatever expressions the user wrote, with the same globals every other template gets, including
//! `config`. `{{ config.SECRET_KEY }}` leaks the key that signs session cookies, and with the key
//! anyone can mint a valid session (see [`crypto::SessionSerializer`]).
pub mod colors;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod http;
pub mod logging;
pub mod prelude;
pub mod view;

/// Wrapper around async traits to make them easy to use.
pub use async_trait::async_trait;
/// Serde is used for (de)serialization.
pub use serde;
/// Tokio is an asynchronous runtime for Rust.
pub use tokio;

/// Map a route to a controller.
///
/// # Example
///
/// ```
/// use stlab::prelude::*;
/// # #[derive(Default)]
/// # struct Index;
/// # #[stlab::async_trait]
/// # impl Controller for Index {
/// #    async fn handle(&self, request: &Request) -> Result<Response, Error> {
/// #        Ok(Response::new())
/// #    }
/// # }
///
/// let handler = route!("/" => Index);
/// ```
#[macro_export]
macro_rules! route {
    ($path:expr => $controller:ty) => {
        $crate::controller::Controller::route(<$controller>::default(), $path)
    };
}

/// Convert the first letter of the string to uppercase lettering.
pub fn capitalize(string: &str) -> String {
    let mut iter = string.chars();
    match iter.next() {
        None => String::new(),
        Some(letter) => letter.to_uppercase().chain(iter).collect(),
    }
}

/// Capitalize every word, the way Jinja's `title` filter does.
pub fn title_case(string: &str) -> String {
    let mut result = String::with_capacity(string.len());
    let mut word_start = true;

    for c in string.chars() {
        if c.is_alphanumeric() {
            if word_start {
                result.extend(c.to_uppercase());
            } else {
                result.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            result.push(c);
            word_start = true;
        }
    }

    result
}

/// Remove unsafe characters from a string printed
/// inside an HTML template.
pub fn safe_html(string: &str) -> String {
    let mut result = String::with_capacity(string.len());

    for c in string.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&#34;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_safe_html() {
        assert_eq!(
            safe_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&#34;x &amp; &#39;y&#39;&#34;)&lt;/script&gt;"
        );
        assert_eq!(safe_html("{{7*7}}"), "{{7*7}}");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello wORLD-wide"), "Hello World-Wide");
        assert_eq!(capitalize("andre"), "Andre");
    }
}
