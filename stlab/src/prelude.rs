//! A collection of types, methods and macros
//! which when imported make writing stlab applications easy.
//!
//! ```
//! use stlab::prelude::*;
//! ```
pub use crate::config::Config;
pub use crate::controller::{Controller, Error, PageController, Session};
pub use crate::crypto::SessionSerializer;
pub use crate::http::{Cookie, CookieBuilder, Method, Request, Response, Server};
pub use crate::logging::Logger;
pub use crate::route;
pub use crate::view::{
    render_template, render_template_string, Context, Template, ToTemplateValue, Value,
};

/// A macro to easily implement async traits methods.
pub use async_trait::async_trait;

pub use serde::{Deserialize, Serialize};
pub use time::{Duration, OffsetDateTime};
pub use tokio;
