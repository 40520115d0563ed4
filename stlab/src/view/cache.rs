//! Global template cache.
//!
//! Using the cache ensures that templates are only compiled once.
//! It's controlled by `cache_templates` in the configuration and is off by default,
//! so template edits show up without a restart.
//!
//! [`Template::load`] uses the template cache automatically.
use super::{template::Error, Template};
use crate::config::get_config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};

static TEMPLATES: Lazy<Mutex<Templates>> = Lazy::new(|| Mutex::new(Templates::new()));

/// Templates cache.
#[derive(Default)]
pub struct Templates {
    templates: HashMap<PathBuf, Arc<Template>>,
}

impl Templates {
    /// Create new empty template cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a template from the cache. If the template isn't there, it's read
    /// from disk and compiled.
    pub fn get(&mut self, path: impl AsRef<Path>) -> Result<Arc<Template>, Error> {
        let path = path.as_ref();

        if let Some(template) = self.templates.get(path) {
            return Ok(template.clone());
        }

        let template = Arc::new(Template::new(path)?);

        if get_config().general.cache_templates {
            self.templates.insert(path.to_owned(), template.clone());
        }

        Ok(template)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Obtain a lock to the global template cache.
    pub fn cache() -> MutexGuard<'static, Templates> {
        TEMPLATES.lock()
    }
}
