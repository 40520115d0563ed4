pub mod context;
pub mod error;
pub mod language;
pub mod lexer;

pub use context::Context;
pub use error::Error;
pub use lexer::{Lexer, ToTemplateValue, Token, TokenWithContext, Tokenize, Value};

use crate::config::get_config;
use crate::view::Templates;

use language::Program;

use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled template, ready to render.
#[derive(Clone, Debug)]
pub struct Template {
    program: Program,
    path: Option<PathBuf>,
    autoescape: bool,
}

impl Template {
    /// Read a template from disk and compile it. HTML and XML templates
    /// escape printed values.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let text = match read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Err(Error::TemplateDoesNotExist(path.to_owned())),
        };

        let autoescape = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("html" | "htm" | "xml" | "xhtml")
        );

        Ok(Template {
            program: Program::from_str(&text).map_err(|err| err.pretty(&text, Some(path)))?,
            path: Some(path.to_owned()),
            autoescape,
        })
    }

    /// Compile a template from a string. Printed values are escaped.
    pub fn from_str(template: &str) -> Result<Self, Error> {
        Ok(Template {
            program: Program::from_str(template).map_err(|err| err.pretty(template, None))?,
            path: None,
            autoescape: true,
        })
    }

    /// Render the template with the given variables.
    pub fn render(&self, context: impl TryInto<Context, Error = Error>) -> Result<String, Error> {
        let mut context: Context = context.try_into()?;
        context.set_autoescape(self.autoescape);

        self.program.evaluate(&mut context).map_err(|err| match self.path {
            Some(ref path) => err.pretty("", Some(path)),
            None => err,
        })
    }

    pub fn render_default(&self) -> Result<String, Error> {
        self.render(&Context::default())
    }

    /// Where the template was read from, if it came from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load a template from the templates directory, going through the template cache.
    pub fn load(name: impl AsRef<Path>) -> Result<Arc<Self>, Error> {
        let path = get_config().general.templates.join(name);
        Templates::cache().get(&path)
    }
}
