//! Templates, the way Flask renders them.
//!
//! Templates use a Jinja-flavoured language: `{{ expression }}` prints, `{% if %}`, `{% for %}`,
//! `{% set %}` and `{% include %}` control the output and `{# #}` is a comment.
//!
//! # Example
//!
//! ```
//! # use stlab::view::*;
//! let template = Template::from_str("<h1>{{ title | upper }}</h1>").unwrap();
//! let mut context = Context::new();
//!
//! context.set("title", "Hello from stlab!").unwrap();
//!
//! let rendered = template.render(&context).unwrap();
//!
//! assert_eq!(rendered, "<h1>HELLO FROM STLAB!</h1>");
//! ```
pub mod cache;
pub mod template;

pub use cache::Templates;
pub use template::Context;
pub use template::Error;
pub use template::Template;

pub use template::{ToTemplateValue, Value};

use std::path::Path;

/// Render a template from the templates directory.
pub fn render_template(name: impl AsRef<Path>, context: &Context) -> Result<String, Error> {
    Template::load(name)?.render(context)
}

/// Compile and render a template from a string.
///
/// Whatever the string contains gets evaluated, so passing user input here
/// lets the user run template code with access to every variable in the context.
pub fn render_template_string(source: &str, context: &Context) -> Result<String, Error> {
    Template::from_str(source)?.render(context)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_template_string() -> Result<(), Error> {
        let mut context = Context::new();
        context.set("name", "Andre")?;

        assert_eq!(render_template_string("{{7*7}}", &context)?, "49");
        assert_eq!(render_template_string("{{ 7*'7' }}", &context)?, "7777777");
        assert_eq!(render_template_string("Hello {{ name }}", &context)?, "Hello Andre");
        assert_eq!(render_template_string("plain text", &context)?, "plain text");

        Ok(())
    }

    #[test]
    fn test_render_template_string_config() -> Result<(), Error> {
        let mut context = Context::new();
        context.set("config", serde_json::json!({"SECRET_KEY": "UNSAFE_SECRET"}))?;

        assert_eq!(
            render_template_string("{{ config.SECRET_KEY }}", &context)?,
            "UNSAFE_SECRET"
        );
        assert_eq!(
            render_template_string("{{ config }}", &context)?,
            "{&#39;SECRET_KEY&#39;: &#39;UNSAFE_SECRET&#39;}"
        );

        Ok(())
    }
}
