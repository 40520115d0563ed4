//! Try template payloads without running a demo.
use serde_json::Value;
use stlab::config::get_config;
use stlab::view::{render_template_string, Context};

use crate::cookie::Error;

/// Parse `name=value`.
pub fn parse_var(var: &str) -> Result<(String, String), String> {
    match var.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got \"{}\"", var)),
    }
}

/// Render the template with `config` and the given variables.
///
/// Values that parse as JSON keep their type, so `n=5` is a number and
/// `user={"name":"andre"}` is a hash. Anything else is a string.
pub fn render(template: &str, vars: &[(String, String)]) -> Result<String, Error> {
    let mut context = Context::new();
    context.set("config", get_config())?;

    for (name, value) in vars {
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.clone()));
        context.set(name, value)?;
    }

    Ok(render_template_string(template, &context)?)
}
