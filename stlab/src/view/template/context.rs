use crate::config::get_config;
use crate::controller::Session;
use crate::http::Request;
use crate::view::template::{Error, ToTemplateValue, Value};

use std::collections::HashMap;
use std::ops::Index;

/// Variables visible to a template while it's rendering.
#[derive(Debug, Clone)]
pub struct Context {
    values: HashMap<String, Value>,
    depth: usize,
    autoescape: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            depth: 0,
            autoescape: true,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// The globals every template gets: `config`, `request` and `session`.
    pub fn globals(request: &Request) -> Result<Self, Error> {
        let mut context = Self::new();
        context
            .set("config", get_config())?
            .set("request", request)?
            .set("session", &*request.session())?;

        Ok(context)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: impl ToTemplateValue) -> Result<&mut Self, Error> {
        self.values
            .insert(key.to_string(), value.to_template_value()?);
        Ok(self)
    }

    /// Merge other variables into this context, overriding existing ones.
    pub fn extend(&mut self, other: Context) -> &mut Self {
        self.values.extend(other.values);
        self
    }

    /// Escape HTML in printed values.
    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    pub(crate) fn set_autoescape(&mut self, autoescape: bool) {
        self.autoescape = autoescape;
    }

    /// How many includes deep the template rendering is.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn descend(&mut self) {
        self.depth += 1;
    }
}

impl TryFrom<HashMap<String, Value>> for Context {
    type Error = Error;

    fn try_from(values: HashMap<String, Value>) -> Result<Context, Self::Error> {
        Ok(Context {
            values,
            ..Default::default()
        })
    }
}

impl TryFrom<&Context> for Context {
    type Error = Error;

    fn try_from(context: &Context) -> Result<Context, Self::Error> {
        Ok(context.clone())
    }
}

impl<T: ToTemplateValue, const N: usize> TryFrom<[(&str, T); N]> for Context {
    type Error = Error;

    fn try_from(values: [(&str, T); N]) -> Result<Context, Self::Error> {
        let mut context = Context::new();
        for (key, value) in values {
            context.set(key, value)?;
        }

        Ok(context)
    }
}

impl Index<&str> for Context {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        self.values.get(key).unwrap_or(&Value::Null)
    }
}

/// `request` inside templates, shaped like Flask's.
impl ToTemplateValue for Request {
    fn to_template_value(&self) -> Result<Value, Error> {
        let cookies = self
            .cookies()
            .iter()
            .map(|cookie| {
                (
                    cookie.name().to_string(),
                    Value::String(cookie.value().to_string()),
                )
            })
            .collect::<HashMap<_, _>>();

        let headers = self
            .headers()
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect::<HashMap<_, _>>();

        let remote_addr = match self.peer() {
            Some(peer) => Value::String(peer.ip().to_string()),
            None => Value::Null,
        };

        Ok(Value::Hash(HashMap::from([
            ("method".to_string(), Value::String(self.method().to_string())),
            ("path".to_string(), Value::String(self.path().path().to_string())),
            ("args".to_string(), Value::from(&self.query().to_json())),
            (
                "form".to_string(),
                Value::from(&self.form_data().fields().to_json()),
            ),
            ("cookies".to_string(), Value::Hash(cookies)),
            ("headers".to_string(), Value::Hash(headers)),
            ("remote_addr".to_string(), remote_addr),
        ])))
    }
}

impl ToTemplateValue for Session {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::from(&self.to_json()))
    }
}
