//! The basic building block of the template language: the value.
//! Integers, floats, strings, lists, hashes, etc. are all represented by [`Value`].
//!
//! Operations work across data types, e.g. multiplying a string by an integer
//! repeats it, like it does in Python and Jinja.
use std::cmp::Ordering;
use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};

use super::super::Error;
use crate::{capitalize, safe_html, title_case};

/// Largest list `range()` and `times` will produce.
pub const MAX_RANGE: i64 = 100_000;

/// Largest string or list (in bytes or elements) `*` will produce.
pub const MAX_REPEAT: usize = 16 * 1024 * 1024;

/// A template value, e.g. `5` or `"hello world"`.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    /// String that's safe to print in HTML without escaping.
    Markup(String),
    Boolean(bool),
    List(Vec<Value>),
    Hash(HashMap<String, Value>),
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;

        match (self, other) {
            (Integer(a), Integer(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => (*a as f64) == *b,
            (Float(a), Float(b)) => a == b,
            (String(a) | Markup(a), String(b) | Markup(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Hash(a), Hash(b)) => a == b,
            (Null, Null) => true,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Value::*;

        match (self, other) {
            (Integer(i1), Integer(i2)) => i1.partial_cmp(i2),
            (Integer(i1), Float(f2)) => (*i1 as f64).partial_cmp(f2),
            (Float(f1), Integer(i2)) => f1.partial_cmp(&(*i2 as f64)),
            (Float(f1), Float(f2)) => f1.partial_cmp(f2),
            (String(s1) | Markup(s1), String(s2) | Markup(s2)) => s1.partial_cmp(s2),
            (Boolean(b1), Boolean(b2)) => b1.partial_cmp(b2),
            (List(l1), List(l2)) => l1.partial_cmp(l2),
            _ => None,
        }
    }
}

/// What gets printed by `{{ value }}`.
///
/// Strings print as-is, containers print the way Python would print them,
/// and `null` prints nothing.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => {
                if fl.is_finite() && fl.fract() == 0.0 {
                    write!(f, "{:.1}", fl)
                } else {
                    write!(f, "{}", fl)
                }
            }
            Value::String(s) | Value::Markup(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.repr())?;
                }
                write!(f, "]")
            }
            Value::Hash(h) => {
                write!(f, "{{")?;
                for (i, (k, v)) in sorted(h).into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", quote(k), v.repr())?;
                }
                write!(f, "}}")
            }
            Value::Null => Ok(()),
        }
    }
}

impl Value {
    /// If the value, when evaluated in the context of an `if` statement
    /// would result in the `if` statement being executed.
    ///
    /// e.g. `{% if 5 %}five is true{% endif %}`
    /// would output "five is true" since `5` is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) | Value::Markup(s) => !s.is_empty(),
            Value::Null => false,
            Value::List(list) => !list.is_empty(),
            Value::Hash(hash) => !hash.is_empty(),
        }
    }

    /// The value as it appears inside a printed list or hash, e.g. `'hello'`.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) | Value::Markup(s) => quote(s),
            Value::Null => "None".into(),
            value => value.to_string(),
        }
    }

    /// Name of the type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Markup(_) => "markup",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::Null => "none",
        }
    }

    /// Is this a string that's safe to print without escaping?
    pub fn markup(&self) -> bool {
        matches!(self, Value::Markup(_))
    }

    /// Text printed by `{{ value }}`, escaped if the template is HTML.
    pub fn render(&self, autoescape: bool) -> String {
        match self {
            Value::Markup(markup) => markup.clone(),
            value if autoescape => safe_html(&value.to_string()),
            value => value.to_string(),
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        use Value::*;

        Ok(match (self, other) {
            (Integer(i1), Integer(i2)) => {
                Integer(i1.checked_add(*i2).ok_or_else(|| overflow("+"))?)
            }
            (Integer(i1), Float(f2)) => Float(*i1 as f64 + f2),
            (Float(f1), Integer(i2)) => Float(f1 + *i2 as f64),
            (Float(f1), Float(f2)) => Float(f1 + f2),
            (Markup(s1), Markup(s2)) => Markup(format!("{}{}", s1, s2)),
            (String(s1) | Markup(s1), String(s2) | Markup(s2)) => {
                String(format!("{}{}", s1, s2))
            }
            (String(s1), Integer(_) | Float(_)) => String(format!("{}{}", s1, other)),
            (Integer(_) | Float(_), String(s2)) => String(format!("{}{}", self, s2)),
            (List(l1), List(l2)) => {
                let mut list = l1.clone();
                list.extend(l2.iter().cloned());
                List(list)
            }
            (List(list), other) => {
                let mut list = list.clone();
                list.push(other.clone());
                List(list)
            }
            _ => return Err(unsupported("+", self, other)),
        })
    }

    pub fn sub(&self, other: &Self) -> Result<Self, Error> {
        use Value::*;

        Ok(match (self, other) {
            (Integer(i1), Integer(i2)) => {
                Integer(i1.checked_sub(*i2).ok_or_else(|| overflow("-"))?)
            }
            (Integer(i1), Float(f2)) => Float(*i1 as f64 - f2),
            (Float(f1), Integer(i2)) => Float(f1 - *i2 as f64),
            (Float(f1), Float(f2)) => Float(f1 - f2),
            (String(s1) | Markup(s1), String(s2) | Markup(s2)) => String(s1.replace(s2, "")),
            (List(list), other) => {
                let mut list = list.clone();
                list.retain(|v| v != other);
                List(list)
            }
            _ => return Err(unsupported("-", self, other)),
        })
    }

    pub fn mul(&self, other: &Self) -> Result<Self, Error> {
        use Value::*;

        Ok(match (self, other) {
            (Integer(i1), Integer(i2)) => {
                Integer(i1.checked_mul(*i2).ok_or_else(|| overflow("*"))?)
            }
            (Integer(i1), Float(f2)) => Float(*i1 as f64 * f2),
            (Float(f1), Integer(i2)) => Float(f1 * *i2 as f64),
            (Float(f1), Float(f2)) => Float(f1 * f2),
            (String(s1) | Markup(s1), Integer(i1)) | (Integer(i1), String(s1) | Markup(s1)) => {
                let times = repeat(s1.len(), *i1)?;
                String(s1.repeat(times))
            }
            (List(list), Integer(i1)) | (Integer(i1), List(list)) => {
                let times = repeat(list.len(), *i1)?;
                let mut new_list = Vec::with_capacity(list.len() * times);
                for _ in 0..times {
                    new_list.extend(list.iter().cloned());
                }
                List(new_list)
            }
            _ => return Err(unsupported("*", self, other)),
        })
    }

    /// True division, always a float: `7 / 2 == 3.5`.
    pub fn div(&self, other: &Self) -> Result<Self, Error> {
        let (a, b) = self.floats(other, "/")?;
        if b == 0.0 {
            return Err(Error::Runtime("division by zero".into()));
        }
        Ok(Value::Float(a / b))
    }

    /// Floor division, rounding towards negative infinity: `7 // 2 == 3`, `7 // -2 == -4`.
    pub fn floor_div(&self, other: &Self) -> Result<Self, Error> {
        match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => {
                Err(Error::Runtime("division by zero".into()))
            }
            (Value::Integer(a), Value::Integer(b)) => {
                let quotient = a.checked_div(*b).ok_or_else(|| overflow("//"))?;
                if a % b != 0 && (*a < 0) != (*b < 0) {
                    Ok(Value::Integer(quotient - 1))
                } else {
                    Ok(Value::Integer(quotient))
                }
            }
            _ => {
                let (a, b) = self.floats(other, "//")?;
                if b == 0.0 {
                    return Err(Error::Runtime("division by zero".into()));
                }
                Ok(Value::Float((a / b).floor()))
            }
        }
    }

    /// Modulo, with the sign of the divisor like in Python: `-7 % 3 == 2`.
    pub fn rem(&self, other: &Self) -> Result<Self, Error> {
        match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => Err(Error::Runtime("modulo by zero".into())),
            (Value::Integer(a), Value::Integer(b)) => {
                // Only `i64::MIN % -1` overflows, and that's 0.
                let remainder = a.checked_rem(*b).unwrap_or(0);
                if remainder != 0 && (remainder < 0) != (*b < 0) {
                    Ok(Value::Integer(remainder + b))
                } else {
                    Ok(Value::Integer(remainder))
                }
            }
            _ => {
                let (a, b) = self.floats(other, "%")?;
                if b == 0.0 {
                    return Err(Error::Runtime("modulo by zero".into()));
                }
                Ok(Value::Float(a - b * (a / b).floor()))
            }
        }
    }

    /// Is `self` in `other`? Lists check elements, strings check substrings, hashes check keys.
    pub fn contained_in(&self, other: &Self) -> Result<bool, Error> {
        Ok(match other {
            Value::List(list) => list.contains(self),
            Value::String(s) | Value::Markup(s) => s.contains(&self.to_string()),
            Value::Hash(hash) => hash.contains_key(&self.to_string()),
            Value::Null => false,
            _ => return Err(unsupported("in", self, other)),
        })
    }

    fn floats(&self, other: &Self, op: &'static str) -> Result<(f64, f64), Error> {
        match (self.as_float(), other.as_float()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(unsupported(op, self, other)),
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Access `value.name`: a hash key, a list index, or a method called without arguments.
    pub fn attribute(&self, name: &str) -> Result<Self, Error> {
        match self {
            Value::Hash(hash) => match hash.get(name) {
                Some(value) => Ok(value.clone()),
                None => match self.call(name, &[]) {
                    Err(Error::UnknownMethod(_, _)) => Ok(Value::Null),
                    result => result,
                },
            },

            Value::List(_) if name.parse::<i64>().is_ok() => self.index(&Value::String(name.into())),

            value => match value.call(name, &[]) {
                Err(Error::UnknownMethod(_, _)) => {
                    Err(Error::UndefinedVariable(format!("{}.{}", value.type_name(), name)))
                }
                result => result,
            },
        }
    }

    /// Access `value[index]`.
    pub fn index(&self, index: &Value) -> Result<Self, Error> {
        Ok(match (self, index) {
            (Value::Hash(hash), key) => hash.get(&key.to_string()).cloned().unwrap_or(Value::Null),

            (Value::List(list), index) => match position(index, list.len()) {
                Some(i) => list[i].clone(),
                None => Value::Null,
            },

            (Value::String(s) | Value::Markup(s), index) => {
                let chars = s.chars().collect::<Vec<_>>();
                match position(index, chars.len()) {
                    Some(i) => Value::String(chars[i].to_string()),
                    None => Value::Null,
                }
            }

            (value, _) => {
                return Err(Error::Runtime(format!(
                    "{} can't be indexed",
                    value.type_name()
                )))
            }
        })
    }

    /// Call a method or a filter on the value, e.g. `name.upper()` or `name | upper`.
    pub fn call(&self, method_name: &str, args: &[Value]) -> Result<Self, Error> {
        if let Some(value) = self.call_any(method_name, args)? {
            return Ok(value);
        }

        Ok(match self {
            Value::Integer(value) => match method_name {
                "abs" => Value::Integer(value.checked_abs().ok_or_else(|| overflow("abs"))?),
                "times" => {
                    let n = (*value).clamp(0, MAX_RANGE);
                    Value::List((0..n).map(Value::Integer).collect())
                }
                "round" => Value::Float(*value as f64),
                _ => return Err(Error::UnknownMethod(method_name.into(), "integer")),
            },

            Value::Float(value) => match method_name {
                "abs" => Value::Float(value.abs()),
                "ceil" => Value::Float(value.ceil()),
                "floor" => Value::Float(value.floor()),
                "round" => {
                    let precision = match args.first() {
                        Some(Value::Integer(p)) => *p,
                        _ => 0,
                    };
                    let factor = 10f64.powi(precision.clamp(0, 15) as i32);
                    Value::Float((value * factor).round() / factor)
                }
                _ => return Err(Error::UnknownMethod(method_name.into(), "float")),
            },

            Value::String(value) | Value::Markup(value) => {
                let markup = self.markup();
                let string = match method_name {
                    "upper" | "upcase" | "to_uppercase" => value.to_uppercase(),
                    "lower" | "downcase" | "to_lowercase" => value.to_lowercase(),
                    "title" => title_case(value),
                    "capitalize" => capitalize(&value.to_lowercase()),
                    "trim" | "strip" => value.trim().to_string(),
                    "replace" => match args {
                        [from, to, ..] => value.replace(&from.to_string(), &to.to_string()),
                        _ => return Err(arguments(method_name, 2)),
                    },
                    "reverse" => value.chars().rev().collect(),
                    "first" => value.chars().next().map(String::from).unwrap_or_default(),
                    "last" => value.chars().last().map(String::from).unwrap_or_default(),
                    "urlencode" => crate::http::urlencode(value),
                    "urldecode" => crate::http::urldecode(value),
                    "b64encode" => STANDARD.encode(value.as_bytes()),
                    "b64decode" => {
                        let bytes = crate::crypto::base64_decode_lenient(value)
                            .map_err(|err| Error::Runtime(err.to_string()))?;
                        String::from_utf8_lossy(&bytes).to_string()
                    }

                    "split" => {
                        let parts = match args.first() {
                            Some(separator) => value
                                .split(separator.to_string().as_str())
                                .map(|part| Value::String(part.into()))
                                .collect(),
                            None => value
                                .split_whitespace()
                                .map(|part| Value::String(part.into()))
                                .collect(),
                        };
                        return Ok(Value::List(parts));
                    }
                    "startswith" => match args {
                        [prefix, ..] => {
                            return Ok(Value::Boolean(value.starts_with(&prefix.to_string())))
                        }
                        _ => return Err(arguments(method_name, 1)),
                    },
                    "endswith" => match args {
                        [suffix, ..] => {
                            return Ok(Value::Boolean(value.ends_with(&suffix.to_string())))
                        }
                        _ => return Err(arguments(method_name, 1)),
                    },
                    "contains" => match args {
                        [needle, ..] => {
                            return Ok(Value::Boolean(value.contains(&needle.to_string())))
                        }
                        _ => return Err(arguments(method_name, 1)),
                    },
                    _ => return Err(Error::UnknownMethod(method_name.into(), "string")),
                };

                // Changing the case of markup doesn't make it unsafe.
                match method_name {
                    "upper" | "upcase" | "to_uppercase" | "lower" | "downcase"
                    | "to_lowercase" | "title" | "capitalize" | "trim" | "strip"
                        if markup =>
                    {
                        Value::Markup(string)
                    }
                    _ => Value::String(string),
                }
            }

            Value::List(list) => match method_name {
                "enumerate" => Value::List(
                    list.iter()
                        .enumerate()
                        .map(|(i, v)| Value::List(vec![Value::Integer(i as i64), v.clone()]))
                        .collect(),
                ),
                "reverse" | "rev" => Value::List(list.iter().rev().cloned().collect()),
                "first" => list.first().cloned().unwrap_or(Value::Null),
                "last" => list.last().cloned().unwrap_or(Value::Null),
                "contains" => match args {
                    [needle, ..] => Value::Boolean(list.contains(needle)),
                    _ => return Err(arguments(method_name, 1)),
                },
                "empty" => Value::Boolean(list.is_empty()),
                "join" => {
                    let separator = args.first().map(|s| s.to_string()).unwrap_or_default();
                    let joined = list
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(&separator);

                    if !list.is_empty() && list.iter().all(|v| v.markup()) {
                        Value::Markup(joined)
                    } else {
                        Value::String(joined)
                    }
                }
                "sort" => {
                    let mut list = list.clone();
                    list.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                    if let Some(Value::Boolean(true)) = args.first() {
                        list.reverse();
                    }
                    Value::List(list)
                }
                "unique" => {
                    let mut unique: Vec<Value> = vec![];
                    for value in list {
                        if !unique.contains(value) {
                            unique.push(value.clone());
                        }
                    }
                    Value::List(unique)
                }
                "sum" => {
                    let mut sum = Value::Integer(0);
                    for value in list {
                        sum = sum.add(value)?;
                    }
                    sum
                }
                _ => return Err(Error::UnknownMethod(method_name.into(), "list")),
            },

            Value::Hash(hash) => match method_name {
                "keys" => keys(hash),
                "values" => Value::List(sorted(hash).into_iter().map(|(_, v)| v.clone()).collect()),
                "items" | "iter" => Value::List(
                    sorted(hash)
                        .into_iter()
                        .map(|(k, v)| Value::List(vec![Value::String(k.clone()), v.clone()]))
                        .collect(),
                ),
                "get" => match args {
                    [key] => hash.get(&key.to_string()).cloned().unwrap_or(Value::Null),
                    [key, default, ..] => hash
                        .get(&key.to_string())
                        .cloned()
                        .unwrap_or_else(|| default.clone()),
                    _ => return Err(arguments(method_name, 1)),
                },
                "contains" => match args {
                    [key, ..] => Value::Boolean(hash.contains_key(&key.to_string())),
                    _ => return Err(arguments(method_name, 1)),
                },
                _ => return Err(Error::UnknownMethod(method_name.into(), "hash")),
            },

            Value::Boolean(_) | Value::Null => {
                return Err(Error::UnknownMethod(method_name.into(), self.type_name()))
            }
        })
    }

    // Filters that work on any value.
    fn call_any(&self, method_name: &str, args: &[Value]) -> Result<Option<Self>, Error> {
        Ok(Some(match method_name {
            "string" | "to_s" | "to_string" => match self {
                Value::Markup(_) => self.clone(),
                value => Value::String(value.to_string()),
            },

            "safe" => Value::Markup(self.to_string()),

            "escape" | "e" => match self {
                Value::Markup(_) => self.clone(),
                value => Value::Markup(safe_html(&value.to_string())),
            },

            "default" | "d" => {
                let fallback = args
                    .first()
                    .cloned()
                    .unwrap_or(Value::String(String::new()));
                let boolean = matches!(args.get(1), Some(value) if value.truthy());

                match self {
                    Value::Null => fallback,
                    value if boolean && !value.truthy() => fallback,
                    value => value.clone(),
                }
            }

            "length" | "count" | "len" => Value::Integer(match self {
                Value::String(s) | Value::Markup(s) => s.chars().count() as i64,
                Value::List(list) => list.len() as i64,
                Value::Hash(hash) => hash.len() as i64,
                Value::Null => 0,
                _ => return Ok(None),
            }),

            "list" => match self {
                Value::List(_) => self.clone(),
                Value::String(s) | Value::Markup(s) => {
                    Value::List(s.chars().map(|c| Value::String(c.to_string())).collect())
                }
                Value::Hash(hash) => keys(hash),
                _ => return Ok(None),
            },

            "int" | "to_i" | "to_integer" => {
                let default = args.first().cloned().unwrap_or(Value::Integer(0));
                match self {
                    Value::Integer(_) => self.clone(),
                    Value::Float(f) => Value::Integer(*f as i64),
                    Value::Boolean(b) => Value::Integer(*b as i64),
                    Value::String(s) | Value::Markup(s) => {
                        let s = s.trim();
                        match s.parse::<i64>() {
                            Ok(i) => Value::Integer(i),
                            Err(_) => match s.parse::<f64>() {
                                Ok(f) if f.is_finite() => Value::Integer(f as i64),
                                _ => default,
                            },
                        }
                    }
                    _ => default,
                }
            }

            "float" | "to_f" | "to_float" => {
                let default = args.first().cloned().unwrap_or(Value::Float(0.0));
                match self {
                    Value::Integer(i) => Value::Float(*i as f64),
                    Value::Float(_) => self.clone(),
                    Value::Boolean(b) => Value::Float(*b as i64 as f64),
                    Value::String(s) | Value::Markup(s) => match s.trim().parse::<f64>() {
                        Ok(f) => Value::Float(f),
                        Err(_) => default,
                    },
                    _ => default,
                }
            }

            "tojson" => {
                let json: serde_json::Value = self.clone().try_into()?;
                let json = serde_json::to_string(&json)?;
                // Safe to embed in HTML, including inside <script> tags.
                Value::Markup(
                    json.replace('<', "\\u003c")
                        .replace('>', "\\u003e")
                        .replace('&', "\\u0026")
                        .replace('\'', "\\u0027"),
                )
            }

            _ => return Ok(None),
        }))
    }

    pub fn to_vec(self) -> Vec<Value> {
        match self {
            Value::List(list) => list,
            value => vec![value],
        }
    }
}

// Python-style quoted string.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// Hash entries in key order, so output is stable.
fn sorted(hash: &HashMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries = hash.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn keys(hash: &HashMap<String, Value>) -> Value {
    Value::List(
        sorted(hash)
            .into_iter()
            .map(|(k, _)| Value::String(k.clone()))
            .collect(),
    )
}

// List position, counting from the end for negative indices.
fn position(index: &Value, len: usize) -> Option<usize> {
    let index = match index {
        Value::Integer(i) => *i,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };

    let index = if index < 0 { len as i64 + index } else { index };

    if index >= 0 && (index as usize) < len {
        Some(index as usize)
    } else {
        None
    }
}

// How many times to repeat a string or list, refusing results that won't fit in memory.
fn repeat(len: usize, times: i64) -> Result<usize, Error> {
    let times = times.max(0) as usize;
    if len.saturating_mul(times) > MAX_REPEAT {
        Err(Error::Runtime("result of repetition is too large".into()))
    } else {
        Ok(times)
    }
}

// Python integers don't overflow; these do, and fail instead of wrapping around.
fn overflow(op: &str) -> Error {
    Error::Runtime(format!("integer overflow in {}", op))
}

fn unsupported(op: &str, left: &Value, right: &Value) -> Error {
    Error::Runtime(format!(
        "unsupported operand types for {}: {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn arguments(method_name: &str, expected: usize) -> Error {
    Error::Runtime(format!(
        "\"{}\" expects {} argument(s)",
        method_name, expected
    ))
}

/// Convert a Rust type to a template value.
pub trait ToTemplateValue {
    fn to_template_value(&self) -> Result<Value, Error>;
}

impl<T: ToTemplateValue + ?Sized> ToTemplateValue for &T {
    fn to_template_value(&self) -> Result<Value, Error> {
        (**self).to_template_value()
    }
}

impl ToTemplateValue for str {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.to_string()))
    }
}

impl ToTemplateValue for String {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.clone()))
    }
}

macro_rules! impl_integer {
    ($ty:ty) => {
        impl ToTemplateValue for $ty {
            fn to_template_value(&self) -> Result<Value, Error> {
                Ok(Value::Integer(*self as i64))
            }
        }
    };
}

impl_integer!(i64);
impl_integer!(i32);
impl_integer!(i16);
impl_integer!(i8);
impl_integer!(u64); // Could very much overflow
impl_integer!(u32);
impl_integer!(u16);
impl_integer!(u8);
impl_integer!(usize);

impl ToTemplateValue for f64 {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::Float(*self))
    }
}

impl ToTemplateValue for f32 {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::Float(*self as f64))
    }
}

impl ToTemplateValue for bool {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::Boolean(*self))
    }
}

impl ToTemplateValue for time::OffsetDateTime {
    fn to_template_value(&self) -> Result<Value, Error> {
        let fmt = time::format_description::well_known::Rfc2822;
        Ok(Value::String(self.format(&fmt)?))
    }
}

impl<T: ToTemplateValue> ToTemplateValue for Option<T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        match self {
            Some(value) => value.to_template_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: ToTemplateValue> ToTemplateValue for [T] {
    fn to_template_value(&self) -> Result<Value, Error> {
        let mut list = vec![];
        for value in self.iter() {
            list.push(value.to_template_value()?);
        }
        Ok(Value::List(list))
    }
}

impl<T: ToTemplateValue> ToTemplateValue for Vec<T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        self.as_slice().to_template_value()
    }
}

impl<T: ToTemplateValue> ToTemplateValue for HashMap<String, T> {
    fn to_template_value(&self) -> Result<Value, Error> {
        let mut hash = HashMap::new();
        for (key, value) in self.iter() {
            hash.insert(key.clone(), value.to_template_value()?);
        }
        Ok(Value::Hash(hash))
    }
}

impl ToTemplateValue for Value {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(self.clone())
    }
}

impl ToTemplateValue for serde_json::Value {
    fn to_template_value(&self) -> Result<Value, Error> {
        Ok(Value::from(self))
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(list) => Value::List(list.iter().map(Value::from).collect()),
            Json::Object(map) => Value::Hash(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = Error;

    fn try_from(value: Value) -> Result<serde_json::Value, Self::Error> {
        use serde_json::value::Number;

        match value {
            Value::Integer(i) => Ok(serde_json::Value::Number(i.into())),
            Value::Float(f) => Ok(Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)),
            Value::String(s) | Value::Markup(s) => Ok(serde_json::Value::String(s)),
            Value::Boolean(b) => Ok(serde_json::Value::Bool(b)),
            Value::List(l) => {
                let mut list = vec![];
                for v in l {
                    list.push(v.try_into()?);
                }
                Ok(serde_json::Value::Array(list))
            }
            Value::Hash(h) => {
                let mut hash = serde_json::Map::new();
                for (k, v) in h {
                    hash.insert(k, v.try_into()?);
                }
                Ok(serde_json::Value::Object(hash))
            }
            Value::Null => Ok(serde_json::Value::Null),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic() -> Result<(), Error> {
        let seven = Value::Integer(7);
        assert_eq!(seven.mul(&Value::String("7".into()))?, Value::String("7777777".into()));
        assert_eq!(seven.mul(&seven)?, Value::Integer(49));
        assert_eq!(seven.div(&Value::Integer(2))?, Value::Float(3.5));
        assert_eq!(seven.floor_div(&Value::Integer(2))?, Value::Integer(3));
        assert_eq!(Value::Integer(-7).rem(&Value::Integer(3))?, Value::Integer(2));
        assert!(seven.div(&Value::Integer(0)).is_err());
        assert!(seven.floor_div(&Value::Integer(0)).is_err());
        assert!(Value::Boolean(true).mul(&Value::Null).is_err());

        // Rounding goes towards negative infinity, like in Python.
        assert_eq!(seven.floor_div(&Value::Integer(-2))?, Value::Integer(-4));
        assert_eq!(Value::Integer(-7).floor_div(&Value::Integer(2))?, Value::Integer(-4));
        assert_eq!(Value::Integer(-8).floor_div(&Value::Integer(-2))?, Value::Integer(4));
        assert_eq!(seven.rem(&Value::Integer(-3))?, Value::Integer(-2));
        assert_eq!(Value::Integer(-6).rem(&Value::Integer(3))?, Value::Integer(0));
        assert_eq!(Value::Integer(i64::MIN).rem(&Value::Integer(-1))?, Value::Integer(0));
        assert_eq!(Value::Integer(i64::MAX).rem(&Value::Integer(i64::MIN))?, Value::Integer(-1));

        assert_eq!(
            Value::String("where is the love".into()).sub(&Value::String("where is the ".into()))?,
            Value::String("love".into())
        );
        assert_eq!(
            Value::List(vec![Value::Integer(1)]).add(&Value::List(vec![Value::Integer(2)]))?,
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );

        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Boolean(true).to_string(), "True");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::List(vec![Value::String("it's".into()), Value::Null, Value::Integer(1)])
                .to_string(),
            r#"['it\'s', None, 1]"#
        );
        assert_eq!(
            Value::from(&json!({"user": "admin", "a": 1})).to_string(),
            "{'a': 1, 'user': 'admin'}"
        );
    }

    #[test]
    fn test_render_escapes() {
        let value = Value::String("<script>".into());
        assert_eq!(value.render(true), "&lt;script&gt;");
        assert_eq!(value.render(false), "<script>");
        assert_eq!(Value::Markup("<b>".into()).render(true), "<b>");
    }

    #[test]
    fn test_methods() -> Result<(), Error> {
        let name = Value::String("andre the giant".into());

        assert_eq!(name.call("upper", &[])?, Value::String("ANDRE THE GIANT".into()));
        assert_eq!(name.call("title", &[])?, Value::String("Andre The Giant".into()));
        assert_eq!(name.call("length", &[])?, Value::Integer(15));
        assert_eq!(
            name.call("split", &[])?.call("join", &[Value::String("-".into())])?,
            Value::String("andre-the-giant".into())
        );
        assert_eq!(
            Value::String("42".into()).call("int", &[])?,
            Value::Integer(42)
        );
        assert_eq!(
            Value::String("YWRtaW4".into()).call("b64decode", &[])?,
            Value::String("admin".into())
        );
        assert_eq!(
            Value::Null.call("default", &[Value::String("anonymous".into())])?,
            Value::String("anonymous".into())
        );
        assert_eq!(
            Value::Integer(3).call("times", &[])?,
            Value::List(vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)])
        );
        assert!(matches!(
            name.call("__class__", &[]),
            Err(Error::UnknownMethod(_, "string"))
        ));

        let json = Value::from(&json!({"user": "<admin>"})).call("tojson", &[])?;
        assert_eq!(json, Value::Markup(r#"{"user":"\u003cadmin\u003e"}"#.into()));

        Ok(())
    }

    #[test]
    fn test_attribute_and_index() -> Result<(), Error> {
        let hash = Value::from(&json!({"user": "visitor", "roles": ["a", "b"]}));

        assert_eq!(hash.attribute("user")?, Value::String("visitor".into()));
        assert_eq!(hash.attribute("missing")?, Value::Null);
        assert_eq!(
            hash.attribute("roles")?.index(&Value::Integer(-1))?,
            Value::String("b".into())
        );
        assert!(matches!(
            Value::String("x".into()).attribute("__class__"),
            Err(Error::UndefinedVariable(_))
        ));

        Ok(())
    }
}
