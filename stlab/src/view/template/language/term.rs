//! Leaf of an expression: a literal or a variable lookup.
use super::super::{lexer::Value, Context};
use crate::view::template::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Constant(Value),
    Variable(String),
}

impl Term {
    pub fn constant(value: Value) -> Self {
        Term::Constant(value)
    }

    pub fn variable(name: String) -> Self {
        Term::Variable(name)
    }

    /// Evaluate the term. A variable missing from the context is `none`,
    /// which prints as nothing.
    pub fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        match self.lookup(context) {
            Err(Error::UndefinedVariable(_)) => Ok(Value::Null),
            result => result,
        }
    }

    /// Like [`Term::evaluate`], but a variable missing from the context is an error.
    pub fn lookup(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Term::Constant(value) => Ok(value.clone()),
            Term::Variable(name) => context
                .get(name)
                .ok_or_else(|| Error::UndefinedVariable(name.clone())),
        }
    }

    /// Name of the variable, if this is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            Term::Constant(_) => None,
        }
    }
}
