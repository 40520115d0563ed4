//! Operations between values.
use super::super::lexer::{Token, Value};
use super::super::Error;

/// List of supported operations, e.g. addition, equality, etc.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Op {
    Not,
    And,
    Or,
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Concat,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
    In,
    NotIn,
}

impl Op {
    /// Convert a language token to a binary op. If the token
    /// isn't one, `None` is returned.
    pub fn from_token(token: Token) -> Option<Self> {
        Option::<Self>::from(token)
    }

    /// Evaluate the operation on a value.
    pub fn evaluate_unary(&self, value: &Value) -> Result<Value, Error> {
        match self {
            Op::Not => Ok(Value::Boolean(!value.truthy())),
            Op::Sub => match value {
                Value::Integer(integer) => integer
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::Runtime("integer overflow in unary -".into())),
                Value::Float(float) => Ok(Value::Float(-float)),
                value => Err(Error::Runtime(format!(
                    "bad operand type for unary -: {}",
                    value.type_name()
                ))),
            },
            Op::Add => Ok(value.clone()),
            op => Err(Error::Runtime(format!("{:?} is not a unary operator", op))),
        }
    }

    /// Combine two values into one using the operation.
    ///
    /// `and` and `or` short-circuit, so they are evaluated by the expression instead.
    pub fn evaluate_binary(&self, left: &Value, right: &Value) -> Result<Value, Error> {
        match self {
            Op::Equals => Ok(Value::Boolean(left == right)),
            Op::NotEquals => Ok(Value::Boolean(left != right)),
            Op::LessThan => Ok(Value::Boolean(left < right)),
            Op::LessEqualThan => Ok(Value::Boolean(left <= right)),
            Op::GreaterThan => Ok(Value::Boolean(left > right)),
            Op::GreaterEqualThan => Ok(Value::Boolean(left >= right)),
            Op::In => Ok(Value::Boolean(left.contained_in(right)?)),
            Op::NotIn => Ok(Value::Boolean(!left.contained_in(right)?)),
            Op::And => Ok(if left.truthy() { right.clone() } else { left.clone() }),
            Op::Or => Ok(if left.truthy() { left.clone() } else { right.clone() }),
            Op::Add => left.add(right),
            Op::Sub => left.sub(right),
            Op::Mult => left.mul(right),
            Op::Div => left.div(right),
            Op::FloorDiv => left.floor_div(right),
            Op::Mod => left.rem(right),
            Op::Concat => Ok(Value::String(format!("{}{}", left, right))),
            Op::Not => Err(Error::Runtime("not is a unary operator".into())),
        }
    }

    /// Operator precedence: the higher it is, the tighter the operator binds.
    pub fn precedence(&self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Not => 3,
            Op::Equals
            | Op::NotEquals
            | Op::GreaterThan
            | Op::GreaterEqualThan
            | Op::LessThan
            | Op::LessEqualThan
            | Op::In
            | Op::NotIn => 4,
            Op::Concat => 5,
            Op::Add | Op::Sub => 6,
            Op::Mult | Op::Div | Op::FloorDiv | Op::Mod => 7,
        }
    }
}

impl From<Token> for Option<Op> {
    fn from(token: Token) -> Option<Op> {
        Some(match token {
            Token::And => Op::And,
            Token::Or => Op::Or,
            Token::Equals => Op::Equals,
            Token::NotEquals => Op::NotEquals,
            Token::GreaterThan => Op::GreaterThan,
            Token::GreaterEqualThan => Op::GreaterEqualThan,
            Token::LessThan => Op::LessThan,
            Token::LessEqualThan => Op::LessEqualThan,
            Token::In => Op::In,
            Token::NotIn => Op::NotIn,
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            Token::Mult => Op::Mult,
            Token::Div => Op::Div,
            Token::FloorDiv => Op::FloorDiv,
            Token::Mod => Op::Mod,
            Token::Tilde => Op::Concat,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_precedence() {
        assert!(Op::Mult.precedence() > Op::Add.precedence());
        assert!(Op::Add.precedence() > Op::Concat.precedence());
        assert!(Op::Equals.precedence() > Op::And.precedence());
        assert!(Op::And.precedence() > Op::Or.precedence());
    }

    #[test]
    fn test_python_and_or() -> Result<(), Error> {
        let name = Value::String("andre".into());
        assert_eq!(Op::Or.evaluate_binary(&Value::Null, &name)?, name);
        assert_eq!(Op::And.evaluate_binary(&Value::Integer(0), &name)?, Value::Integer(0));
        assert_eq!(
            Op::NotIn.evaluate_binary(&Value::String("x".into()), &name)?,
            Value::Boolean(true)
        );
        Ok(())
    }
}
