use super::{
    super::lexer::{value::MAX_RANGE, Token, TokenWithContext, Tokenize, Value},
    super::Context,
    super::Error,
    deeper, Op, Term,
};

use std::collections::HashMap;
use std::iter::{Iterator, Peekable};

/// An expression, like `5 == 6` or `name | upper`,
/// which when evaluated produces a single value, e.g. `false`.
#[derive(Debug, Clone)]
pub enum Expression {
    // Standard `5 + 6`-style expression.
    // It's recursive, so you can have something like `(5 + 6) / (1 - 5)`.
    Binary {
        left: Box<Expression>,
        op: Op,
        right: Box<Expression>,
    },

    Unary {
        op: Op,
        operand: Box<Expression>,
    },

    // Base case for recursive expression parsing, which evaluates to the value
    // of the term, e.g. `5` evaluates to `5` or `variable_name` evaluates to whatever
    // the variable is set to in the context.
    Term {
        term: Term,
    },

    // A list of expressions, e.g. `[1, 2, variable, "hello world"]`.
    List {
        terms: Vec<Expression>,
    },

    // `user.name`
    Attribute {
        target: Box<Expression>,
        name: String,
    },

    // `user["name"]` or `list[0]`
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },

    // `name.upper()`
    Method {
        target: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },

    // `name | default("anonymous")`
    Filter {
        target: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },

    // Global function, e.g. `range(10)`.
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Create new constant expression (term).
    pub fn constant(value: Value) -> Self {
        Self::Term {
            term: Term::constant(value),
        }
    }

    /// Create new variable expression (term).
    pub fn variable(variable: String) -> Self {
        Self::Term {
            term: Term::variable(variable),
        }
    }

    /// Evaluate the expression to a value given the context.
    pub fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Expression::Term { term } => term.evaluate(context),

            Expression::Binary { left, op, right } => {
                let left = left.evaluate(context)?;

                // Short-circuit, returning the operand like Python does.
                match op {
                    Op::And if !left.truthy() => Ok(left),
                    Op::Or if left.truthy() => Ok(left),
                    Op::And | Op::Or => right.evaluate(context),
                    op => {
                        let right = right.evaluate(context)?;
                        op.evaluate_binary(&left, &right)
                    }
                }
            }

            Expression::Unary { op, operand } => {
                let operand = operand.evaluate(context)?;
                op.evaluate_unary(&operand)
            }

            Expression::List { terms } => Ok(Value::List(Self::evaluate_all(terms, context)?)),

            Expression::Attribute { target, name } => target.target(context)?.attribute(name),

            Expression::Index { target, index } => {
                let target = target.target(context)?;
                target.index(&index.evaluate(context)?)
            }

            Expression::Method { target, name, args } => {
                let target = target.target(context)?;
                target.call(name, &Self::evaluate_all(args, context)?)
            }

            Expression::Filter { target, name, args } => {
                let target = target.evaluate(context)?;
                target.call(name, &Self::evaluate_all(args, context)?)
            }

            Expression::Call { name, args } => {
                Self::global(name, &Self::evaluate_all(args, context)?)
            }
        }
    }

    // Undefined variables print as nothing, but `missing.name` is an error.
    fn target(&self, context: &Context) -> Result<Value, Error> {
        match self {
            Expression::Term { term } => term.lookup(context),
            expression => expression.evaluate(context),
        }
    }

    fn evaluate_all(expressions: &[Expression], context: &Context) -> Result<Vec<Value>, Error> {
        expressions
            .iter()
            .map(|expression| expression.evaluate(context))
            .collect()
    }

    // Functions available in every template.
    fn global(name: &str, args: &[Value]) -> Result<Value, Error> {
        match name {
            "range" => {
                let (start, stop, step) = match args {
                    [Value::Integer(stop)] => (0, *stop, 1),
                    [Value::Integer(start), Value::Integer(stop)] => (*start, *stop, 1),
                    [Value::Integer(start), Value::Integer(stop), Value::Integer(step)] => {
                        (*start, *stop, *step)
                    }
                    _ => {
                        return Err(Error::Runtime(
                            "range() expects one to three integers".into(),
                        ))
                    }
                };

                if step == 0 {
                    return Err(Error::Runtime("range() step must not be zero".into()));
                }

                let (start, stop, step) = (start as i128, stop as i128, step as i128);
                let len = if step > 0 {
                    (stop - start + step - 1) / step
                } else {
                    (start - stop - step - 1) / -step
                }
                .max(0);

                if len > MAX_RANGE as i128 {
                    return Err(Error::Runtime(format!(
                        "range() is too big, the limit is {} items",
                        MAX_RANGE
                    )));
                }

                Ok(Value::List(
                    (0..len)
                        .map(|i| Value::Integer((start + i * step) as i64))
                        .collect(),
                ))
            }

            "dict" => Ok(Value::Hash(HashMap::new())),

            name => Err(Error::UnknownFunction(name.to_string())),
        }
    }

    /// Recursively parse the expression.
    ///
    /// Consumes language tokens automatically, stopping at the first token
    /// that can't continue the expression, e.g. `}}`.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Self, Error> {
        Self::parse_at(iter, 0).map(|(expression, _)| expression)
    }

    /// Parse an expression that starts `depth` levels deep into the template.
    /// Returns the expression and the deepest level it reaches.
    pub(crate) fn parse_at(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        Self::binary(iter, 0, depth)
    }

    // Precedence climbing: consume operators that bind at least as tight as `min_precedence`.
    fn binary(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        min_precedence: u8,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        let (mut left, mut reached) = Self::unary(iter, depth)?;

        loop {
            let op = match iter.peek().and_then(|next| Op::from_token(next.token())) {
                Some(op) if op.precedence() >= min_precedence => op,
                _ => return Ok((left, reached)),
            };

            let _ = iter.next();
            let (right, right_reached) =
                Self::binary(iter, op.precedence() + 1, deeper(depth)?)?;

            // `1 + 2 + 3` is `(1 + 2) + 3`: every operator pushes the left side one level down.
            reached = deeper(reached)?.max(right_reached);
            left = Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn unary(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        let next = iter.peek().ok_or(Error::Eof("expression"))?;

        match next.token() {
            Token::Not => {
                let _ = iter.next();
                let (operand, reached) =
                    Self::binary(iter, Op::Not.precedence(), deeper(depth)?)?;

                Ok((
                    Expression::Unary {
                        op: Op::Not,
                        operand: Box::new(operand),
                    },
                    reached,
                ))
            }

            // Filters apply to the signed number: `-1 | abs` is `1`.
            Token::Minus | Token::Plus => {
                let (signed, reached) = Self::signed(iter, depth)?;
                Self::postfix(signed, reached, iter, true, depth)
            }

            _ => {
                let (primary, reached) = Self::primary(iter, depth)?;
                Self::postfix(primary, reached, iter, true, depth)
            }
        }
    }

    fn signed(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        let op = match iter.peek().map(|next| next.token()) {
            Some(Token::Minus) => Op::Sub,
            Some(Token::Plus) => Op::Add,
            _ => {
                let (primary, reached) = Self::primary(iter, depth)?;
                return Self::postfix(primary, reached, iter, false, depth);
            }
        };

        let _ = iter.next();
        let (operand, reached) = Self::signed(iter, deeper(depth)?)?;

        Ok((
            Expression::Unary {
                op,
                operand: Box::new(operand),
            },
            reached,
        ))
    }

    fn primary(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        let next = iter.next().ok_or(Error::Eof("expression"))?;

        match next.token() {
            Token::Value(value) => Ok((Self::constant(value), depth)),

            Token::Variable(name) => {
                if let Some(Token::RoundBracketStart) = iter.peek().map(|t| t.token()) {
                    let (args, reached) = Self::arguments(iter, depth)?;
                    Ok((Expression::Call { name, args }, reached))
                } else {
                    Ok((Self::variable(name), depth))
                }
            }

            Token::SquareBracketStart => {
                let mut terms = vec![];
                let mut reached = depth;

                loop {
                    if let Some(Token::SquareBracketEnd) = iter.peek().map(|t| t.token()) {
                        let _ = iter.next();
                        break;
                    }

                    let (term, term_reached) = Self::parse_at(iter, deeper(depth)?)?;
                    reached = reached.max(term_reached);
                    terms.push(term);

                    let next = iter.next().ok_or(Error::Eof("list"))?;
                    match next.token() {
                        Token::Comma => continue,
                        Token::SquareBracketEnd => break,
                        _ => return Err(Error::ExpressionSyntax(next)),
                    }
                }

                Ok((Expression::List { terms }, reached))
            }

            // Parentheses don't add a node, but parsing them recurses, so they count.
            Token::RoundBracketStart => {
                let expression = Self::parse_at(iter, deeper(depth)?)?;
                expect(iter, Token::RoundBracketEnd, "closing bracket")?;
                Ok(expression)
            }

            _ => Err(Error::ExpressionSyntax(next)),
        }
    }

    // Attribute access, indexing, method calls and filters, e.g. `request.form["input"] | upper`.
    fn postfix(
        mut expr: Self,
        mut reached: usize,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        filters: bool,
        depth: usize,
    ) -> Result<(Self, usize), Error> {
        loop {
            let accessor = iter.peek().map(|t| t.token());

            expr = match accessor {
                Some(Token::Dot) => {
                    let _ = iter.next();
                    let name = iter.next().ok_or(Error::Eof("attribute name"))?;
                    let name = match name.token() {
                        Token::Variable(name) => name,
                        Token::Value(Value::Integer(n)) => n.to_string(),
                        _ => return Err(Error::ExpressionSyntax(name)),
                    };

                    reached = deeper(reached)?;

                    if let Some(Token::RoundBracketStart) = iter.peek().map(|t| t.token()) {
                        let (args, args_reached) = Self::arguments(iter, depth)?;
                        reached = reached.max(args_reached);

                        Expression::Method {
                            target: Box::new(expr),
                            name,
                            args,
                        }
                    } else {
                        Expression::Attribute {
                            target: Box::new(expr),
                            name,
                        }
                    }
                }

                Some(Token::SquareBracketStart) => {
                    let _ = iter.next();
                    let (index, index_reached) = Self::parse_at(iter, deeper(depth)?)?;
                    expect(iter, Token::SquareBracketEnd, "closing bracket")?;
                    reached = deeper(reached)?.max(index_reached);

                    Expression::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    }
                }

                Some(Token::Pipe) if filters => {
                    let _ = iter.next();
                    let name = iter.next().ok_or(Error::Eof("filter name"))?;
                    let name = match name.token() {
                        Token::Variable(name) => name,
                        _ => return Err(Error::ExpressionSyntax(name)),
                    };

                    reached = deeper(reached)?;

                    let args = if let Some(Token::RoundBracketStart) = iter.peek().map(|t| t.token())
                    {
                        let (args, args_reached) = Self::arguments(iter, depth)?;
                        reached = reached.max(args_reached);
                        args
                    } else {
                        vec![]
                    };

                    Expression::Filter {
                        target: Box::new(expr),
                        name,
                        args,
                    }
                }

                _ => return Ok((expr, reached)),
            };
        }
    }

    // Function arguments between parenthesis, e.g. `("a", 1 + 2)`, and the deepest level they reach.
    fn arguments(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<(Vec<Self>, usize), Error> {
        expect(iter, Token::RoundBracketStart, "function arguments")?;
        let mut args = vec![];
        let mut reached = depth;

        if let Some(Token::RoundBracketEnd) = iter.peek().map(|t| t.token()) {
            let _ = iter.next();
            return Ok((args, reached));
        }

        loop {
            let (arg, arg_reached) = Self::parse_at(iter, deeper(depth)?)?;
            reached = reached.max(arg_reached);
            args.push(arg);

            let next = iter.next().ok_or(Error::Eof("function arguments"))?;
            match next.token() {
                Token::Comma => continue,
                Token::RoundBracketEnd => return Ok((args, reached)),
                _ => return Err(Error::ExpressionSyntax(next)),
            }
        }
    }
}

/// Consume the next token, making sure it's the expected one.
pub(crate) fn expect(
    iter: &mut impl Iterator<Item = TokenWithContext>,
    expected: Token,
    context: &'static str,
) -> Result<(), Error> {
    let next = iter.next().ok_or(Error::Eof(context))?;

    if next.token() != expected {
        Err(Error::WrongToken(next, expected))
    } else {
        Ok(())
    }
}

/// Evaluate a single print block, e.g. `{{ 1 + 2 }}`. Handy for testing expressions.
pub trait Evaluate {
    fn evaluate(&self, context: &Context) -> Result<Value, Error>;

    fn evaluate_default(&self) -> Result<Value, Error> {
        self.evaluate(&Context::default())
    }
}

impl Evaluate for &str {
    fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        let mut iter = self.tokenize()?.into_iter().peekable();
        expect(&mut iter, Token::PrintStart, "print block")?;
        let expr = Expression::parse(&mut iter)?;
        expect(&mut iter, Token::PrintEnd, "print block")?;
        expr.evaluate(context)
    }
}

impl Evaluate for String {
    fn evaluate(&self, context: &Context) -> Result<Value, Error> {
        self.as_str().evaluate(context)
    }
}

#[cfg(test)]
mod test {
    use super::super::MAX_DEPTH;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_math() -> Result<(), Error> {
        assert_eq!("{{7*7}}".evaluate_default()?, Value::Integer(49));
        assert_eq!("{{ 7*'7' }}".evaluate_default()?, Value::String("7777777".into()));
        assert_eq!("{{ 1 + 2 * 3 }}".evaluate_default()?, Value::Integer(7));
        assert_eq!("{{ (1 + 2) * 3 }}".evaluate_default()?, Value::Integer(9));
        assert_eq!("{{ 10 - 2 - 3 }}".evaluate_default()?, Value::Integer(5));
        assert_eq!("{{ 2 * 3 % 4 }}".evaluate_default()?, Value::Integer(2));
        assert_eq!("{{ 7 // 2 + 7 / 2 }}".evaluate_default()?, Value::Float(6.5));
        assert_eq!(
            "{{ ((1 + 2) + (-1 - -1)) * 5 + (25 - 5) }}".evaluate_default()?,
            Value::Integer(35)
        );
        assert_eq!("{{ -1 | abs }}".evaluate_default()?, Value::Integer(1));
        assert_eq!("{{ 7 // -2 }}".evaluate_default()?, Value::Integer(-4));
        assert_eq!("{{ -7 % 3 }}".evaluate_default()?, Value::Integer(2));
        assert_eq!("{{ 7 % -3 }}".evaluate_default()?, Value::Integer(-2));

        Ok(())
    }

    #[test]
    fn test_integer_overflow() {
        for expression in [
            "{{ 9223372036854775807 + 1 }}",
            "{{ -9223372036854775807 - 2 }}",
            "{{ 9223372036854775807 * 2 }}",
            "{{ (-9223372036854775807 - 1) // -1 }}",
            "{{ -(-9223372036854775807 - 1) }}",
            "{{ (-9223372036854775807 - 1) | abs }}",
        ] {
            match expression.evaluate_default() {
                Err(Error::Runtime(message)) => {
                    assert!(message.starts_with("integer overflow"), "{}", message)
                }
                other => panic!("{}: expected overflow, got {:?}", expression, other),
            }
        }
    }

    #[test]
    fn test_logic() -> Result<(), Error> {
        assert_eq!("{{ 1 == 2 }}".evaluate_default()?, Value::Boolean(false));
        assert_eq!(
            "{{ 1 < 2 and 3 > 4 or not 5 == 6 }}".evaluate_default()?,
            Value::Boolean(true)
        );
        assert_eq!("{{ not 1 == 1 }}".evaluate_default()?, Value::Boolean(false));
        assert_eq!("{{ 1 + 1 == 2 && !false }}".evaluate_default()?, Value::Boolean(true));
        assert_eq!("{{ 'a' in ['a', 'b'] }}".evaluate_default()?, Value::Boolean(true));
        assert_eq!("{{ 'z' not in 'abc' }}".evaluate_default()?, Value::Boolean(true));
        assert_eq!(
            "{{ missing or 'fallback' }}".evaluate_default()?,
            Value::String("fallback".into())
        );
        assert_eq!(
            "{{ none or 'fallback' }}".evaluate_default()?,
            Value::String("fallback".into())
        );

        Ok(())
    }

    #[test]
    fn test_concat() -> Result<(), Error> {
        assert_eq!(
            "{{ 'a' ~ 1 + 2 ~ 'b' }}".evaluate_default()?,
            Value::String("a3b".into())
        );
        Ok(())
    }

    #[test]
    fn test_accessors() -> Result<(), Error> {
        let mut context = Context::new();
        context.set(
            "config",
            json!({"SECRET_KEY": "UNSAFE_SECRET", "NAMES": ["a", "b"]}),
        )?;

        assert_eq!(
            "{{ config.SECRET_KEY }}".evaluate(&context)?,
            Value::String("UNSAFE_SECRET".into())
        );
        assert_eq!(
            "{{ config['SECRET_KEY'] }}".evaluate(&context)?,
            Value::String("UNSAFE_SECRET".into())
        );
        assert_eq!(
            "{{ config.get('MISSING', 'x') }}".evaluate(&context)?,
            Value::String("x".into())
        );
        assert_eq!("{{ config.NAMES.1 }}".evaluate(&context)?, Value::String("b".into()));
        assert_eq!(
            "{{ config.NAMES | join(', ') | upper }}".evaluate(&context)?,
            Value::String("A, B".into())
        );
        assert_eq!(
            "{{ config.items() | length }}".evaluate(&context)?,
            Value::Integer(2)
        );

        Ok(())
    }

    #[test]
    fn test_default() -> Result<(), Error> {
        assert_eq!(
            r#"{{ some_var | default("val") }}"#.evaluate_default()?,
            Value::String("val".into())
        );

        let mut context = Context::default();
        context.set("var", "set")?;
        assert_eq!(
            r#"{{ var | d("val") }}"#.evaluate(&context)?,
            Value::String("set".into())
        );

        assert!(matches!(
            "{{ some_var | upper }}".evaluate_default(),
            Err(Error::UnknownMethod(_, "none"))
        ));

        Ok(())
    }

    #[test]
    fn test_undefined() -> Result<(), Error> {
        assert_eq!("{{ name }}".evaluate_default()?, Value::Null);
        assert_eq!("{{ name == none }}".evaluate_default()?, Value::Boolean(true));
        assert_eq!("{{ name | length }}".evaluate_default()?, Value::Integer(0));

        for expression in ["{{ name.first }}", "{{ name[0] }}", "{{ name.upper() }}"] {
            match expression.evaluate_default() {
                Err(Error::UndefinedVariable(name)) => assert_eq!(name, "name"),
                other => panic!("{}: expected undefined variable, got {:?}", expression, other),
            }
        }

        Ok(())
    }

    #[test]
    fn test_globals() -> Result<(), Error> {
        assert_eq!(
            "{{ range(3) }}".evaluate_default()?,
            Value::List(vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(
            "{{ range(5, 0, -2) }}".evaluate_default()?,
            Value::List(vec![Value::Integer(5), Value::Integer(3), Value::Integer(1)])
        );
        assert!("{{ range(1000000000) }}".evaluate_default().is_err());
        assert_eq!("{{ dict() | length }}".evaluate_default()?, Value::Integer(0));
        assert!(matches!(
            "{{ lipsum() }}".evaluate_default(),
            Err(Error::UnknownFunction(_))
        ));

        Ok(())
    }

    #[test]
    fn test_python_payloads() {
        assert!(matches!(
            "{{ ''.__class__.__mro__[1].__subclasses__() }}".evaluate_default(),
            Err(Error::UndefinedVariable(_))
        ));
    }

    #[test]
    fn test_nesting_limit() -> Result<(), Error> {
        let parens = |n: usize| format!("{{{{ {}1{} }}}}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parens(30).evaluate_default()?, Value::Integer(1));
        assert!(matches!(
            parens(70).evaluate_default(),
            Err(Error::TooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            parens(100_000).evaluate_default(),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        // Long chains nest too: `1 + 1 + 1` is `(1 + 1) + 1`.
        let chain = |n: usize| format!("{{{{ 1{} }}}}", " + 1".repeat(n));
        assert_eq!(chain(50).evaluate_default()?, Value::Integer(51));
        assert!(matches!(
            chain(100).evaluate_default(),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        let signs = format!("{{{{ {}1 }}}}", "- ".repeat(1_000));
        assert!(matches!(signs.evaluate_default(), Err(Error::TooDeep(MAX_DEPTH))));

        let nots = format!("{{{{ {}true }}}}", "not ".repeat(1_000));
        assert!(matches!(nots.evaluate_default(), Err(Error::TooDeep(MAX_DEPTH))));

        let lists = format!("{{{{ {}{} }}}}", "[".repeat(100), "]".repeat(100));
        assert!(matches!(lists.evaluate_default(), Err(Error::TooDeep(MAX_DEPTH))));

        let attributes = format!("{{{{ config{} }}}}", ".a".repeat(100));
        assert!(matches!(
            attributes.evaluate_default(),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        Ok(())
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            "{{ 7 * }}".evaluate_default(),
            Err(Error::ExpressionSyntax(_))
        ));
        assert!(matches!(
            "{{ (1 + 2 }}".evaluate_default(),
            Err(Error::WrongToken(_, Token::RoundBracketEnd))
        ));
        assert!(matches!(
            "{{ 1 2 }}".evaluate_default(),
            Err(Error::WrongToken(_, Token::PrintEnd))
        ));
    }
}
