use super::{
    super::{Context, Error, Template, Token, TokenWithContext, Tokenize, Value},
    deeper,
    expression::expect,
    Expression,
};
use std::collections::HashMap;
use std::iter::{Iterator, Peekable};
use std::path::Path;

/// Templates including templates including templates stop here.
pub const MAX_INCLUDE_DEPTH: usize = 16;

macro_rules! block_end {
    ($iter:expr) => {
        expect($iter, Token::BlockEnd, "block")?
    };
}

#[derive(Debug, Clone)]
pub enum Statement {
    // e.g. `{{ variable }}`
    Print(Expression),
    // e.g. `<html><body></body></html>`
    PrintText(String),
    // e.g. `{% if variable == 5 %}right{% else %}wrong{% endif %}`
    If {
        expression: Expression,
        if_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },

    // `{% for k, v in config.items() %}{{ k }}={{ v }}{% else %}empty{% endfor %}`
    For {
        variables: Vec<String>,
        list: Expression,
        body: Vec<Statement>,
        else_body: Vec<Statement>,
    },

    // `{% set name = "Andre" %}`
    Set {
        name: String,
        expression: Expression,
    },

    // `{% include "header.html" %}`
    Include(Expression),

    // Markers closing the bodies above. They never make it into a program.
    ElseIf {
        expression: Expression,
        token: TokenWithContext,
    },
    Else(TokenWithContext),
    EndIf(TokenWithContext),
    EndFor(TokenWithContext),
}

impl Statement {
    pub fn from_str(string: &str) -> Result<Self, Error> {
        let tokens = string.tokenize()?;
        Statement::parse(&mut tokens.into_iter().peekable())
    }

    /// Execute the statement. `set` writes into the context.
    pub fn evaluate(&self, context: &mut Context) -> Result<String, Error> {
        match self {
            Statement::PrintText(text) => Ok(text.clone()),

            Statement::Print(expression) => {
                Ok(expression.evaluate(context)?.render(context.autoescape()))
            }

            Statement::If {
                expression,
                if_body,
                else_body,
            } => {
                if expression.evaluate(context)?.truthy() {
                    Self::evaluate_body(if_body, context)
                } else {
                    Self::evaluate_body(else_body, context)
                }
            }

            Statement::For {
                variables,
                list,
                body,
                else_body,
            } => {
                let items = match list.evaluate(context)? {
                    Value::List(list) => list,
                    Value::Hash(hash) => {
                        let mut keys = hash.into_keys().collect::<Vec<_>>();
                        keys.sort();
                        keys.into_iter().map(Value::String).collect()
                    }
                    Value::String(string) | Value::Markup(string) => string
                        .chars()
                        .map(|c| Value::String(c.to_string()))
                        .collect(),
                    Value::Null => vec![],
                    value => {
                        return Err(Error::Runtime(format!(
                            "'{}' object is not iterable",
                            value.type_name()
                        )))
                    }
                };

                if items.is_empty() {
                    return Self::evaluate_body(else_body, context);
                }

                // Loop variables don't leak out of the loop.
                let mut scope = context.clone();
                let mut result = String::new();
                let length = items.len();

                for (index, item) in items.into_iter().enumerate() {
                    Self::unpack(variables, item, &mut scope)?;
                    scope.set("loop", Self::loop_info(index, length))?;
                    result.push_str(&Self::evaluate_body(body, &mut scope)?);
                }

                Ok(result)
            }

            Statement::Set { name, expression } => {
                let value = expression.evaluate(context)?;
                context.set(name, value)?;
                Ok(String::new())
            }

            Statement::Include(expression) => {
                let name = expression.evaluate(context)?.to_string();

                if name.contains("..") || name.contains('\\') || Path::new(&name).is_absolute() {
                    return Err(Error::IncludeTraversal(name));
                }

                if context.depth() >= MAX_INCLUDE_DEPTH {
                    return Err(Error::IncludeDepth(MAX_INCLUDE_DEPTH));
                }

                let template = Template::load(&name)?;
                let mut scope = context.clone();
                scope.descend();

                template.render(&scope)
            }

            Statement::ElseIf { token, .. }
            | Statement::Else(token)
            | Statement::EndIf(token)
            | Statement::EndFor(token) => Err(Error::Syntax(token.clone())),
        }
    }

    fn evaluate_body(body: &[Statement], context: &mut Context) -> Result<String, Error> {
        let mut result = String::new();
        for statement in body {
            result.push_str(&statement.evaluate(context)?);
        }
        Ok(result)
    }

    // `{% for k, v in pairs %}` unpacks each item into the names.
    fn unpack(variables: &[String], item: Value, scope: &mut Context) -> Result<(), Error> {
        if let [name] = variables {
            scope.set(name, item)?;
            return Ok(());
        }

        let values = match item {
            Value::List(values) => values,
            value => {
                return Err(Error::Runtime(format!(
                    "cannot unpack non-iterable {} object",
                    value.type_name()
                )))
            }
        };

        if values.len() != variables.len() {
            return Err(Error::Runtime(format!(
                "expected {} values to unpack, got {}",
                variables.len(),
                values.len()
            )));
        }

        for (name, value) in variables.iter().zip(values) {
            scope.set(name, value)?;
        }

        Ok(())
    }

    fn loop_info(index: usize, length: usize) -> Value {
        let int = |n: usize| Value::Integer(n as i64);

        Value::Hash(HashMap::from([
            ("index".to_string(), int(index + 1)),
            ("index0".to_string(), int(index)),
            ("revindex".to_string(), int(length - index)),
            ("revindex0".to_string(), int(length - index - 1)),
            ("first".to_string(), Value::Boolean(index == 0)),
            ("last".to_string(), Value::Boolean(index + 1 == length)),
            ("length".to_string(), int(length)),
        ]))
    }

    /// Parse a single statement. Blocks like `if` and `for` consume
    /// everything up to and including their closing tag.
    pub fn parse(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
    ) -> Result<Statement, Error> {
        Self::parse_at(iter, 0)
    }

    // A statement inside `depth` blocks.
    fn parse_at(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<Statement, Error> {
        let next = iter.next().ok_or(Error::Eof("template"))?;

        match next.token() {
            Token::Text(text) => Ok(Statement::PrintText(text)),

            Token::PrintStart => {
                let (expression, _) = Expression::parse_at(iter, depth)?;
                expect(iter, Token::PrintEnd, "print")?;
                Ok(Statement::Print(expression))
            }

            Token::BlockStart => {
                let keyword = iter.next().ok_or(Error::Eof("block"))?;

                match keyword.token() {
                    Token::If => {
                        let (expression, _) = Expression::parse_at(iter, depth)?;
                        block_end!(iter);
                        Self::if_body(expression, iter, depth)
                    }

                    Token::ElseIf => {
                        let (expression, _) = Expression::parse_at(iter, depth)?;
                        block_end!(iter);
                        Ok(Statement::ElseIf {
                            expression,
                            token: keyword,
                        })
                    }

                    Token::Else => {
                        block_end!(iter);
                        Ok(Statement::Else(keyword))
                    }

                    Token::EndIf => {
                        block_end!(iter);
                        Ok(Statement::EndIf(keyword))
                    }

                    Token::EndFor => {
                        block_end!(iter);
                        Ok(Statement::EndFor(keyword))
                    }

                    Token::For => Self::for_loop(iter, depth),

                    Token::Set => {
                        let name = iter.next().ok_or(Error::Eof("set"))?;
                        let name = match name.token() {
                            Token::Variable(name) => name,
                            _ => return Err(Error::Syntax(name)),
                        };

                        expect(iter, Token::Assign, "set")?;
                        let (expression, _) = Expression::parse_at(iter, depth)?;
                        block_end!(iter);

                        Ok(Statement::Set { name, expression })
                    }

                    Token::Include => {
                        let (expression, _) = Expression::parse_at(iter, depth)?;
                        block_end!(iter);
                        Ok(Statement::Include(expression))
                    }

                    _ => Err(Error::Syntax(keyword)),
                }
            }

            _ => Err(Error::Syntax(next)),
        }
    }

    fn parse_in(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        block: &'static str,
        depth: usize,
    ) -> Result<Statement, Error> {
        if iter.peek().is_none() {
            Err(Error::Eof(block))
        } else {
            Self::parse_at(iter, depth)
        }
    }

    // if
    // elif
    // else
    // endif
    //
    // translates into this:
    //
    // if
    // else
    //   if
    //   else
    //   endif
    // endif
    fn if_body(
        expression: Expression,
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<Statement, Error> {
        let inner = deeper(depth)?;
        let mut if_body = vec![];

        loop {
            match Self::parse_in(iter, "if", inner)? {
                Statement::EndIf(_) => {
                    return Ok(Statement::If {
                        expression,
                        if_body,
                        else_body: vec![],
                    })
                }

                // The nested if consumes the closing tag.
                Statement::ElseIf {
                    expression: nested, ..
                } => {
                    let nested = Self::if_body(nested, iter, inner)?;
                    return Ok(Statement::If {
                        expression,
                        if_body,
                        else_body: vec![nested],
                    });
                }

                Statement::Else(_) => {
                    let else_body = Self::body_until_end(iter, "if", Token::EndIf, inner)?;
                    return Ok(Statement::If {
                        expression,
                        if_body,
                        else_body,
                    });
                }

                Statement::EndFor(token) => return Err(Error::WrongToken(token, Token::EndIf)),

                statement => if_body.push(statement),
            }
        }
    }

    fn for_loop(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        depth: usize,
    ) -> Result<Statement, Error> {
        let mut variables = vec![];

        loop {
            let name = iter.next().ok_or(Error::Eof("for"))?;
            match name.token() {
                Token::Variable(name) => variables.push(name),
                _ => return Err(Error::Syntax(name)),
            }

            let next = iter.next().ok_or(Error::Eof("for"))?;
            match next.token() {
                Token::Comma => continue,
                Token::In => break,
                _ => return Err(Error::WrongToken(next, Token::In)),
            }
        }

        let (list, _) = Expression::parse_at(iter, depth)?;
        block_end!(iter);

        let inner = deeper(depth)?;
        let mut body = vec![];

        loop {
            match Self::parse_in(iter, "for", inner)? {
                Statement::EndFor(_) => {
                    return Ok(Statement::For {
                        variables,
                        list,
                        body,
                        else_body: vec![],
                    })
                }

                Statement::Else(_) => {
                    let else_body = Self::body_until_end(iter, "for", Token::EndFor, inner)?;
                    return Ok(Statement::For {
                        variables,
                        list,
                        body,
                        else_body,
                    });
                }

                Statement::EndIf(token) | Statement::ElseIf { token, .. } => {
                    return Err(Error::WrongToken(token, Token::EndFor))
                }

                statement => body.push(statement),
            }
        }
    }

    // Everything after `else` up to the closing tag.
    fn body_until_end(
        iter: &mut Peekable<impl Iterator<Item = TokenWithContext>>,
        block: &'static str,
        end: Token,
        depth: usize,
    ) -> Result<Vec<Statement>, Error> {
        let mut body = vec![];

        loop {
            match Self::parse_in(iter, block, depth)? {
                Statement::EndIf(_) if end == Token::EndIf => return Ok(body),
                Statement::EndFor(_) if end == Token::EndFor => return Ok(body),
                Statement::EndIf(token)
                | Statement::EndFor(token)
                | Statement::Else(token)
                | Statement::ElseIf { token, .. } => return Err(Error::WrongToken(token, end)),
                statement => body.push(statement),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::MAX_DEPTH;
    use super::*;

    fn render(source: &str, context: &mut Context) -> Result<String, Error> {
        Statement::from_str(source)?.evaluate(context)
    }

    #[test]
    fn test_statements_basic() -> Result<(), Error> {
        let mut context = Context::default();
        context.set("variable", 5)?;

        let value = render(
            "{% if variable == 5 %}right{% else %}wrong{% endif %}",
            &mut context,
        )?;
        assert_eq!(value, "right");

        Ok(())
    }

    #[test]
    fn test_statements_if_elif_else() -> Result<(), Error> {
        let source = "{% if variable == 5 %}
                right
            {% elif variable == 6 %}
                six
            {% elif variable == 7 %}
                seven
            {% else %}
                neither
            {% endif %}";

        let mut context = Context::default();
        for (variable, expected) in [(5, "right"), (6, "six"), (7, "seven"), (8, "neither")] {
            context.set("variable", variable)?;
            assert_eq!(render(source, &mut context)?.trim(), expected);
        }

        Ok(())
    }

    #[test]
    fn test_print_expression() -> Result<(), Error> {
        let mut context = Context::default();
        context.set("variable", "<b>bold</b>")?;

        assert_eq!(
            render("{{ variable }}", &mut context)?,
            "&lt;b&gt;bold&lt;/b&gt;"
        );
        assert_eq!(render("{{ variable | safe }}", &mut context)?, "<b>bold</b>");
        assert_eq!(render("{{ none }}", &mut context)?, "");

        Ok(())
    }

    #[test]
    fn test_for_loop() -> Result<(), Error> {
        let mut context = Context::default();
        context.set("variable", "variable value")?;

        let result = render(
            r#"{% for a in [1, "hello", 3.45, variable] %}<li>{{ a }}</li>{% endfor %}"#,
            &mut context,
        )?;
        assert_eq!(
            result,
            "<li>1</li><li>hello</li><li>3.45</li><li>variable value</li>"
        );

        let result = render(
            "{% for i, v in ['a', 'b'] | enumerate %}{{ i }}{{ v }}{% if not loop.last %},{% endif %}{% endfor %}",
            &mut context,
        )?;
        assert_eq!(result, "0a,1b");

        let result = render(
            "{% for x in [] %}{{ x }}{% else %}empty{% endfor %}",
            &mut context,
        )?;
        assert_eq!(result, "empty");

        // Loop variables stay in the loop.
        let _ = render("{% for inner in [1] %}{% endfor %}", &mut context)?;
        assert!(context.get("inner").is_none());

        Ok(())
    }

    #[test]
    fn test_for_hash() -> Result<(), Error> {
        let mut context = Context::default();
        context.set(
            "config",
            serde_json::json!({"SECRET_KEY": "s3cr3t", "DEBUG": false}),
        )?;

        let result = render(
            "{% for k, v in config.items() %}{{ k }}={{ v }};{% endfor %}",
            &mut context,
        )?;
        assert_eq!(result, "DEBUG=False;SECRET_KEY=s3cr3t;");

        let result = render("{% for k in config %}{{ loop.index }}{{ k }} {% endfor %}", &mut context)?;
        assert_eq!(result, "1DEBUG 2SECRET_KEY ");

        Ok(())
    }

    #[test]
    fn test_set() -> Result<(), Error> {
        let mut context = Context::default();
        let result = render("{% set name = 'andre' | title %}", &mut context)?;
        assert_eq!(result, "");
        assert_eq!(context.get("name"), Some(Value::String("Andre".into())));

        Ok(())
    }

    #[test]
    fn test_include_rejects_traversal() -> Result<(), Error> {
        let mut context = Context::default();

        for source in [
            "{% include '../secret.html' %}",
            "{% include '/etc/passwd' %}",
            r"{% include 'a\\b.html' %}",
        ] {
            assert!(matches!(
                render(source, &mut context),
                Err(Error::IncludeTraversal(_))
            ));
        }

        Ok(())
    }

    #[test]
    fn test_nesting_limit() -> Result<(), Error> {
        let ifs = |n: usize| format!("{}x{}", "{% if 1 %}".repeat(n), "{% endif %}".repeat(n));
        assert_eq!(render(&ifs(30), &mut Context::default())?, "x");
        assert!(matches!(
            Statement::from_str(&ifs(70)),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        let fors = format!(
            "{}x{}",
            "{% for i in [1] %}".repeat(100),
            "{% endfor %}".repeat(100)
        );
        assert!(matches!(
            Statement::from_str(&fors),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        // Blocks and expressions share the limit.
        let mixed = format!(
            "{}{{{{ {}1{} }}}}{}",
            "{% if 1 %}".repeat(40),
            "(".repeat(40),
            ")".repeat(40),
            "{% endif %}".repeat(40)
        );
        assert!(matches!(
            Statement::from_str(&mixed),
            Err(Error::TooDeep(MAX_DEPTH))
        ));

        Ok(())
    }

    #[test]
    fn test_mismatched_blocks() {
        assert!(matches!(
            Statement::from_str("{% if a %}{% endfor %}"),
            Err(Error::WrongToken(_, Token::EndIf))
        ));
        assert!(matches!(
            Statement::from_str("{% for a in b %}{% endif %}"),
            Err(Error::WrongToken(_, Token::EndFor))
        ));
        assert!(matches!(
            Statement::from_str("{% if a %}"),
            Err(Error::Eof("if"))
        ));
        assert!(matches!(
            Statement::from_str("{% unless a %}"),
            Err(Error::Syntax(_))
        ));
    }
}
