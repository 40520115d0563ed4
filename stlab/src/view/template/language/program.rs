//! Executable template.
//!
//! A program is a list of statements.
use super::super::{Context, Error, TokenWithContext, Tokenize};
use super::Statement;

/// Executable program.
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Evaluate the program given the context. The context contains variable definitions
    /// and is updated by `set` statements.
    pub fn evaluate(&self, context: &mut Context) -> Result<String, Error> {
        let mut result = String::new();
        for statement in &self.statements {
            result.push_str(&statement.evaluate(context)?);
        }

        Ok(result)
    }

    /// Parse the program from a list of tokens.
    pub fn parse(tokens: Vec<TokenWithContext>) -> Result<Self, Error> {
        let mut iter = tokens.into_iter().peekable();
        let mut statements = vec![];

        while iter.peek().is_some() {
            match Statement::parse(&mut iter)? {
                // Closing tags without an opening one.
                Statement::ElseIf { token, .. }
                | Statement::Else(token)
                | Statement::EndIf(token)
                | Statement::EndFor(token) => return Err(Error::Syntax(token)),
                statement => statements.push(statement),
            }
        }

        Ok(Program { statements })
    }

    /// Compile the program from source.
    pub fn from_str(source: &str) -> Result<Self, Error> {
        let tokens = source.tokenize()?;
        Program::parse(tokens)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::view::template::Value;

    #[test]
    fn test_basic_program() -> Result<(), Error> {
        let program = Program::from_str(
            "<html><body>{% if 1 == 4 %}world is great{% else %}not so much{% endif %}</body></html>",
        )?;
        let output = program.evaluate(&mut Context::default())?;
        assert_eq!("<html><body>not so much</body></html>", output);
        Ok(())
    }

    #[test]
    fn test_set_then_print() -> Result<(), Error> {
        let program = Program::from_str(
            r#"{% set greeting = "Hello " ~ name %}<h1>{{ greeting }}!</h1>{# done #}"#,
        )?;
        let mut context = Context::new();
        context.set("name", "Andre")?;

        assert_eq!(program.evaluate(&mut context)?, "<h1>Hello Andre!</h1>");
        assert_eq!(
            context.get("greeting"),
            Some(Value::String("Hello Andre".into()))
        );

        Ok(())
    }

    #[test]
    fn test_stray_closing_tag() {
        assert!(matches!(
            Program::from_str("text{% endif %}"),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            Program::from_str("{% else %}"),
            Err(Error::Syntax(_))
        ));
    }
}
