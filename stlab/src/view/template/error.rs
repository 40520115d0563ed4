use super::{Token, TokenWithContext};
use thiserror::Error;

use std::path::{Path, PathBuf};

#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error")]
    Syntax(TokenWithContext),

    #[error("expression syntax error")]
    ExpressionSyntax(TokenWithContext),

    #[error("expected token \"{1}\", but have token {0} instead")]
    WrongToken(TokenWithContext, Token),

    #[error("reached end of file while parsing {0}, did you forget a closing tag?")]
    Eof(&'static str),

    #[error("unexpected character '{0}' (line: {1}, column: {2})")]
    UnexpectedCharacter(char, usize, usize),

    #[error("invalid escape sequence \"{0}\" (line: {1}, column: {2})")]
    InvalidEscape(String, usize, usize),

    #[error("template is nested more than {0} levels deep")]
    TooDeep(usize),

    #[error("string is never closed (line: {0}, column: {1})")]
    UnterminatedString(usize, usize),

    #[error("'{0}' is undefined")]
    UndefinedVariable(String),

    #[error("method \"{0}\" is not defined for {1}")]
    UnknownMethod(String, &'static str),

    #[error("function \"{0}\" is not defined")]
    UnknownFunction(String),

    #[error("{0}")]
    Runtime(String),

    #[error("template \"{0}\" does not exist")]
    TemplateDoesNotExist(PathBuf),

    #[error("template \"{0}\" is outside of the templates directory")]
    IncludeTraversal(String),

    #[error("templates can't be included more than {0} levels deep")]
    IncludeDepth(usize),

    #[error("failed to format a timestamp correctly, error: \"{0}\"")]
    TimeFormatError(#[from] time::error::Format),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Pretty(String),
}

impl Error {
    /// Point at the offending token in the template source, e.g.
    ///
    /// ```text
    ///   |
    /// 1 | {{ 7 * }}
    ///   |        ^ expression syntax error
    /// ```
    pub fn pretty(self, source: &str, path: Option<&Path>) -> Self {
        let token = match self {
            Error::Syntax(ref token)
            | Error::ExpressionSyntax(ref token)
            | Error::WrongToken(ref token, _) => token,
            _ => {
                if let Some(path) = path {
                    let prefix = "---> ";
                    return Error::Pretty(format!(
                        "{}{}\n\n{}{}",
                        prefix,
                        path.display(),
                        " ".repeat(prefix.len()),
                        self
                    ));
                } else {
                    return self;
                }
            }
        };

        let error_msg = match self {
            Error::WrongToken(_, ref expected) => format!("expected \"{}\"", expected),
            ref error => error.to_string(),
        };

        // Lines and columns start at 1.
        let context = match source.lines().nth(token.line().max(1) - 1) {
            Some(context) => context,
            None => return self,
        };

        let underline = " ".repeat(token.column().max(1) - 1) + &format!("^ {}", error_msg);
        let line_number = format!("{} | ", token.line());
        let underline_offset = " ".repeat(token.line().to_string().len()) + " | ";

        let path = if let Some(path) = path {
            format!(
                "---> {}:{}:{}\n\n",
                path.display(),
                token.line(),
                token.column()
            )
        } else {
            "".to_string()
        };

        Error::Pretty(format!(
            "{}{}\n{}{}\n{}{}",
            path, underline_offset, line_number, context, underline_offset, underline
        ))
    }
}
