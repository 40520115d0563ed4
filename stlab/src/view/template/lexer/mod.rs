//! Template lexer.
//!
//! Splits template source into text and code tokens. Code lives between `{{ }}` (print)
//! and `{% %}` (statements); `{# #}` comments are dropped entirely.
pub mod token;
pub mod value;

pub use token::Token;
pub use value::{ToTemplateValue, Value};

use super::Error;

use std::iter::Peekable;
use std::str::Chars;

/// Token with its position in the template source.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithContext {
    token: Token,
    line: usize,
    column: usize,
}

impl std::fmt::Display for TokenWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" (line: {}, column: {})",
            self.token, self.line, self.column
        )
    }
}

impl TokenWithContext {
    pub fn new(token: Token, line: usize, column: usize) -> Self {
        Self {
            token,
            line,
            column,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn token(&self) -> Token {
        self.token.clone()
    }
}

/// The lexer converts a template text
/// into a list of tokens that may mean something
/// in our template language.
///
/// Anything that's not inside a code block is text that's printed as-is,
/// represented by [`Token::Text`].
pub struct Lexer<'a> {
    // Template source.
    source: Peekable<Chars<'a>>,
    // Resulting tokens.
    tokens: Vec<TokenWithContext>,
    // Buffer for multi-character tokens.
    buffer: String,
    // Where the buffered token started.
    buffer_start: (usize, usize),
    // Inside `{{ }}` or `{% %}`.
    code_block: bool,
    // Position of the next character.
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create new lexer from text input.
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.chars().peekable(),
            tokens: vec![],
            buffer: String::new(),
            buffer_start: (1, 1),
            code_block: false,
            line: 1,
            column: 1,
        }
    }

    /// Parse an input string into tokens supported by the template language.
    ///
    /// Input is processed one character at a time. Multi-character tokens like `if`
    /// or `endfor` are buffered and parsed as a string.
    pub fn tokens(mut self) -> Result<Vec<TokenWithContext>, Error> {
        loop {
            let position = (self.line, self.column);
            let c = match self.next_char() {
                Some(c) => c,
                None => break,
            };

            if self.code_block {
                self.code(c, position)?;
            } else {
                self.text(c, position)?;
            }
        }

        if self.code_block {
            return Err(Error::Eof("code block, did you forget to close it?"));
        }

        self.drain_buffer()?;

        // `not in` is a single operator.
        let mut tokens: Vec<TokenWithContext> = Vec::with_capacity(self.tokens.len());
        for token in self.tokens {
            if token.token == Token::In {
                if let Some(last) = tokens.last_mut() {
                    if last.token == Token::Not {
                        last.token = Token::NotIn;
                        continue;
                    }
                }
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn text(&mut self, c: char, position: (usize, usize)) -> Result<(), Error> {
        if c == '{' {
            match self.source.peek() {
                Some('{') => {
                    self.next_char();
                    self.drain_buffer()?;
                    self.add_token(Token::PrintStart, position);
                    self.code_block = true;
                    return Ok(());
                }

                Some('%') => {
                    self.next_char();
                    self.drain_buffer()?;
                    self.add_token(Token::BlockStart, position);
                    self.code_block = true;
                    return Ok(());
                }

                Some('#') => {
                    self.next_char();
                    self.drain_buffer()?;
                    return self.comment();
                }

                _ => (),
            }
        }

        self.push(c, position);
        Ok(())
    }

    fn comment(&mut self) -> Result<(), Error> {
        while let Some(c) = self.next_char() {
            if c == '#' && self.source.peek() == Some(&'}') {
                self.next_char();
                return Ok(());
            }
        }

        Err(Error::Eof("comment"))
    }

    fn code(&mut self, c: char, position: (usize, usize)) -> Result<(), Error> {
        let token = match c {
            ' ' | '\t' | '\r' | '\n' => {
                self.drain_buffer()?;
                return Ok(());
            }

            '}' => {
                if self.source.peek() == Some(&'}') {
                    self.next_char();
                    // The last word of the block, e.g. `x` in `{{x}}`, is still code.
                    self.drain_buffer()?;
                    self.code_block = false;
                    Token::PrintEnd
                } else {
                    return Err(Error::UnexpectedCharacter(c, position.0, position.1));
                }
            }

            '%' => {
                if self.source.peek() == Some(&'}') {
                    self.next_char();
                    self.drain_buffer()?;
                    self.code_block = false;
                    Token::BlockEnd
                } else {
                    Token::Mod
                }
            }

            '"' | '\'' => {
                self.drain_buffer()?;
                let string = self.string(c, position)?;
                self.add_token(Token::Value(Value::String(string)), position);
                return Ok(());
            }

            '.' => {
                // Decimal point, e.g. `1.5`.
                let number = !self.buffer.is_empty()
                    && self.buffer.chars().all(|c| c.is_ascii_digit())
                    && self.source.peek().map(|c| c.is_ascii_digit()) == Some(true);

                if number {
                    self.buffer.push('.');
                    return Ok(());
                } else {
                    Token::Dot
                }
            }

            '/' => self.either('/', Token::FloorDiv, Token::Div),
            '|' => self.either('|', Token::Or, Token::Pipe),
            '=' => self.either('=', Token::Equals, Token::Assign),
            '!' => self.either('=', Token::NotEquals, Token::Not),
            '<' => self.either('=', Token::LessEqualThan, Token::LessThan),
            '>' => self.either('=', Token::GreaterEqualThan, Token::GreaterThan),
            '&' => {
                if self.source.peek() == Some(&'&') {
                    self.next_char();
                    Token::And
                } else {
                    return Err(Error::UnexpectedCharacter(c, position.0, position.1));
                }
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Mult,
            '~' => Token::Tilde,
            ',' => Token::Comma,
            '[' => Token::SquareBracketStart,
            ']' => Token::SquareBracketEnd,
            '(' => Token::RoundBracketStart,
            ')' => Token::RoundBracketEnd,

            c if c.is_alphanumeric() || c == '_' => {
                self.push(c, position);
                return Ok(());
            }

            c => return Err(Error::UnexpectedCharacter(c, position.0, position.1)),
        };

        self.drain_buffer()?;
        self.add_token(token, position);

        Ok(())
    }

    // Two-character operator if the next character matches, one-character one otherwise.
    fn either(&mut self, next: char, double: Token, single: Token) -> Token {
        if self.source.peek() == Some(&next) {
            self.next_char();
            double
        } else {
            single
        }
    }

    fn string(&mut self, quote: char, position: (usize, usize)) -> Result<String, Error> {
        let mut string = String::new();

        loop {
            let at = (self.line, self.column);
            let c = match self.next_char() {
                Some(c) => c,
                None => break,
            };

            match c {
                c if c == quote => return Ok(string),

                '\\' => match self.next_char() {
                    Some('n') => string.push('\n'),
                    Some('t') => string.push('\t'),
                    Some('r') => string.push('\r'),
                    Some('0') => string.push('\0'),
                    Some('x') => string.push(self.escape('x', 2, at)?),
                    Some('u') => string.push(self.escape('u', 4, at)?),
                    Some(c) => {
                        // Unknown escapes are kept as-is, e.g. `\d`.
                        if c != '\\' && c != '\'' && c != '"' {
                            string.push('\\');
                        }
                        string.push(c);
                    }
                    None => break,
                },

                c => string.push(c),
            }
        }

        Err(Error::UnterminatedString(position.0, position.1))
    }

    // `\xNN` or `\uNNNN`, starting at the backslash.
    fn escape(&mut self, kind: char, digits: usize, at: (usize, usize)) -> Result<char, Error> {
        let mut hex = String::with_capacity(digits);
        for _ in 0..digits {
            match self.source.peek() {
                Some(&c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.next_char();
                }
                _ => return Err(Error::InvalidEscape(format!("\\{}{}", kind, hex), at.0, at.1)),
            }
        }

        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::InvalidEscape(format!("\\{}{}", kind, hex), at.0, at.1))
    }

    // Buffer a character of a multi-character token.
    fn push(&mut self, c: char, position: (usize, usize)) {
        if self.buffer.is_empty() {
            self.buffer_start = position;
        }
        self.buffer.push(c);
    }

    // Handle multi-character tokens.
    fn drain_buffer(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let s = std::mem::take(&mut self.buffer);
        let position = self.buffer_start;

        if !self.code_block {
            self.add_token(Token::Text(s), position);
            return Ok(());
        }

        let token = match s.as_str() {
            "if" => Token::If,
            "elif" => Token::ElseIf,
            "else" => Token::Else,
            "endif" => Token::EndIf,
            "for" => Token::For,
            "endfor" => Token::EndFor,
            "in" => Token::In,
            "set" => Token::Set,
            "include" => Token::Include,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            st => match st.to_lowercase().as_str() {
                "true" => Token::Value(Value::Boolean(true)),
                "false" => Token::Value(Value::Boolean(false)),
                "none" | "null" => Token::Value(Value::Null),
                _ => {
                    if st.starts_with(|c: char| c.is_ascii_digit()) {
                        if let Ok(integer) = st.parse::<i64>() {
                            Token::Value(Value::Integer(integer))
                        } else if let Ok(float) = st.parse::<f64>() {
                            Token::Value(Value::Float(float))
                        } else {
                            return Err(Error::Syntax(TokenWithContext::new(
                                Token::Variable(s),
                                position.0,
                                position.1,
                            )));
                        }
                    } else {
                        Token::Variable(s)
                    }
                }
            },
        };

        self.add_token(token, position);
        Ok(())
    }

    // Add token to output with its position.
    fn add_token(&mut self, token: Token, position: (usize, usize)) {
        self.tokens
            .push(TokenWithContext::new(token, position.0, position.1));
    }

    // Next character of the source, keeping track of lines and columns.
    fn next_char(&mut self) -> Option<char> {
        let c = self.source.next()?;

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }
}

/// Easily tokenize strings.
pub trait Tokenize {
    /// Parse a string and convert it to a list of tokens.
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error>;
}

impl Tokenize for &str {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        Lexer::new(self).tokens()
    }
}

impl Tokenize for String {
    fn tokenize(&self) -> Result<Vec<TokenWithContext>, Error> {
        Lexer::new(self).tokens()
    }
}
