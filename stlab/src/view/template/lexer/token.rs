use super::Value;

/// A template language token, e.g. `if` or `for`.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // e.g. `<html><body></body></html>`
    Text(String),
    // e.g. `{{ logged_in }}`
    Variable(String),
    // e.g. `{{ "hello world" }}` or `{{ 5 }}`
    Value(Value),
    // `{% if %}`
    If,
    // `{% elif %}`
    ElseIf,
    // `{% else %}`
    Else,
    EndIf,
    For,
    EndFor,
    In,
    NotIn,
    Set,
    Include,
    // `{%`
    BlockStart,
    // `%}`
    BlockEnd,
    // `{{`
    PrintStart,
    // `}}`
    PrintEnd,
    Dot,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Mod,
    Div,
    FloorDiv,
    Mult,
    Tilde,
    Pipe,
    Assign,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterEqualThan,
    LessThan,
    LessEqualThan,
    SquareBracketStart,
    SquareBracketEnd,
    Comma,
    RoundBracketStart,
    RoundBracketEnd,
}

impl Token {
    /// How many characters the token takes in the source, if it's known.
    pub fn len(&self) -> usize {
        match self {
            Token::Text(text) => text.chars().count(),
            Token::Variable(name) => name.chars().count(),
            Token::If | Token::In | Token::Or => 2,
            Token::For | Token::Set | Token::And | Token::Not => 3,
            Token::Else | Token::ElseIf => 4,
            Token::EndIf => 5,
            Token::EndFor | Token::NotIn => 6,
            Token::Include => 7,
            Token::BlockStart
            | Token::BlockEnd
            | Token::PrintStart
            | Token::PrintEnd
            | Token::FloorDiv
            | Token::Equals
            | Token::NotEquals
            | Token::GreaterEqualThan
            | Token::LessEqualThan => 2,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let symbol = match self {
            Token::Text(text) => return write!(f, "{}", text),
            Token::Variable(name) => return write!(f, "{}", name),
            Token::Value(value) => return write!(f, "{}", value.repr()),
            Token::If => "if",
            Token::ElseIf => "elif",
            Token::Else => "else",
            Token::EndIf => "endif",
            Token::For => "for",
            Token::EndFor => "endfor",
            Token::In => "in",
            Token::NotIn => "not in",
            Token::Set => "set",
            Token::Include => "include",
            Token::BlockStart => "{%",
            Token::BlockEnd => "%}",
            Token::PrintStart => "{{",
            Token::PrintEnd => "}}",
            Token::Dot => ".",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Mod => "%",
            Token::Div => "/",
            Token::FloorDiv => "//",
            Token::Mult => "*",
            Token::Tilde => "~",
            Token::Pipe => "|",
            Token::Assign => "=",
            Token::Equals => "==",
            Token::NotEquals => "!=",
            Token::GreaterThan => ">",
            Token::GreaterEqualThan => ">=",
            Token::LessThan => "<",
            Token::LessEqualThan => "<=",
            Token::SquareBracketStart => "[",
            Token::SquareBracketEnd => "]",
            Token::Comma => ",",
            Token::RoundBracketStart => "(",
            Token::RoundBracketEnd => ")",
        };

        write!(f, "{}", symbol)
    }
}
