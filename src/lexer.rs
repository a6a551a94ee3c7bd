pub use logos::Span;
use logos::{Lexer, Logos};

use crate::value::Integer;

fn process_string(lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    let mut string = String::new();

    // skip the opening quote
    let mut chars = lexer.slice().chars().skip(1).peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('t') => string.push('\t'),
                Some('n') => string.push('\n'),
                Some('r') => string.push('\r'),
                Some('\\') => string.push('\\'),
                Some('"') => string.push('"'),
                _ => Err(LexerError::MalformedString)?,
            },
            c => string.push(c),
        }
    }

    Ok(Box::from(string.as_str()))
}

fn unterminated_string(_lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    Err(LexerError::UnterminatedString)
}

fn read_integer(lexer: &mut Lexer<Token>) -> Result<Integer, LexerError> {
    // the regex only admits an optional sign followed by digits, so the only
    // way this can fail is by not fitting
    lexer
        .slice()
        .parse::<Integer>()
        .map_err(|_| LexerError::IntegerTooBig(Box::from(lexer.slice())))
}

#[derive(thiserror::Error, Debug, PartialEq, Clone, Default)]
pub enum LexerError {
    #[default]
    #[error("invalid token encountered")]
    Invalid,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("malformed string")]
    MalformedString,
    #[error("integer literal too big: {0}")]
    IntegerTooBig(Box<str>),
}

/// Tokens are lexed from some source
#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(error = LexerError)]
pub enum Token {
    #[regex("[ \t]+")]
    IntralineWhitespace,
    #[token("\n")]
    #[token("\r\n")]
    #[token("\r")]
    LineEnding,
    #[regex(r";[^\n]*")]
    Comment,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r#"[a-zA-Z!$%&*/:<=>?^_~][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*"#, |l| Box::from(l.slice()))]
    #[token("+", |l| Box::from(l.slice()))]
    #[token("-", |l| Box::from(l.slice()))]
    #[token("...", |l| Box::from(l.slice()))]
    #[regex(r"[-+][a-zA-Z!$%&*/:<=>?^_~+\-@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    Identifier(Box<str>),
    #[regex(r#""([^\\"]|\\.)*""#, process_string)]
    // the longest match wins, so this only fires when the closing quote is missing
    #[regex(r#""([^\\"]|\\.)*"#, unterminated_string)]
    String(Box<str>),
    #[regex(r"[+-]?[0-9]+", read_integer)]
    Integer(Integer),
}

impl Token {
    pub fn lexer(source: &str) -> Lexer<Self> {
        <Self as Logos>::lexer(source)
    }

    /// Whitespace, line endings and comments carry no meaning for the reader
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Self::IntralineWhitespace | Self::LineEnding | Self::Comment
        )
    }
}
