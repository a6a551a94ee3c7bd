//! Reading picks up where the lexer dropped off: it handles nested lists and
//! turns them into typed [`Expression`] trees.
use logos::SpannedIter;

use crate::{
    ast::{BinaryOperator, Expression, Lambda},
    lexer::{LexerError, Span, Token},
};

/// Deepest list nesting the reader accepts. Reading and compiling both
/// recurse once per level.
pub const MAX_DEPTH: usize = 256;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{error}")]
    Lexer { error: LexerError, span: Span },
    #[error("unexpected end of input")]
    UnexpectedEof { span: Span },
    #[error("unexpected `)`")]
    UnbalancedParen { span: Span },
    #[error("malformed lambda: expected `(lambda <param> <body>)` or `(lambda (<param> ...) <body>)`")]
    MalformedLambda { span: Span },
    #[error("expected a single expression")]
    TrailingInput { span: Span },
    #[error("lists nested more than {MAX_DEPTH} deep")]
    TooDeep { span: Span },
}

impl ParseError {
    /// Location of the offending source text
    pub fn span(&self) -> Span {
        match self {
            Self::Lexer { span, .. }
            | Self::UnexpectedEof { span }
            | Self::UnbalancedParen { span }
            | Self::MalformedLambda { span }
            | Self::TrailingInput { span }
            | Self::TooDeep { span } => span.clone(),
        }
    }
}

/// Reads every top-level expression in `source`.
pub fn parse(source: &str) -> Result<Vec<Expression>, ParseError> {
    let mut parser = Parser::new(source);
    let mut expressions = vec![];
    while parser.peek()?.is_some() {
        expressions.push(parser.expression()?);
    }
    Ok(expressions)
}

/// Reads exactly one expression from `source`.
pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(source);
    let expression = parser.expression()?;
    match parser.next()? {
        None => Ok(expression),
        Some((_, span)) => Err(ParseError::TrailingInput { span }),
    }
}

struct Parser<'src> {
    tokens: SpannedIter<'src, Token>,
    peeked: Option<(Token, Span)>,
    eof: Span,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            tokens: Token::lexer(source).spanned(),
            peeked: None,
            eof: source.len()..source.len(),
            depth: 0,
        }
    }

    // next meaningful token, skipping trivia
    fn next(&mut self) -> Result<Option<(Token, Span)>, ParseError> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(Some(peeked));
        }
        for (token, span) in self.tokens.by_ref() {
            match token {
                Ok(token) if token.is_trivia() => continue,
                Ok(token) => return Ok(Some((token, span))),
                Err(error) => return Err(ParseError::Lexer { error, span }),
            }
        }
        Ok(None)
    }

    fn peek(&mut self) -> Result<Option<&(Token, Span)>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.next()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let Some((token, span)) = self.next()? else {
            return Err(ParseError::UnexpectedEof {
                span: self.eof.clone(),
            });
        };

        match token {
            Token::Integer(value) => Ok(Expression::Constant(value)),
            Token::Identifier(name) | Token::String(name) => Ok(Expression::StringConstant(name)),
            Token::LParen if self.depth >= MAX_DEPTH => Err(ParseError::TooDeep { span }),
            Token::LParen => {
                self.depth += 1;
                let list = self.list(span.start);
                self.depth -= 1;
                list
            }
            Token::RParen => Err(ParseError::UnbalancedParen { span }),
            Token::IntralineWhitespace | Token::LineEnding | Token::Comment => unreachable!(),
        }
    }

    // called after the opening paren has been consumed
    fn list(&mut self, start: usize) -> Result<Expression, ParseError> {
        let mut items = vec![];
        let end = loop {
            match self.peek()? {
                None => {
                    return Err(ParseError::UnexpectedEof {
                        span: self.eof.clone(),
                    })
                }
                Some((Token::RParen, span)) => {
                    let end = span.end;
                    self.peeked = None;
                    break end;
                }
                Some(_) => items.push(self.expression()?),
            }
        };
        let span = start..end;

        let head = items.first().and_then(Expression::as_identifier);
        let is_lambda = head == Some("lambda");
        let operator = head.and_then(BinaryOperator::from_symbol);

        if is_lambda {
            return read_lambda(items, span);
        }
        match (operator, <[Expression; 3]>::try_from(items)) {
            (Some(operator), Ok([_, lhs, rhs])) => Ok(Expression::binary(operator, lhs, rhs)),
            (_, Ok(items)) => Ok(Expression::ExpressionList(Vec::from(items))),
            (_, Err(items)) => Ok(Expression::ExpressionList(items)),
        }
    }
}

fn read_lambda(items: Vec<Expression>, span: Span) -> Result<Expression, ParseError> {
    let malformed = || ParseError::MalformedLambda { span: span.clone() };

    let mut items = items.into_iter().skip(1);
    let (Some(params), Some(body), None) = (items.next(), items.next(), items.next()) else {
        return Err(malformed());
    };

    let params = match params {
        Expression::StringConstant(param) => vec![param],
        Expression::ExpressionList(params) => params
            .into_iter()
            .map(|param| match param {
                Expression::StringConstant(param) => Ok(param),
                _ => Err(malformed()),
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(malformed()),
    };

    Ok(Expression::Lambda(Lambda {
        params,
        body: Box::new(body),
    }))
}
