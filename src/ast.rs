//! Typed expression trees handed from the reader to the compiler.
use core::fmt;

use arbitrary::Arbitrary;

use crate::value::Integer;

/// Any node the reader can produce.
///
/// The set is closed: the compiler matches on it exhaustively, so adding a
/// variant forces a decision about how (or whether) it lowers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// An integer literal
    Constant(Integer),
    /// A bare identifier (string literals read as identifiers too)
    StringConstant(Box<str>),
    BinaryOperation(BinaryOperation),
    /// `(a b c ...)` that the reader did not recognize as anything more specific
    ExpressionList(Vec<Expression>),
    Lambda(Lambda),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOperation {
    pub operator: BinaryOperator,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub params: Vec<Box<str>>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

impl Expression {
    pub fn constant(value: Integer) -> Self {
        Self::Constant(value)
    }

    pub fn name(name: impl AsRef<str>) -> Self {
        Self::StringConstant(Box::from(name.as_ref()))
    }

    pub fn list(items: impl IntoIterator<Item = Expression>) -> Self {
        Self::ExpressionList(items.into_iter().collect())
    }

    pub fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::BinaryOperation(BinaryOperation {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn lambda(params: impl IntoIterator<Item = impl AsRef<str>>, body: Expression) -> Self {
        Self::Lambda(Lambda {
            params: params.into_iter().map(|p| Box::from(p.as_ref())).collect(),
            body: Box::new(body),
        })
    }

    /// The identifier this node names, if it is a bare identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::StringConstant(name) => Some(name),
            _ => None,
        }
    }
}

// Prints the expression back as source text
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(n) => write!(f, "{n}"),
            Expression::StringConstant(name) => write!(f, "{name}"),
            Expression::BinaryOperation(BinaryOperation { operator, lhs, rhs }) => {
                write!(f, "({} {lhs} {rhs})", operator.symbol())
            }
            Expression::ExpressionList(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Expression::Lambda(Lambda { params, body }) => {
                write!(f, "(lambda (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {body})")
            }
        }
    }
}
