//! Representation of runtime values
use core::fmt;

use arbitrary::Arbitrary;

pub type Integer = i64;

/// Every operand stack slot and every instruction payload holds exactly one of these.
#[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Arbitrary)]
pub enum Value {
    Integer(Integer),
    // identifiers and operator names, never a first-class string
    Name(Box<str>),
    // produced when a program leaves nothing on the stack
    #[default]
    Empty,
}

/// The tag of a [`Value`], used when reporting mismatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Name,
    Empty,
}

impl Value {
    pub fn name(name: impl AsRef<str>) -> Self {
        Self::Name(Box::from(name.as_ref()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Name(_) => ValueKind::Name,
            Self::Empty => ValueKind::Empty,
        }
    }

    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Self::Integer(int) => Some(*int),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Name(name) => write!(f, "{name}"),
            Value::Empty => write!(f, "#<none>"),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Name => write!(f, "name"),
            ValueKind::Empty => write!(f, "empty"),
        }
    }
}
