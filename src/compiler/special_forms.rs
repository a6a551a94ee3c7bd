use crate::ast::Expression;

/// Heads that give a list special meaning to the compiler.
///
/// Heads are ordinary identifiers matched by their text, so a variable named
/// `val` or `if` cannot be used in head position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    /// `(val <name> <expr>)`
    Val,
    /// `(if <cond> <true-expr> <false-expr>)`
    If,
}

impl SpecialForm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "val" => Some(Self::Val),
            "if" => Some(Self::If),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Val => "val",
            Self::If => "if",
        }
    }

    /// Number of list elements, head included
    pub fn arity(self) -> usize {
        match self {
            Self::Val => 3,
            Self::If => 4,
        }
    }

    pub(super) fn check(list: &[Expression]) -> Option<Self> {
        let form = Self::from_name(list.first()?.as_identifier()?)?;
        (form.arity() == list.len()).then_some(form)
    }
}
