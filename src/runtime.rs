//! Runtimes execute compiled [`Code`] against an environment.

use core::fmt;

use crate::{
    compiler::bytecode::{Code, OpCode},
    value::{Integer, Value, ValueKind},
};

pub mod environment;
pub mod interpreter;

use environment::{EnvError, EnvId, Environments};
use interpreter::Interpreter;

/// Runtime failures abort the evaluation in progress. The interpreter that
/// raised one refuses to continue.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Environment(#[from] EnvError),
    #[error("type mismatch: {op} expected {expected} {operand}, found {found}")]
    TypeMismatch {
        op: OpCode,
        operand: Operand,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("stack underflow in {0}")]
    StackUnderflow(OpCode),
    #[error("jump out of range: offset {offset} at {address:04}")]
    JumpOutOfRange { address: usize, offset: Integer },
    #[error("integer overflow in {0}")]
    Overflow(OpCode),
    #[error("division by zero")]
    DivisionByZero,
    #[error("interpreter already faulted")]
    Faulted,
}

/// Where a mistyped value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// the instruction's own payload
    Payload,
    /// a value popped off the operand stack
    Stack,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Payload => write!(f, "payload"),
            Operand::Stack => write!(f, "operand"),
        }
    }
}

/// Run `code` to completion against `env`.
///
/// Returns the value left on top of the operand stack, or [`Value::Empty`] if
/// the stack ends up empty.
#[tracing::instrument(level = "debug", skip_all, fields(instructions = code.len()))]
pub fn evaluate(code: &Code, envs: &mut Environments, env: EnvId) -> Result<Value, RuntimeError> {
    Interpreter::new(code).run_to_completion(envs, env)
}
