pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod value;

pub use ast::{BinaryOperator, Expression};
pub use compiler::{
    bytecode::{Code, Instruction, OpCode},
    compile, CompileError, Compiler,
};
pub use parser::{parse, parse_expression, ParseError};
pub use runtime::{
    environment::{EnvError, EnvId, Environments},
    evaluate,
    interpreter::{Interpreter, InterpreterMode, Poll},
    RuntimeError,
};
pub use value::{Integer, Value, ValueKind};

/// Any failure along the source to value pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Parse `source`, then compile and evaluate each top-level expression in
/// order against `env`.
///
/// Returns the value of the last expression, or [`Value::Empty`] if there were none.
pub fn eval_source(source: &str, envs: &mut Environments, env: EnvId) -> Result<Value, Error> {
    let mut result = Value::Empty;
    for expression in parse(source)? {
        let code = compile(&expression)?;
        result = evaluate(&code, envs, env)?;
    }
    Ok(result)
}
