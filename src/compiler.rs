//! Lower expression trees into flat bytecode.
//!
//! For example:
//!
//! (if c (val x 2) 3)
//!
//! compiles to
//!
//! 0000 LOAD_NAME c
//! 0001 RELATIVE_JUMP_IF_TRUE 2 ; -> 0004
//! 0002 LOAD_CONST 3
//! 0003 RELATIVE_JUMP 2 ; -> 0006
//! 0004 LOAD_CONST 2
//! 0005 STORE_NAME x
//!
//! Both branches are always compiled, only one of them runs.

pub mod bytecode;
pub mod special_forms;

use crate::{
    ast::{BinaryOperation, BinaryOperator, Expression},
    value::Integer,
};

use bytecode::{Code, Instruction, OpCode};
use special_forms::SpecialForm;

/// Lowering stops at the first malformed node, no partial code is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unsupported form: empty list")]
    EmptyList,
    #[error("unsupported form: list of {0} elements")]
    UnsupportedArity(usize),
    #[error("unsupported form: the head of a list must be an identifier")]
    HeadNotIdentifier,
    #[error("unsupported form: `{head}` with {arity} elements")]
    UnknownForm { head: Box<str>, arity: usize },
    #[error("unsupported form: `val` expects an identifier to bind")]
    BinderNotIdentifier,
    #[error("unsupported form: lambda abstraction")]
    Lambda,
    #[error("branch of {0} instructions is too large to jump over")]
    JumpTooLarge(usize),
}

/// Compile a single expression.
pub fn compile(expression: &Expression) -> Result<Code, CompileError> {
    Compiler.compile(expression)
}

/// Visits each expression kind, composing the bytecode of its children.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compiler;

impl Compiler {
    pub fn compile(&self, expression: &Expression) -> Result<Code, CompileError> {
        let code = Code::new(self.lower(expression)?);
        tracing::debug!(instructions = code.len(), "compiled expression");
        Ok(code)
    }

    fn lower(&self, expression: &Expression) -> Result<Vec<Instruction>, CompileError> {
        match expression {
            Expression::Constant(value) => Ok(vec![Instruction::load_const(*value)]),
            Expression::StringConstant(name) => Ok(vec![Instruction::load_name(name)]),
            Expression::BinaryOperation(operation) => self.lower_binary(operation),
            Expression::ExpressionList(items) => self.lower_list(items),
            Expression::Lambda(_) => Err(CompileError::Lambda),
        }
    }

    fn lower_binary(&self, operation: &BinaryOperation) -> Result<Vec<Instruction>, CompileError> {
        let mut ins = self.lower(&operation.lhs)?;
        ins.extend(self.lower(&operation.rhs)?);
        ins.push(Instruction::bare(match operation.operator {
            BinaryOperator::Add => OpCode::BinaryAdd,
            BinaryOperator::Subtract => OpCode::BinarySubtract,
            BinaryOperator::Multiply => OpCode::BinaryMultiply,
            BinaryOperator::Divide => OpCode::BinaryDivide,
        }));
        Ok(ins)
    }

    fn lower_list(&self, items: &[Expression]) -> Result<Vec<Instruction>, CompileError> {
        let Some(head) = items.first() else {
            return Err(CompileError::EmptyList);
        };
        if !matches!(items.len(), 3 | 4) {
            return Err(CompileError::UnsupportedArity(items.len()));
        }
        let Some(head) = head.as_identifier() else {
            return Err(CompileError::HeadNotIdentifier);
        };

        match (SpecialForm::check(items), items) {
            (Some(SpecialForm::Val), [_, name, expr]) => self.lower_binding(name, expr),
            (Some(SpecialForm::If), [_, cond, true_expr, false_expr]) => {
                self.lower_conditional(cond, true_expr, false_expr)
            }
            _ => Err(CompileError::UnknownForm {
                head: Box::from(head),
                arity: items.len(),
            }),
        }
    }

    // [...expr, STORE_NAME name]
    fn lower_binding(
        &self,
        name: &Expression,
        expr: &Expression,
    ) -> Result<Vec<Instruction>, CompileError> {
        let name = name
            .as_identifier()
            .ok_or(CompileError::BinderNotIdentifier)?;
        let mut ins = self.lower(expr)?;
        ins.push(Instruction::store_name(name));
        Ok(ins)
    }

    // [...cond, JUMP_IF_TRUE (len(false) + 1), ...false, JUMP len(true), ...true]
    fn lower_conditional(
        &self,
        cond: &Expression,
        true_expr: &Expression,
        false_expr: &Expression,
    ) -> Result<Vec<Instruction>, CompileError> {
        let cond_code = self.lower(cond)?;
        let true_code = self.lower(true_expr)?;
        let false_code = self.lower(false_expr)?;

        // the extra one skips the jump that ends the false branch
        let jmp_to_true = Instruction::relative_jump_if_true(jump_offset(false_code.len() + 1)?);
        let jmp_to_end = Instruction::relative_jump(jump_offset(true_code.len())?);

        let mut ins =
            Vec::with_capacity(cond_code.len() + false_code.len() + true_code.len() + 2);
        ins.extend(cond_code);
        ins.push(jmp_to_true);
        ins.extend(false_code);
        ins.push(jmp_to_end);
        ins.extend(true_code);
        Ok(ins)
    }
}

fn jump_offset(len: usize) -> Result<Integer, CompileError> {
    Integer::try_from(len).map_err(|_| CompileError::JumpTooLarge(len))
}
