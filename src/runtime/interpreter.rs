use crate::{
    compiler::bytecode::{Code, Instruction, OpCode},
    value::{Integer, Value, ValueKind},
};

use super::{
    environment::{EnvId, Environments},
    Operand, RuntimeError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpreterMode {
    /// ready to start execution
    #[default]
    Ready,
    /// at least one instruction has run
    Running,
    /// run finished, result is ready
    Result,
    /// an instruction failed, the state is not to be trusted
    Faulted,
}

/// Outcome of a step-bounded [`Interpreter::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// the step budget ran out, call `run` again to resume
    Pending,
    Ready(Value),
}

/// A stack machine executing one [`Code`].
///
/// Its whole state is a program counter and an operand stack, so many
/// interpreters can share the same code as long as each gets its own
/// environment.
#[derive(Debug, Clone)]
pub struct Interpreter<'code> {
    mode: InterpreterMode,
    code: &'code Code,
    program_counter: usize,
    stack: Vec<Value>,
}

impl<'code> Interpreter<'code> {
    pub fn new(code: &'code Code) -> Self {
        Self {
            mode: InterpreterMode::Ready,
            code,
            program_counter: 0,
            stack: vec![],
        }
    }

    pub fn mode(&self) -> InterpreterMode {
        self.mode
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn is_finished(&self) -> bool {
        self.program_counter >= self.code.len()
    }

    /// Execute a single instruction. Does nothing once the program has finished.
    pub fn step(&mut self, envs: &mut Environments, env: EnvId) -> Result<(), RuntimeError> {
        match self.mode {
            InterpreterMode::Faulted => return Err(RuntimeError::Faulted),
            InterpreterMode::Result => return Ok(()),
            InterpreterMode::Ready | InterpreterMode::Running => {}
        }

        let code = self.code;
        let Some(instruction) = code.get(self.program_counter) else {
            self.mode = InterpreterMode::Result;
            return Ok(());
        };
        let address = self.program_counter;
        self.program_counter += 1;
        self.mode = InterpreterMode::Running;
        tracing::trace!(address, %instruction, "dispatch");

        if let Err(error) = self.dispatch(instruction, envs, env) {
            tracing::debug!(address, %error, "runtime fault");
            self.mode = InterpreterMode::Faulted;
            return Err(error);
        }
        if self.is_finished() {
            self.mode = InterpreterMode::Result;
        }
        Ok(())
    }

    /// Execute at most `steps` instructions. Can be called again after
    /// [`Poll::Pending`] to resume where it stopped.
    pub fn run(
        &mut self,
        envs: &mut Environments,
        env: EnvId,
        steps: u64,
    ) -> Result<Poll, RuntimeError> {
        if self.mode == InterpreterMode::Faulted {
            return Err(RuntimeError::Faulted);
        }
        for _ in 0..steps {
            if self.is_finished() {
                break;
            }
            self.step(envs, env)?;
        }
        if !self.is_finished() {
            return Ok(Poll::Pending);
        }
        self.mode = InterpreterMode::Result;
        Ok(Poll::Ready(self.result()))
    }

    /// Execute without any instruction budget.
    pub fn run_to_completion(
        &mut self,
        envs: &mut Environments,
        env: EnvId,
    ) -> Result<Value, RuntimeError> {
        while !self.is_finished() {
            self.step(envs, env)?;
        }
        if self.mode == InterpreterMode::Faulted {
            return Err(RuntimeError::Faulted);
        }
        self.mode = InterpreterMode::Result;
        Ok(self.result())
    }

    fn result(&self) -> Value {
        self.stack.last().cloned().unwrap_or_default()
    }

    fn dispatch(
        &mut self,
        instruction: &Instruction,
        envs: &mut Environments,
        env: EnvId,
    ) -> Result<(), RuntimeError> {
        let op = instruction.op;
        match op {
            OpCode::LoadConst => self.stack.push(instruction.arg.clone()),
            OpCode::LoadName => {
                let name = payload_name(instruction)?;
                let value = envs.lookup(env, name)?.clone();
                self.stack.push(value);
            }
            OpCode::StoreName => {
                let value = self.pop(op)?;
                let name = payload_name(instruction)?;
                expect_integer(op, Operand::Stack, &value)?;
                envs.define(env, name, value)?;
            }
            OpCode::RelativeJump => {
                let offset = expect_integer(op, Operand::Payload, &instruction.arg)?;
                self.jump(offset)?;
            }
            OpCode::RelativeJumpIfTrue => {
                let cond = self.pop(op)?;
                let cond = expect_integer(op, Operand::Stack, &cond)?;
                let offset = expect_integer(op, Operand::Payload, &instruction.arg)?;
                if cond != 0 {
                    self.jump(offset)?;
                }
            }
            OpCode::BinaryAdd => {
                self.binary(op, |lhs, rhs| lhs.checked_add(rhs).ok_or(RuntimeError::Overflow(op)))?
            }
            OpCode::BinarySubtract => {
                self.binary(op, |lhs, rhs| lhs.checked_sub(rhs).ok_or(RuntimeError::Overflow(op)))?
            }
            OpCode::BinaryMultiply => {
                self.binary(op, |lhs, rhs| lhs.checked_mul(rhs).ok_or(RuntimeError::Overflow(op)))?
            }
            OpCode::BinaryDivide => self.binary(op, |lhs, rhs| {
                if rhs == 0 {
                    Err(RuntimeError::DivisionByZero)
                } else {
                    lhs.checked_div(rhs).ok_or(RuntimeError::Overflow(op))
                }
            })?,
        }
        Ok(())
    }

    fn pop(&mut self, op: OpCode) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow(op))
    }

    fn binary(
        &mut self,
        op: OpCode,
        apply: impl FnOnce(Integer, Integer) -> Result<Integer, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop(op)?;
        let rhs = expect_integer(op, Operand::Stack, &rhs)?;
        let lhs = self.pop(op)?;
        let lhs = expect_integer(op, Operand::Stack, &lhs)?;
        self.stack.push(Value::Integer(apply(lhs, rhs)?));
        Ok(())
    }

    // offsets count from the instruction after the jump
    fn jump(&mut self, offset: Integer) -> Result<(), RuntimeError> {
        let address = self.program_counter - 1;
        self.program_counter = isize::try_from(offset)
            .ok()
            .and_then(|offset| self.program_counter.checked_add_signed(offset))
            .ok_or(RuntimeError::JumpOutOfRange { address, offset })?;
        Ok(())
    }
}

fn payload_name(instruction: &Instruction) -> Result<&str, RuntimeError> {
    instruction
        .arg
        .as_name()
        .ok_or_else(|| RuntimeError::TypeMismatch {
            op: instruction.op,
            operand: Operand::Payload,
            expected: ValueKind::Name,
            found: instruction.arg.kind(),
        })
}

fn expect_integer(op: OpCode, operand: Operand, value: &Value) -> Result<Integer, RuntimeError> {
    value.as_integer().ok_or_else(|| RuntimeError::TypeMismatch {
        op,
        operand,
        expected: ValueKind::Integer,
        found: value.kind(),
    })
}
