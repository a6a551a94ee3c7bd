//! The instruction set shared by the compiler and the interpreter.
use core::{fmt, ops::Deref};

use crate::value::{Integer, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// push the payload
    LoadConst,
    /// push the value bound to the payload name
    LoadName,
    /// pop a value and bind it to the payload name in the current environment
    StoreName,
    /// add the payload to the program counter
    RelativeJump,
    /// pop a condition, and if it is nonzero add the payload to the program counter
    RelativeJumpIfTrue,
    // pop rhs, pop lhs, push the result
    BinaryAdd,
    BinarySubtract,
    BinaryMultiply,
    BinaryDivide,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::LoadConst => "LOAD_CONST",
            Self::LoadName => "LOAD_NAME",
            Self::StoreName => "STORE_NAME",
            Self::RelativeJump => "RELATIVE_JUMP",
            Self::RelativeJumpIfTrue => "RELATIVE_JUMP_IF_TRUE",
            Self::BinaryAdd => "BINARY_ADD",
            Self::BinarySubtract => "BINARY_SUBTRACT",
            Self::BinaryMultiply => "BINARY_MULTIPLY",
            Self::BinaryDivide => "BINARY_DIVIDE",
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Self::RelativeJump | Self::RelativeJumpIfTrue)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// An opcode and its payload. What the payload means depends on the opcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub op: OpCode,
    pub arg: Value,
}

impl Instruction {
    pub fn new(op: OpCode, arg: Value) -> Self {
        Self { op, arg }
    }

    pub fn load_const(value: Integer) -> Self {
        Self::new(OpCode::LoadConst, Value::Integer(value))
    }

    pub fn load_name(name: impl AsRef<str>) -> Self {
        Self::new(OpCode::LoadName, Value::name(name))
    }

    pub fn store_name(name: impl AsRef<str>) -> Self {
        Self::new(OpCode::StoreName, Value::name(name))
    }

    pub fn relative_jump(offset: Integer) -> Self {
        Self::new(OpCode::RelativeJump, Value::Integer(offset))
    }

    pub fn relative_jump_if_true(offset: Integer) -> Self {
        Self::new(OpCode::RelativeJumpIfTrue, Value::Integer(offset))
    }

    /// An instruction without a payload
    pub fn bare(op: OpCode) -> Self {
        Self::new(op, Value::Empty)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Value::Empty => write!(f, "{}", self.op),
            arg => write!(f, "{} {arg}", self.op),
        }
    }
}

/// A compiled program. The index of an instruction is its address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Code(Box<[Instruction]>);

impl Code {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self(instructions.into_boxed_slice())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }
}

impl Deref for Code {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Disassembly listing, one instruction per line:
///
/// ```text
/// 0000 LOAD_CONST 1
/// 0001 RELATIVE_JUMP_IF_TRUE 2 ; -> 0004
/// 0002 LOAD_CONST 3
/// 0003 RELATIVE_JUMP 1 ; -> 0005
/// 0004 LOAD_CONST 2
/// ```
impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (address, instruction) in self.0.iter().enumerate() {
            if address > 0 {
                writeln!(f)?;
            }
            write!(f, "{address:04} {instruction}")?;
            if let (true, Value::Integer(offset)) = (instruction.op.is_jump(), &instruction.arg) {
                // jumps are relative to the instruction after the jump
                match i64::try_from(address + 1)
                    .ok()
                    .and_then(|next| next.checked_add(*offset))
                {
                    Some(target) => write!(f, " ; -> {target:04}")?,
                    None => write!(f, " ; -> ????")?,
                }
            }
        }
        Ok(())
    }
}
