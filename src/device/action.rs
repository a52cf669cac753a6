//! Action instructions and the per-container ALU.
//!
//! Every (action set, container) pair has an instruction slot and an operand
//! slot. The instruction decides how the container's next value is formed
//! from other containers and the operand.
//!
//! # Instruction Word
//!
//! ```text
//! [23:16] src_b container
//! [15:8]  src_a container
//! [3:0]   opcode
//! ```
//!
//! Arithmetic wraps at 32 bits. The result is masked to the destination
//! container's width when it is written back.

use super::registers::RegisterError;
use super::registers_spec::instruction as fields;

/// ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AluOp {
    #[default]
    Nop = 0,
    /// dst = imm
    Set = 1,
    /// dst = a
    Copy = 2,
    /// dst = a + b
    Add = 3,
    /// dst = a - b
    Sub = 4,
    /// dst = a & b
    And = 5,
    /// dst = a | b
    Or = 6,
    /// dst = a ^ b
    Xor = 7,
    /// dst = a + imm
    AddImm = 8,
    /// dst = a << (imm & 31)
    ShiftLeft = 9,
    /// dst = a >> (imm & 31)
    ShiftRight = 10,
}

impl AluOp {
    fn from_bits(bits: u32) -> Option<Self> {
        Some(match bits {
            0 => AluOp::Nop,
            1 => AluOp::Set,
            2 => AluOp::Copy,
            3 => AluOp::Add,
            4 => AluOp::Sub,
            5 => AluOp::And,
            6 => AluOp::Or,
            7 => AluOp::Xor,
            8 => AluOp::AddImm,
            9 => AluOp::ShiftLeft,
            10 => AluOp::ShiftRight,
            _ => return None,
        })
    }

    /// True if the op reads source A.
    pub fn uses_a(&self) -> bool {
        !matches!(self, AluOp::Nop | AluOp::Set)
    }

    /// True if the op reads source B.
    pub fn uses_b(&self) -> bool {
        matches!(self, AluOp::Add | AluOp::Sub | AluOp::And | AluOp::Or | AluOp::Xor)
    }
}

/// Decoded action instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionInstruction {
    pub op: AluOp,
    pub src_a: usize,
    pub src_b: usize,
}

impl ActionInstruction {
    /// Build an instruction.
    pub fn new(op: AluOp, src_a: usize, src_b: usize) -> Self {
        Self { op, src_a, src_b }
    }

    /// Decode an instruction word. `containers` bounds the source fields
    /// of ops that read them.
    pub fn decode(word: u32, containers: usize) -> Result<Self, RegisterError> {
        let op = AluOp::from_bits(word & fields::OPCODE_MASK).ok_or_else(|| {
            RegisterError::InvalidInstruction {
                word,
                reason: format!("unknown opcode {}", word & fields::OPCODE_MASK),
            }
        })?;
        let src_a = ((word >> fields::SRC_A_SHIFT) & fields::SRC_MASK) as usize;
        let src_b = ((word >> fields::SRC_B_SHIFT) & fields::SRC_MASK) as usize;

        for (used, src) in [(op.uses_a(), src_a), (op.uses_b(), src_b)] {
            if used && src >= containers {
                return Err(RegisterError::InvalidInstruction {
                    word,
                    reason: format!("source container {} out of range", src),
                });
            }
        }

        Ok(Self { op, src_a, src_b })
    }

    /// Encode into an instruction word.
    pub fn encode(&self) -> u32 {
        (self.op as u32)
            | ((self.src_a as u32 & fields::SRC_MASK) << fields::SRC_A_SHIFT)
            | ((self.src_b as u32 & fields::SRC_MASK) << fields::SRC_B_SHIFT)
    }

    /// True for the NOP instruction.
    #[inline]
    pub fn is_nop(&self) -> bool {
        self.op == AluOp::Nop
    }

    /// Compute the result from source values and the operand.
    ///
    /// Returns `None` for NOP (container keeps its value).
    pub fn execute(&self, a: u32, b: u32, imm: u32) -> Option<u32> {
        Some(match self.op {
            AluOp::Nop => return None,
            AluOp::Set => imm,
            AluOp::Copy => a,
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
            AluOp::AddImm => a.wrapping_add(imm),
            AluOp::ShiftLeft => a << (imm & 31),
            AluOp::ShiftRight => a >> (imm & 31),
        })
    }
}
