//! MAU register definitions and address decoder.
//!
//! # Direct Address Encoding
//!
//! ```text
//! 32-bit address: [reserved:8][stage:5][block:3][offset:16]
//!
//!   STAGE_SHIFT = 19
//!   BLOCK_SHIFT = 16
//!   OFFSET_MASK = 0xFFFF (word aligned)
//! ```
//!
//! # Indirect Address Encoding
//!
//! ```text
//! 64-bit address: [reserved:24][stage:5][memory:3][entry:32]
//! ```
//!
//! A decoded address becomes a [`Register`], so the rest of the model never
//! touches raw offsets.

use std::fmt;

use thiserror::Error;

use super::registers_spec::{
    self as spec, block, memory, stage_control as sc, ACTION_CONTAINER_MASK, ACTION_SET_SHIFT,
};

/// Errors raised on the register-configuration boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// Address does not name any register
    #[error("unmapped register address 0x{0:08X}")]
    Unmapped(u64),

    /// Direct address not word aligned
    #[error("unaligned register address 0x{0:08X}")]
    Unaligned(u32),

    /// Stage field beyond the configured pipeline
    #[error("stage {stage} out of range (pipeline has {stages} stages)")]
    StageOutOfRange { stage: usize, stages: usize },

    /// Value does not fit the register's fields
    #[error("invalid value 0x{value:08X} for {register}: {reason}")]
    InvalidValue { register: &'static str, value: u32, reason: String },

    /// Instruction word carries an unknown opcode or bad operand
    #[error("invalid action instruction 0x{word:08X}: {reason}")]
    InvalidInstruction { word: u32, reason: String },
}

/// Register block within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterBlock {
    /// Stage control and match configuration
    StageControl,
    /// Action instruction memory
    ActionInstruction,
    /// Action operand memory
    ActionOperand,
}

impl RegisterBlock {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            block::STAGE_CONTROL => Some(RegisterBlock::StageControl),
            block::ACTION_INSTRUCTION => Some(RegisterBlock::ActionInstruction),
            block::ACTION_OPERAND => Some(RegisterBlock::ActionOperand),
            _ => None,
        }
    }

    fn bits(&self) -> u32 {
        match self {
            RegisterBlock::StageControl => block::STAGE_CONTROL,
            RegisterBlock::ActionInstruction => block::ACTION_INSTRUCTION,
            RegisterBlock::ActionOperand => block::ACTION_OPERAND,
        }
    }
}

impl fmt::Display for RegisterBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterBlock::StageControl => write!(f, "Control"),
            RegisterBlock::ActionInstruction => write!(f, "ActInstr"),
            RegisterBlock::ActionOperand => write!(f, "ActOperand"),
        }
    }
}

/// A register within one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Enables and version gate
    StageControl,
    /// Match key container select
    MatchKeySelect,
    /// Match key mask
    MatchKeyMask,
    /// Miss action select
    MissAction,
    /// Instruction slot of an action set
    ActionInstruction { set: usize, container: usize },
    /// Operand slot of an action set
    ActionOperand { set: usize, container: usize },
}

impl Register {
    /// Block this register lives in.
    pub fn block(&self) -> RegisterBlock {
        match self {
            Register::StageControl
            | Register::MatchKeySelect
            | Register::MatchKeyMask
            | Register::MissAction => RegisterBlock::StageControl,
            Register::ActionInstruction { .. } => RegisterBlock::ActionInstruction,
            Register::ActionOperand { .. } => RegisterBlock::ActionOperand,
        }
    }

    /// Byte offset within the block.
    pub fn offset(&self) -> u32 {
        match self {
            Register::StageControl => sc::CONTROL,
            Register::MatchKeySelect => sc::MATCH_KEY_SELECT,
            Register::MatchKeyMask => sc::MATCH_KEY_MASK,
            Register::MissAction => sc::MISS_ACTION,
            Register::ActionInstruction { set, container }
            | Register::ActionOperand { set, container } => {
                (((*set as u32) << ACTION_SET_SHIFT) | *container as u32) * 4
            }
        }
    }

    /// Static name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Name and description.
    pub fn info(&self) -> &'static RegisterInfo {
        let name = match self {
            Register::StageControl => "STAGE_CONTROL",
            Register::MatchKeySelect => "MATCH_KEY_SELECT",
            Register::MatchKeyMask => "MATCH_KEY_MASK",
            Register::MissAction => "MISS_ACTION",
            Register::ActionInstruction { .. } => "ACTION_INSTRUCTION",
            Register::ActionOperand { .. } => "ACTION_OPERAND",
        };
        // Every variant has a table entry
        REGISTERS
            .iter()
            .find(|r| r.name == name)
            .unwrap_or(&REGISTERS[0])
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::ActionInstruction { set, container }
            | Register::ActionOperand { set, container } => {
                write!(f, "{}[set {}][c{}]", self.name(), set, container)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Decoded direct register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    /// Pipeline stage
    pub stage: usize,
    /// Register within the stage
    pub register: Register,
}

impl RegisterAddress {
    /// Create an address for a register in a stage.
    pub fn new(stage: usize, register: Register) -> Self {
        Self { stage, register }
    }

    /// Decode a 32-bit direct address.
    ///
    /// Only checks the shape of the address; stage and container ranges
    /// depend on the chip configuration and are checked by the model.
    pub fn decode(addr: u32) -> Result<Self, RegisterError> {
        if addr & spec::RESERVED_MASK != 0 {
            return Err(RegisterError::Unmapped(addr as u64));
        }
        if addr & 0x3 != 0 {
            return Err(RegisterError::Unaligned(addr));
        }

        let stage = ((addr >> spec::STAGE_SHIFT) & spec::STAGE_MASK) as usize;
        let block = RegisterBlock::from_bits((addr >> spec::BLOCK_SHIFT) & spec::BLOCK_MASK)
            .ok_or(RegisterError::Unmapped(addr as u64))?;
        let offset = addr & spec::OFFSET_MASK;

        let register = match block {
            RegisterBlock::StageControl => match offset {
                sc::CONTROL => Register::StageControl,
                sc::MATCH_KEY_SELECT => Register::MatchKeySelect,
                sc::MATCH_KEY_MASK => Register::MatchKeyMask,
                sc::MISS_ACTION => Register::MissAction,
                _ => return Err(RegisterError::Unmapped(addr as u64)),
            },
            RegisterBlock::ActionInstruction | RegisterBlock::ActionOperand => {
                let word = offset / 4;
                let set = (word >> ACTION_SET_SHIFT) as usize;
                let container = (word & ACTION_CONTAINER_MASK) as usize;
                if block == RegisterBlock::ActionInstruction {
                    Register::ActionInstruction { set, container }
                } else {
                    Register::ActionOperand { set, container }
                }
            }
        };

        Ok(Self { stage, register })
    }

    /// Encode back into a 32-bit direct address.
    pub fn encode(&self) -> u32 {
        ((self.stage as u32 & spec::STAGE_MASK) << spec::STAGE_SHIFT)
            | (self.register.block().bits() << spec::BLOCK_SHIFT)
            | (self.register.offset() & spec::OFFSET_MASK)
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} {}", self.stage, self.register)
    }
}

/// Indirectly addressed memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndirectMemory {
    /// Exact-match table SRAM
    ExactMatchSram,
}

/// Decoded indirect (memory) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndirectAddress {
    /// Pipeline stage
    pub stage: usize,
    /// Target memory
    pub memory: IndirectMemory,
    /// Entry index within the memory
    pub entry: usize,
}

impl IndirectAddress {
    /// Create an exact-match SRAM address.
    pub fn exact_match(stage: usize, entry: usize) -> Self {
        Self {
            stage,
            memory: IndirectMemory::ExactMatchSram,
            entry,
        }
    }

    /// Decode a 64-bit indirect address.
    pub fn decode(addr: u64) -> Result<Self, RegisterError> {
        if addr & spec::INDIRECT_RESERVED_MASK != 0 {
            return Err(RegisterError::Unmapped(addr));
        }
        let stage = ((addr >> spec::INDIRECT_STAGE_SHIFT) & spec::STAGE_MASK as u64) as usize;
        let memory = match (addr >> spec::INDIRECT_MEMORY_SHIFT) & spec::INDIRECT_MEMORY_MASK {
            memory::EXACT_MATCH_SRAM => IndirectMemory::ExactMatchSram,
            _ => return Err(RegisterError::Unmapped(addr)),
        };
        let entry = (addr & spec::INDIRECT_ENTRY_MASK) as usize;
        Ok(Self { stage, memory, entry })
    }

    /// Encode back into a 64-bit indirect address.
    pub fn encode(&self) -> u64 {
        let memory = match self.memory {
            IndirectMemory::ExactMatchSram => memory::EXACT_MATCH_SRAM,
        };
        ((self.stage as u64 & spec::STAGE_MASK as u64) << spec::INDIRECT_STAGE_SHIFT)
            | (memory << spec::INDIRECT_MEMORY_SHIFT)
            | (self.entry as u64 & spec::INDIRECT_ENTRY_MASK)
    }
}

impl fmt::Display for IndirectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memory {
            IndirectMemory::ExactMatchSram => {
                write!(f, "stage {} EXACT_MATCH_SRAM[{}]", self.stage, self.entry)
            }
        }
    }
}

/// Information about a register.
#[derive(Debug, Clone)]
pub struct RegisterInfo {
    /// Register name
    pub name: &'static str,
    /// Brief description
    pub description: &'static str,
    /// Which block this belongs to
    pub block: RegisterBlock,
}

/// Register table.
static REGISTERS: &[RegisterInfo] = &[
    RegisterInfo {
        name: "STAGE_CONTROL",
        description: "Direction enables and version gate",
        block: RegisterBlock::StageControl,
    },
    RegisterInfo {
        name: "MATCH_KEY_SELECT",
        description: "Match key container and enable",
        block: RegisterBlock::StageControl,
    },
    RegisterInfo {
        name: "MATCH_KEY_MASK",
        description: "Mask applied to the match key",
        block: RegisterBlock::StageControl,
    },
    RegisterInfo {
        name: "MISS_ACTION",
        description: "Action set run on a lookup miss",
        block: RegisterBlock::StageControl,
    },
    RegisterInfo {
        name: "ACTION_INSTRUCTION",
        description: "Action set instruction slot",
        block: RegisterBlock::ActionInstruction,
    },
    RegisterInfo {
        name: "ACTION_OPERAND",
        description: "Action set immediate operand",
        block: RegisterBlock::ActionOperand,
    },
];

/// Format a direct address for display.
pub fn format_address(addr: u32) -> String {
    match RegisterAddress::decode(addr) {
        Ok(decoded) => format!("0x{:08X} {}", addr, decoded),
        Err(e) => format!("0x{:08X} [{}]", addr, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stage_control() {
        let addr = RegisterAddress::decode(0x0018_0004).unwrap();
        assert_eq!(addr.stage, 3);
        assert_eq!(addr.register, Register::MatchKeySelect);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let regs = [
            RegisterAddress::new(0, Register::StageControl),
            RegisterAddress::new(11, Register::MissAction),
            RegisterAddress::new(2, Register::ActionInstruction { set: 5, container: 223 }),
            RegisterAddress::new(7, Register::ActionOperand { set: 0, container: 64 }),
        ];
        for reg in regs {
            assert_eq!(RegisterAddress::decode(reg.encode()).unwrap(), reg);
        }
    }

    #[test]
    fn test_action_word_layout() {
        // stage 1, block 1, set 2, container 5 -> word 0x205 -> offset 0x814
        let reg = RegisterAddress::new(1, Register::ActionInstruction { set: 2, container: 5 });
        assert_eq!(reg.encode(), 0x0009_0814);
    }

    #[test]
    fn test_decode_rejects_unaligned() {
        assert_eq!(RegisterAddress::decode(0x0000_0002), Err(RegisterError::Unaligned(2)));
    }

    #[test]
    fn test_decode_rejects_unknown_block_and_offset() {
        assert!(matches!(RegisterAddress::decode(0x0003_0000), Err(RegisterError::Unmapped(_))));
        assert!(matches!(RegisterAddress::decode(0x0000_0040), Err(RegisterError::Unmapped(_))));
        assert!(matches!(RegisterAddress::decode(0x0100_0000), Err(RegisterError::Unmapped(_))));
    }

    #[test]
    fn test_indirect_roundtrip() {
        let addr = IndirectAddress::exact_match(4, 17);
        assert_eq!(addr.encode(), (4u64 << 35) | 17);
        assert_eq!(IndirectAddress::decode(addr.encode()).unwrap(), addr);
    }

    #[test]
    fn test_indirect_rejects_unknown_memory() {
        assert!(IndirectAddress::decode(1u64 << 32).is_err());
        assert!(IndirectAddress::decode(1u64 << 45).is_err());
    }

    #[test]
    fn test_register_info() {
        let reg = Register::ActionOperand { set: 1, container: 2 };
        assert_eq!(reg.name(), "ACTION_OPERAND");
        assert_eq!(reg.info().block, RegisterBlock::ActionOperand);
        assert_eq!(format!("{}", reg), "ACTION_OPERAND[set 1][c2]");
    }

    #[test]
    fn test_format_address() {
        assert!(format_address(0x0000_0000).contains("STAGE_CONTROL"));
        assert!(format_address(0x0000_0001).contains("unaligned"));
    }
}
