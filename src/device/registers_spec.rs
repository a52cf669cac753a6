//! MAU register address specification.
//!
//! Bit positions for the direct and indirect address maps, the stage
//! control registers and the action instruction word.

// ============================================================================
// Direct Register Space (32-bit addresses)
// ============================================================================

/// Stage shift in a direct address (bits 23:19)
pub const STAGE_SHIFT: u32 = 19;

/// Stage field mask after shifting (5 bits)
pub const STAGE_MASK: u32 = 0x1F;

/// Block shift in a direct address (bits 18:16)
pub const BLOCK_SHIFT: u32 = 16;

/// Block field mask after shifting (3 bits)
pub const BLOCK_MASK: u32 = 0x7;

/// Byte offset within a block (bits 15:0)
pub const OFFSET_MASK: u32 = 0xFFFF;

/// Bits that must be zero in a direct address (31:24)
pub const RESERVED_MASK: u32 = 0xFF00_0000;

/// Register blocks within one stage.
pub mod block {
    /// Stage control and match configuration
    pub const STAGE_CONTROL: u32 = 0;
    /// Action instruction memory
    pub const ACTION_INSTRUCTION: u32 = 1;
    /// Action operand (immediate) memory
    pub const ACTION_OPERAND: u32 = 2;
}

/// Stage control block register offsets.
pub mod stage_control {
    /// Enables and version gate
    pub const CONTROL: u32 = 0x00;
    /// Match key container select
    pub const MATCH_KEY_SELECT: u32 = 0x04;
    /// Match key mask
    pub const MATCH_KEY_MASK: u32 = 0x08;
    /// Action set run on a lookup miss
    pub const MISS_ACTION: u32 = 0x0C;

    /// CONTROL[0]: stage acts on ingress PHVs
    pub const CONTROL_INGRESS_ENABLE: u32 = 1 << 0;
    /// CONTROL[1]: stage acts on egress PHVs
    pub const CONTROL_EGRESS_ENABLE: u32 = 1 << 1;
    /// CONTROL[2]: PHV version must equal CONTROL[7:4]
    pub const CONTROL_VERSION_CHECK: u32 = 1 << 2;
    /// CONTROL[7:4]: required PHV version
    pub const CONTROL_VERSION_SHIFT: u32 = 4;
    pub const CONTROL_VERSION_MASK: u32 = 0xF;

    /// MATCH_KEY_SELECT[7:0]: key container index
    pub const KEY_CONTAINER_MASK: u32 = 0xFF;
    /// MATCH_KEY_SELECT[8]: key enable
    pub const KEY_ENABLE: u32 = 1 << 8;

    /// MISS_ACTION[2:0]: action set
    pub const MISS_SET_MASK: u32 = 0x7;
    /// MISS_ACTION[8]: miss action enable
    pub const MISS_ENABLE: u32 = 1 << 8;
}

/// Action memory word index: `set << ACTION_SET_SHIFT | container`.
pub const ACTION_SET_SHIFT: u32 = 8;

/// Container field of an action memory word index.
pub const ACTION_CONTAINER_MASK: u32 = 0xFF;

// ============================================================================
// Indirect Memory Space (64-bit addresses, 128-bit data)
// ============================================================================

/// Stage shift in an indirect address (bits 39:35)
pub const INDIRECT_STAGE_SHIFT: u32 = 35;

/// Memory type shift in an indirect address (bits 34:32)
pub const INDIRECT_MEMORY_SHIFT: u32 = 32;

/// Memory type mask after shifting (3 bits)
pub const INDIRECT_MEMORY_MASK: u64 = 0x7;

/// Entry index mask (bits 31:0)
pub const INDIRECT_ENTRY_MASK: u64 = 0xFFFF_FFFF;

/// Bits that must be zero in an indirect address (63:40)
pub const INDIRECT_RESERVED_MASK: u64 = !0 << 40;

/// Indirect memory types.
pub mod memory {
    /// Exact-match SRAM
    pub const EXACT_MATCH_SRAM: u64 = 0;
}

/// Exact-match entry layout (data0).
pub mod exact_match {
    /// data0[31:0]: key
    pub const KEY_MASK: u64 = 0xFFFF_FFFF;
    /// data0[32]: entry valid
    pub const VALID_BIT: u64 = 1 << 32;
    /// data0[35:33]: action set
    pub const ACTION_SET_SHIFT: u32 = 33;
    pub const ACTION_SET_MASK: u64 = 0x7;
}

// ============================================================================
// Action Instruction Encoding
// ============================================================================

/// Instruction word fields.
pub mod instruction {
    /// [3:0] opcode
    pub const OPCODE_MASK: u32 = 0xF;
    /// [15:8] source A container
    pub const SRC_A_SHIFT: u32 = 8;
    /// [23:16] source B container
    pub const SRC_B_SHIFT: u32 = 16;
    /// Source field mask after shifting
    pub const SRC_MASK: u32 = 0xFF;
}
