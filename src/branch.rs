//! Types for classifying control-flow instructions in a commit trace.

use serde::Serialize;

/// Size of a (non-compressed) RISC-V instruction in bytes.
pub const INST_BYTES: u64 = 4;

/// The architectural link register (`x1`/`ra`).
pub const LINK_REG: u32 = 1;

// Major opcodes of the RV32I/RV64I control-flow instructions
const OPCODE_MASK: u32 = 0b111_1111;
const OP_BRANCH: u32   = 0b110_0011;
const OP_JAL: u32      = 0b110_1111;
const OP_JALR: u32     = 0b110_0111;

/// Different classes of instruction, as far as the front-end is concerned.
///
/// Only the major opcode (bits `[6:0]`) is used to decide the class.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InstClass {
    /// Not a control-flow instruction.
    None = 0,

    /// A conditional branch (`BRANCH`, `110_0011`).
    ConditionalBranch = OP_BRANCH,

    /// A direct unconditional jump (`JAL`, `110_1111`).
    UnconditionalJump = OP_JAL,

    /// An indirect unconditional jump (`JALR`, `110_0111`).
    IndirectJump = OP_JALR,
}
impl InstClass {
    /// Classify a raw instruction word.
    pub fn from_inst(inst: u32) -> Self {
        match inst & OPCODE_MASK {
            OP_BRANCH => Self::ConditionalBranch,
            OP_JAL    => Self::UnconditionalJump,
            OP_JALR   => Self::IndirectJump,
            _ => Self::None,
        }
    }

    /// Returns 'true' for any branch or jump.
    pub fn is_control_flow(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns 'true' for either kind of jump.
    pub fn is_jump(&self) -> bool {
        matches!(self, Self::UnconditionalJump | Self::IndirectJump)
    }

    /// Short mnemonic used in reports.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::None => "-",
            Self::ConditionalBranch => "br",
            Self::UnconditionalJump => "jal",
            Self::IndirectJump => "jalr",
        }
    }
}

/// Destination register field (`rd`, bits `[11:7]`).
pub fn rd(inst: u32) -> u32 { (inst >> 7) & 0x1f }

/// First source register field (`rs1`, bits `[19:15]`).
pub fn rs1(inst: u32) -> u32 { (inst >> 15) & 0x1f }

/// Procedure call/return information about an instruction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ControlFlowFacts {
    /// An indirect jump to the link register which discards the link.
    pub is_return: bool,

    /// A jump which writes the link register.
    pub is_call: bool,
}
impl ControlFlowFacts {
    pub fn new(class: InstClass, inst: u32) -> Self {
        let rd = rd(inst);
        let rs1 = rs1(inst);
        Self {
            is_return: class == InstClass::IndirectJump
                && rd == 0 && rs1 == LINK_REG,
            is_call: class.is_jump() && rd == LINK_REG,
        }
    }
}
