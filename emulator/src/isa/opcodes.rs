//! Base opcodes (the low 7 bits of an instruction word).

pub const LUI: u32 = 0b011_0111;
pub const AUIPC: u32 = 0b001_0111;
pub const JAL: u32 = 0b110_1111;
pub const JALR: u32 = 0b110_0111;
pub const BRANCH: u32 = 0b110_0011;
pub const LOAD: u32 = 0b000_0011;
pub const STORE: u32 = 0b010_0011;
pub const OP_IMM: u32 = 0b001_0011;
pub const OP: u32 = 0b011_0011;
