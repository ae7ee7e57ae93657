/// Machine word. Registers, memory cells and instructions are all 32 bits.
pub type Word = u32;

/// Default memory capacity, in words.
pub const MEMORY_WORDS: usize = 4096;

/// The all-zero word. Fetching it halts the processor; the assembler inserts
/// it as padding between data-dependent instructions.
pub const NOP: Word = 0;
