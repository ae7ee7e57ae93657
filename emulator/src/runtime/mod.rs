//! The emulation engine: architectural state and the fetch, decode, execute
//! step. Decoding goes through the same codec the assembler encodes with.

use thiserror::Error;
use tracing::{debug, info};

use crate::constants::Word;

mod instructions;
mod memory;
mod registers;

pub use self::instructions::{Instruction, ShiftImmOp};
pub use self::memory::{Memory, MemoryError};
pub use self::registers::{Reg, RegisterParseError, Registers};

/// Errors that terminate execution. There is no fault recovery: the caller
/// is expected to stop stepping and report.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("invalid funct3 {funct3:#05b} for a branch")]
    InvalidBranchFunct3 { funct3: u32 },

    #[error("invalid funct3 {funct3:#05b} for a load (lb, lh, lw, lbu, lhu are valid)")]
    InvalidLoadFunct3 { funct3: u32 },

    #[error("invalid funct3 {funct3:#05b} for a store")]
    InvalidStoreFunct3 { funct3: u32 },

    #[error("invalid funct3 {funct3:#05b} for a register-register op")]
    InvalidOpFunct3 { funct3: u32 },

    #[error("invalid instruction {word:#010x} (opcode {opcode:#09b})")]
    InvalidOpcode { opcode: u32, word: Word },
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction was decoded and executed.
    Executed(Instruction),

    /// The fetched word was all zeroes. The program counter stays put, so
    /// further steps keep halting (while still counting cycles).
    Halted,
}

/// The processor: register file, memory, program counter and cycle counter.
/// One call to [`Cpu::step`] is one state transition.
pub struct Cpu {
    pub registers: Registers,
    pub memory: Memory,
    pc: Word,
    cycles: usize,
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cpu {{ pc: {:#010x}, cycles: {}, memory: [...] }}",
            self.pc, self.cycles
        )
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(crate::constants::MEMORY_WORDS)
    }
}

impl Cpu {
    /// Builds a reset processor with `memory_words` words of memory.
    #[must_use]
    pub fn new(memory_words: usize) -> Self {
        let mut cpu = Self {
            registers: Registers::default(),
            memory: Memory::new(memory_words),
            pc: 0,
            cycles: 0,
        };
        cpu.reset(0);
        cpu
    }

    /// Clears registers and memory and restarts from `reset_pc`. The stack
    /// pointer starts at the top of memory minus 4. The cycle counter is
    /// left running.
    pub fn reset(&mut self, reset_pc: Word) {
        self.pc = reset_pc;
        self.registers.clear();
        self.registers
            .set(Reg::SP, (self.memory.capacity() as Word).wrapping_sub(4));
        self.memory.clear();
    }

    #[must_use]
    pub fn pc(&self) -> Word {
        self.pc
    }

    #[must_use]
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Copies an assembled program into memory at `offset` (a word index).
    ///
    /// # Errors
    ///
    /// Fails when the program does not fit.
    pub fn load_program(&mut self, offset: usize, program: &[Word]) -> Result<(), MemoryError> {
        self.memory.load_program(offset, program)
    }

    /// One fetch, decode, execute transition.
    ///
    /// # Errors
    ///
    /// Fails when the program counter leaves memory or the fetched word does
    /// not decode; both are fatal to the run.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<StepOutcome, ProcessorError> {
        self.cycles += 1;

        let word = self.memory.fetch(self.pc)?;
        if word == 0 {
            debug!(pc = self.pc, "fetched a zero word, halting");
            return Ok(StepOutcome::Halted);
        }

        let instruction = Instruction::decode(word)?;
        info!(pc = self.pc, cycle = self.cycles, "executing \"{}\"", instruction);
        instruction.execute(self);
        debug!(registers = %self.registers, "register state");

        Ok(StepOutcome::Executed(instruction))
    }

    /// Steps until the processor halts.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ProcessorError`] raised by a step.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<(), ProcessorError> {
        loop {
            if self.step()? == StepOutcome::Halted {
                return Ok(());
            }
        }
    }

    /// Sequential flow: next instruction.
    pub(crate) fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Control transfer to `target`, with bit 0 forced to zero.
    pub(crate) fn jump(&mut self, target: Word) {
        self.pc = target & !1;
    }

    /// Conditional flow: a taken branch moves by `offset`, otherwise by 4.
    pub(crate) fn branch(&mut self, taken: bool, offset: i32) {
        let delta = if taken { offset as Word } else { 4 };
        self.pc = self.pc.wrapping_add(delta);
    }

    /// The address a load or store computes: base register plus offset.
    pub(crate) fn data_address(&self, base: Reg, offset: i32) -> Word {
        self.registers.get(base).wrapping_add(offset as Word)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::isa::{encode, opcodes};

    use super::*;

    fn reg(index: u32) -> Reg {
        Reg::from_bits(index)
    }

    #[test]
    fn reset_points_the_stack_at_the_top_of_memory() {
        let cpu = Cpu::new(4096);
        assert_eq!(cpu.registers.get(Reg::SP), 4092);
        assert_eq!(cpu.pc(), 0);
    }

    #[test]
    fn add_program() {
        let mut cpu = Cpu::new(64);
        cpu.load_program(
            0,
            &[
                encode::i_type(opcodes::OP_IMM, 0b000, 6, 0, 2), // addi x6, x0, 2
                encode::i_type(opcodes::OP_IMM, 0b000, 7, 0, 8), // addi x7, x0, 8
                encode::r_type(opcodes::OP, 0b000, 0, 10, 6, 7), // add x10, x6, x7
            ],
        )
        .unwrap();

        for _ in 0..3 {
            assert!(matches!(cpu.step(), Ok(StepOutcome::Executed(_))));
        }

        assert_eq!(cpu.registers.get(reg(6)), 2);
        assert_eq!(cpu.registers.get(reg(7)), 8);
        assert_eq!(cpu.registers.get(reg(10)), 10);
        assert_eq!(cpu.pc(), 12);
        assert_eq!(cpu.cycles(), 3);
    }

    #[test]
    fn zero_word_halts_without_moving_the_pc() {
        let mut cpu = Cpu::new(64);
        cpu.load_program(0, &[encode::i_type(opcodes::OP_IMM, 0b000, 5, 0, 1)])
            .unwrap();

        assert!(matches!(cpu.step(), Ok(StepOutcome::Executed(_))));
        assert_eq!(cpu.pc(), 4);
        assert_eq!(cpu.cycles(), 1);

        // the word at pc 4 is zero: halted, pc stuck, cycles still counting
        assert_eq!(cpu.step(), Ok(StepOutcome::Halted));
        assert_eq!(cpu.pc(), 4);
        assert_eq!(cpu.cycles(), 2);

        assert_eq!(cpu.step(), Ok(StepOutcome::Halted));
        assert_eq!(cpu.cycles(), 3);
    }

    #[test]
    fn run_executes_until_halt() {
        let mut cpu = Cpu::new(64);
        cpu.load_program(
            0,
            &[
                encode::i_type(opcodes::OP_IMM, 0b000, 5, 0, 3),
                encode::i_type(opcodes::OP_IMM, 0b000, 6, 5, 4),
            ],
        )
        .unwrap();

        cpu.run().unwrap();
        assert_eq!(cpu.registers.get(reg(6)), 7);
        assert_eq!(cpu.pc(), 8);
    }

    #[test]
    fn writes_to_x0_are_discarded_by_execution() {
        let mut cpu = Cpu::new(64);
        cpu.load_program(
            0,
            &[
                encode::i_type(opcodes::OP_IMM, 0b000, 0, 0, 5), // addi x0, x0, 5
                encode::i_type(opcodes::OP_IMM, 0b000, 1, 0, 7), // addi x1, x0, 7
                encode::i_type(opcodes::JALR, 0b000, 0, 0, 16),  // jalr x0, 16(x0)
            ],
        )
        .unwrap();

        cpu.run().unwrap();
        assert_eq!(cpu.registers.get(Reg::ZERO), 0);
    }

    #[test]
    fn fetch_outside_memory_is_fatal() {
        let mut cpu = Cpu::new(4);
        cpu.reset(64);
        assert_eq!(
            cpu.step(),
            Err(ProcessorError::Memory(MemoryError::FetchOutOfBounds {
                address: 64
            }))
        );
        // the failed fetch still counted a cycle
        assert_eq!(cpu.cycles(), 1);
    }

    #[test]
    fn jalr_target_ignores_the_base_register() {
        let mut cpu = Cpu::new(64);
        // jalr x1, 8(x5): were the base honoured, the target would be 108;
        // the observed formula jumps to pc + 8 = 12
        cpu.load_program(
            0,
            &[
                encode::i_type(opcodes::OP_IMM, 0b000, 5, 0, 100), // addi x5, x0, 100
                encode::i_type(opcodes::JALR, 0b000, 1, 5, 8),     // jalr x1, 8(x5)
            ],
        )
        .unwrap();

        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 12);
        assert_eq!(cpu.registers.get(Reg::RA), 8);
    }

    #[test]
    fn branches_use_the_scrambled_offset() {
        let mut cpu = Cpu::new(64);
        // bge x8, x9, -16 in the canonical branch encoding, placed at pc 32
        cpu.reset(32);
        cpu.memory.load_program(8, &[0xFE94_58E3]).unwrap();

        cpu.registers.set(Reg::from_bits(8), 1);
        cpu.registers.set(Reg::from_bits(9), 0);

        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 16);
    }

    #[test]
    fn untaken_branches_fall_through() {
        let mut cpu = Cpu::new(64);
        cpu.reset(32);
        cpu.memory.load_program(8, &[0xFE94_58E3]).unwrap();

        // x8 < x9: bge not taken
        cpu.registers.set(Reg::from_bits(8), 0);
        cpu.registers.set(Reg::from_bits(9), 5);

        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 36);
    }

    #[test]
    fn signed_and_unsigned_loads_of_the_same_byte() {
        let mut cpu = Cpu::new(64);
        // the data word at index 32 holds 0xF0 in its low byte
        cpu.memory.write(32, 0xF0);
        cpu.memory
            .load_program(
                0,
                &[
                    encode::i_type(opcodes::LOAD, 0b000, 5, 0, 32), // lb x5, 32(x0)
                    encode::i_type(opcodes::LOAD, 0b100, 6, 0, 32), // lbu x6, 32(x0)
                ],
            )
            .unwrap();

        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(reg(5)), 0xFFFF_FFF0);
        assert_eq!(cpu.registers.get(reg(6)), 0x0000_00F0);
    }

    #[test]
    fn byte_store_preserves_the_rest_of_the_word() {
        let mut cpu = Cpu::new(64);
        cpu.memory.write(32, 0xAABB_CCDD);
        cpu.memory
            .load_program(
                0,
                &[
                    encode::i_type(opcodes::OP_IMM, 0b000, 5, 0, 0x11), // addi x5, x0, 0x11
                    encode::s_type(opcodes::STORE, 0b000, 0, 5, 32),    // sb x5, 32(x0)
                    encode::i_type(opcodes::LOAD, 0b010, 6, 0, 32),     // lw x6, 32(x0)
                ],
            )
            .unwrap();

        cpu.step().unwrap();
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(reg(6)), 0xAABB_CC11);
    }

    #[test]
    fn unimplemented_shifts_only_advance_the_pc() {
        let mut cpu = Cpu::new(64);
        cpu.load_program(
            0,
            &[
                encode::i_type(opcodes::OP_IMM, 0b000, 5, 0, 7), // addi x5, x0, 7
                encode::i_type(opcodes::OP_IMM, 0b001, 5, 5, 1), // slli x5, x5, 1
            ],
        )
        .unwrap();

        cpu.step().unwrap();
        let outcome = cpu.step().unwrap();
        assert!(matches!(
            outcome,
            StepOutcome::Executed(Instruction::Unimplemented { .. })
        ));
        assert_eq!(cpu.registers.get(reg(5)), 7);
        assert_eq!(cpu.pc(), 8);
    }

    #[test]
    fn upper_immediates_load_in_place() {
        let mut cpu = Cpu::new(64);
        cpu.reset(4);
        // lui x1, 0xDEADB / auipc x5, 0x1000 at pc 4 and 8
        cpu.memory.load_program(1, &[0xDEAD_B0B7, 0x0000_1297]).unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(Reg::RA), 0xDEAD_B000);

        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(reg(5)), 0x1008);
        assert_eq!(cpu.pc(), 12);
    }

    #[test]
    fn jal_links_and_jumps_backwards() {
        let mut cpu = Cpu::new(64);
        cpu.reset(8);
        // jal x1, -8 at pc 8
        cpu.memory.load_program(2, &[0xFF9F_F0EF]).unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(Reg::RA), 12);
        assert_eq!(cpu.pc(), 0);
    }

    #[test]
    fn data_accesses_wrap_modulo_capacity() {
        let mut cpu = Cpu::new(8);
        cpu.memory.write(3, 0x1234);
        cpu.memory
            .load_program(0, &[encode::i_type(opcodes::LOAD, 0b010, 5, 0, 11)])
            .unwrap();

        // lw x5, 11(x0): 11 % 8 = 3
        cpu.step().unwrap();
        assert_eq!(cpu.registers.get(reg(5)), 0x1234);
    }
}
