use parse_display::Display;
use tracing::debug;

use crate::constants::Word;
use crate::isa::{decode, opcodes};

use super::{registers::Reg, Cpu, ProcessorError};

/// The recognized-but-inert shift-immediate operations. They decode, display
/// and advance the program counter, and change no register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum ShiftImmOp {
    Slli,
    Srli,
    Srai,
}

/// A decoded instruction: one variant per operation the machine knows,
/// keyed by opcode, funct3 and funct7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    /// Load the upper immediate, already in place as the top 20 bits
    #[display("lui {rd}, {imm:#x}")]
    Lui { rd: Reg, imm: Word },

    /// Upper immediate plus the current program counter
    #[display("auipc {rd}, {imm:#x}")]
    Auipc { rd: Reg, imm: Word },

    /// Link and jump relative to the program counter
    #[display("jal {rd}, {offset}")]
    Jal { rd: Reg, offset: i32 },

    /// Link and jump. The base register is carried for display but the
    /// target is computed from the program counter alone; see DESIGN.md.
    #[display("jalr {rd}, {offset}({rs1})")]
    Jalr { rd: Reg, rs1: Reg, offset: i32 },

    #[display("beq {rs1}, {rs2}, {offset}")]
    Beq { rs1: Reg, rs2: Reg, offset: i32 },

    #[display("bne {rs1}, {rs2}, {offset}")]
    Bne { rs1: Reg, rs2: Reg, offset: i32 },

    /// Signed less-than branch
    #[display("blt {rs1}, {rs2}, {offset}")]
    Blt { rs1: Reg, rs2: Reg, offset: i32 },

    /// Signed greater-or-equal branch
    #[display("bge {rs1}, {rs2}, {offset}")]
    Bge { rs1: Reg, rs2: Reg, offset: i32 },

    #[display("bltu {rs1}, {rs2}, {offset}")]
    Bltu { rs1: Reg, rs2: Reg, offset: i32 },

    #[display("bgeu {rs1}, {rs2}, {offset}")]
    Bgeu { rs1: Reg, rs2: Reg, offset: i32 },

    /// Load a sign-extended byte
    #[display("lb {rd}, {offset}({rs1})")]
    Lb { rd: Reg, rs1: Reg, offset: i32 },

    /// Load a sign-extended half-word
    #[display("lh {rd}, {offset}({rs1})")]
    Lh { rd: Reg, rs1: Reg, offset: i32 },

    #[display("lw {rd}, {offset}({rs1})")]
    Lw { rd: Reg, rs1: Reg, offset: i32 },

    /// Load a zero-extended byte
    #[display("lbu {rd}, {offset}({rs1})")]
    Lbu { rd: Reg, rs1: Reg, offset: i32 },

    /// Load a zero-extended half-word
    #[display("lhu {rd}, {offset}({rs1})")]
    Lhu { rd: Reg, rs1: Reg, offset: i32 },

    /// Store the low byte, preserving the rest of the word
    #[display("sb {rs2}, {offset}({rs1})")]
    Sb { rs1: Reg, rs2: Reg, offset: i32 },

    /// Store the low half-word, preserving the rest of the word
    #[display("sh {rs2}, {offset}({rs1})")]
    Sh { rs1: Reg, rs2: Reg, offset: i32 },

    #[display("sw {rs2}, {offset}({rs1})")]
    Sw { rs1: Reg, rs2: Reg, offset: i32 },

    #[display("addi {rd}, {rs1}, {imm}")]
    Addi { rd: Reg, rs1: Reg, imm: i32 },

    #[display("slti {rd}, {rs1}, {imm}")]
    Slti { rd: Reg, rs1: Reg, imm: i32 },

    #[display("sltiu {rd}, {rs1}, {imm}")]
    Sltiu { rd: Reg, rs1: Reg, imm: i32 },

    #[display("xori {rd}, {rs1}, {imm}")]
    Xori { rd: Reg, rs1: Reg, imm: i32 },

    #[display("ori {rd}, {rs1}, {imm}")]
    Ori { rd: Reg, rs1: Reg, imm: i32 },

    #[display("andi {rd}, {rs1}, {imm}")]
    Andi { rd: Reg, rs1: Reg, imm: i32 },

    /// A shift-immediate. Recognized so the gap is visible, executed as a
    /// plain program counter advance.
    #[display("{op} {rd}, {rs1}, {shamt}")]
    Unimplemented {
        op: ShiftImmOp,
        rd: Reg,
        rs1: Reg,
        shamt: u32,
    },

    #[display("add {rd}, {rs1}, {rs2}")]
    Add { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("sub {rd}, {rs1}, {rs2}")]
    Sub { rd: Reg, rs1: Reg, rs2: Reg },

    /// Shift left logical, amount from the low 5 bits of rs2
    #[display("sll {rd}, {rs1}, {rs2}")]
    Sll { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("slt {rd}, {rs1}, {rs2}")]
    Slt { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("sltu {rd}, {rs1}, {rs2}")]
    Sltu { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("srl {rd}, {rs1}, {rs2}")]
    Srl { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("sra {rd}, {rs1}, {rs2}")]
    Sra { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("or {rd}, {rs1}, {rs2}")]
    Or { rd: Reg, rs1: Reg, rs2: Reg },

    #[display("and {rd}, {rs1}, {rs2}")]
    And { rd: Reg, rs1: Reg, rs2: Reg },
}

impl Instruction {
    /// Decodes an instruction word through the shared codec.
    ///
    /// # Errors
    ///
    /// Fails on an unknown opcode, and on an unknown funct3 within the
    /// branch, load, store and register-register groups.
    pub fn decode(word: Word) -> Result<Self, ProcessorError> {
        use Instruction::*;

        let rd = Reg::from_bits(decode::rd(word));
        let rs1 = Reg::from_bits(decode::rs1(word));
        let rs2 = Reg::from_bits(decode::rs2(word));
        let funct3 = decode::funct3(word);
        let funct7 = decode::funct7(word);

        let opcode = decode::opcode(word);
        let instruction = match opcode {
            opcodes::LUI => Lui {
                rd,
                imm: decode::u_imm(word),
            },

            opcodes::AUIPC => Auipc {
                rd,
                imm: decode::u_imm(word),
            },

            opcodes::JAL => Jal {
                rd,
                offset: decode::j_imm(word),
            },

            opcodes::JALR => Jalr {
                rd,
                rs1,
                offset: decode::i_imm(word),
            },

            opcodes::BRANCH => {
                let offset = decode::b_imm(word);
                match funct3 {
                    0b000 => Beq { rs1, rs2, offset },
                    0b001 => Bne { rs1, rs2, offset },
                    0b100 => Blt { rs1, rs2, offset },
                    0b101 => Bge { rs1, rs2, offset },
                    0b110 => Bltu { rs1, rs2, offset },
                    0b111 => Bgeu { rs1, rs2, offset },
                    _ => return Err(ProcessorError::InvalidBranchFunct3 { funct3 }),
                }
            }

            opcodes::LOAD => {
                let offset = decode::i_imm(word);
                match funct3 {
                    0b000 => Lb { rd, rs1, offset },
                    0b001 => Lh { rd, rs1, offset },
                    0b010 => Lw { rd, rs1, offset },
                    0b100 => Lbu { rd, rs1, offset },
                    0b101 => Lhu { rd, rs1, offset },
                    _ => return Err(ProcessorError::InvalidLoadFunct3 { funct3 }),
                }
            }

            opcodes::STORE => {
                let offset = decode::s_imm(word);
                match funct3 {
                    0b000 => Sb { rs1, rs2, offset },
                    0b001 => Sh { rs1, rs2, offset },
                    0b010 => Sw { rs1, rs2, offset },
                    _ => return Err(ProcessorError::InvalidStoreFunct3 { funct3 }),
                }
            }

            opcodes::OP_IMM => {
                let imm = decode::i_imm(word);
                // the shift amount lives in the rs2 field of the immediate
                let shamt = decode::rs2(word);
                match funct3 {
                    0b000 => Addi { rd, rs1, imm },
                    0b010 => Slti { rd, rs1, imm },
                    0b011 => Sltiu { rd, rs1, imm },
                    0b100 => Xori { rd, rs1, imm },
                    0b110 => Ori { rd, rs1, imm },
                    0b111 => Andi { rd, rs1, imm },
                    0b001 => Unimplemented {
                        op: ShiftImmOp::Slli,
                        rd,
                        rs1,
                        shamt,
                    },
                    0b101 => Unimplemented {
                        op: if funct7 == 0b010_0000 {
                            ShiftImmOp::Srai
                        } else {
                            ShiftImmOp::Srli
                        },
                        rd,
                        rs1,
                        shamt,
                    },
                    _ => unreachable!("funct3 is a three-bit field"),
                }
            }

            opcodes::OP => match funct3 {
                0b000 => {
                    if funct7 == 0 {
                        Add { rd, rs1, rs2 }
                    } else {
                        Sub { rd, rs1, rs2 }
                    }
                }
                0b001 => Sll { rd, rs1, rs2 },
                0b010 => Slt { rd, rs1, rs2 },
                0b011 => Sltu { rd, rs1, rs2 },
                0b101 => {
                    if funct7 == 0 {
                        Srl { rd, rs1, rs2 }
                    } else {
                        Sra { rd, rs1, rs2 }
                    }
                }
                0b110 => Or { rd, rs1, rs2 },
                0b111 => And { rd, rs1, rs2 },
                // funct3 0b100 (xor) never made it into the op set
                _ => return Err(ProcessorError::InvalidOpFunct3 { funct3 }),
            },

            _ => return Err(ProcessorError::InvalidOpcode { opcode, word }),
        };

        Ok(instruction)
    }

    /// Executes the instruction against the processor state. Decoding has
    /// already rejected everything invalid, so execution is total.
    pub(crate) fn execute(self, cpu: &mut Cpu) {
        use Instruction::*;

        match self {
            Lui { rd, imm } => {
                cpu.registers.set(rd, imm);
                cpu.advance();
            }

            Auipc { rd, imm } => {
                cpu.registers.set(rd, imm.wrapping_add(cpu.pc));
                cpu.advance();
            }

            Jal { rd, offset } => {
                cpu.registers.set(rd, cpu.pc.wrapping_add(4));
                cpu.jump(cpu.pc.wrapping_add(offset as Word));
            }

            // The base register does not participate in the target; the jump
            // is relative to the program counter, like jal.
            Jalr { rd, rs1: _, offset } => {
                cpu.registers.set(rd, cpu.pc.wrapping_add(4));
                cpu.jump(cpu.pc.wrapping_add(offset as Word));
            }

            Beq { rs1, rs2, offset } => {
                cpu.branch(cpu.registers.get(rs1) == cpu.registers.get(rs2), offset);
            }

            Bne { rs1, rs2, offset } => {
                cpu.branch(cpu.registers.get(rs1) != cpu.registers.get(rs2), offset);
            }

            Blt { rs1, rs2, offset } => {
                let taken = (cpu.registers.get(rs1) as i32) < (cpu.registers.get(rs2) as i32);
                cpu.branch(taken, offset);
            }

            Bge { rs1, rs2, offset } => {
                let taken = (cpu.registers.get(rs1) as i32) >= (cpu.registers.get(rs2) as i32);
                cpu.branch(taken, offset);
            }

            Bltu { rs1, rs2, offset } => {
                cpu.branch(cpu.registers.get(rs1) < cpu.registers.get(rs2), offset);
            }

            Bgeu { rs1, rs2, offset } => {
                cpu.branch(cpu.registers.get(rs1) >= cpu.registers.get(rs2), offset);
            }

            Lb { rd, rs1, offset } => {
                let word = cpu.memory.read(cpu.data_address(rs1, offset));
                cpu.registers.set(rd, word as u8 as i8 as i32 as Word);
                cpu.advance();
            }

            Lh { rd, rs1, offset } => {
                let word = cpu.memory.read(cpu.data_address(rs1, offset));
                cpu.registers.set(rd, word as u16 as i16 as i32 as Word);
                cpu.advance();
            }

            Lw { rd, rs1, offset } => {
                let word = cpu.memory.read(cpu.data_address(rs1, offset));
                cpu.registers.set(rd, word);
                cpu.advance();
            }

            Lbu { rd, rs1, offset } => {
                let word = cpu.memory.read(cpu.data_address(rs1, offset));
                cpu.registers.set(rd, word & 0xFF);
                cpu.advance();
            }

            Lhu { rd, rs1, offset } => {
                let word = cpu.memory.read(cpu.data_address(rs1, offset));
                cpu.registers.set(rd, word & 0xFFFF);
                cpu.advance();
            }

            Sb { rs1, rs2, offset } => {
                let address = cpu.data_address(rs1, offset);
                let old = cpu.memory.read(address);
                let value = (old & 0xFFFF_FF00) | (cpu.registers.get(rs2) & 0xFF);
                cpu.memory.write(address, value);
                cpu.advance();
            }

            Sh { rs1, rs2, offset } => {
                let address = cpu.data_address(rs1, offset);
                let old = cpu.memory.read(address);
                let value = (old & 0xFFFF_0000) | (cpu.registers.get(rs2) & 0xFFFF);
                cpu.memory.write(address, value);
                cpu.advance();
            }

            Sw { rs1, rs2, offset } => {
                let address = cpu.data_address(rs1, offset);
                cpu.memory.write(address, cpu.registers.get(rs2));
                cpu.advance();
            }

            Addi { rd, rs1, imm } => {
                cpu.registers
                    .set(rd, cpu.registers.get(rs1).wrapping_add(imm as Word));
                cpu.advance();
            }

            Slti { rd, rs1, imm } => {
                let result = (cpu.registers.get(rs1) as i32) < imm;
                cpu.registers.set(rd, Word::from(result));
                cpu.advance();
            }

            Sltiu { rd, rs1, imm } => {
                let result = cpu.registers.get(rs1) < imm as Word;
                cpu.registers.set(rd, Word::from(result));
                cpu.advance();
            }

            Xori { rd, rs1, imm } => {
                cpu.registers.set(rd, cpu.registers.get(rs1) ^ imm as Word);
                cpu.advance();
            }

            Ori { rd, rs1, imm } => {
                cpu.registers.set(rd, cpu.registers.get(rs1) | imm as Word);
                cpu.advance();
            }

            Andi { rd, rs1, imm } => {
                cpu.registers.set(rd, cpu.registers.get(rs1) & imm as Word);
                cpu.advance();
            }

            Unimplemented { op, .. } => {
                debug!(%op, "unimplemented shift, advancing without effect");
                cpu.advance();
            }

            Add { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1).wrapping_add(cpu.registers.get(rs2));
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            Sub { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1).wrapping_sub(cpu.registers.get(rs2));
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            Sll { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1).wrapping_shl(cpu.registers.get(rs2));
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            Slt { rd, rs1, rs2 } => {
                let result = (cpu.registers.get(rs1) as i32) < (cpu.registers.get(rs2) as i32);
                cpu.registers.set(rd, Word::from(result));
                cpu.advance();
            }

            Sltu { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1) < cpu.registers.get(rs2);
                cpu.registers.set(rd, Word::from(result));
                cpu.advance();
            }

            Srl { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1).wrapping_shr(cpu.registers.get(rs2));
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            Sra { rd, rs1, rs2 } => {
                let result =
                    (cpu.registers.get(rs1) as i32).wrapping_shr(cpu.registers.get(rs2)) as Word;
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            Or { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1) | cpu.registers.get(rs2);
                cpu.registers.set(rd, result);
                cpu.advance();
            }

            And { rd, rs1, rs2 } => {
                let result = cpu.registers.get(rs1) & cpu.registers.get(rs2);
                cpu.registers.set(rd, result);
                cpu.advance();
            }
        }
    }
}
