//! The assembler: one line of text in, zero or more machine words out.
//!
//! Each line is tokenized, matched against the mnemonic table and packed
//! through the shared codec. A hazard pass pads data-dependent instructions
//! with no-op words. Labels are recognized and checked for duplicates but
//! never resolved to addresses; branch offsets must be written numerically.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::constants::{Word, NOP};
use crate::isa::{encode, Format};
use crate::runtime::Reg;

mod hazard;
mod line;
mod mnemonics;

use self::hazard::{HazardTracker, RegisterUse};
use self::line::{tokenize, Line};
use self::mnemonics::lookup;

/// Errors raised while assembling. Every variant carries the 1-based source
/// line it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("unknown mnemonic '{mnemonic}' at line {line}")]
    UnknownMnemonic { mnemonic: String, line: usize },

    #[error("invalid register name '{name}' at line {line}")]
    InvalidRegister { name: String, line: usize },

    #[error("could not parse immediate value '{token}' at line {line}")]
    InvalidImmediate { token: String, line: usize },

    #[error("invalid operand syntax '{token}' at line {line}")]
    InvalidOperand { token: String, line: usize },

    #[error("duplicate label '{label}' at line {line}")]
    DuplicateLabel { label: String, line: usize },

    #[error("unsupported or multi-line instruction at line {line}")]
    UnsupportedInstruction { line: usize },

    #[error("multi-line comments are not supported at line {line}")]
    UnsupportedComment { line: usize },
}

/// A packed instruction plus what the hazard pass needs to know about it.
#[derive(Debug, Clone, Copy)]
struct Encoded {
    word: Word,
    uses: RegisterUse,
}

/// Line-by-line assembler state: the label table and the hazard tracker.
/// Transient; one instance per assembled source.
#[derive(Debug, Default)]
pub struct Assembler {
    labels: HashSet<String>,
    hazards: HazardTracker,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles one source line into its machine words: nothing for blank
    /// and label lines, the instruction word itself otherwise, preceded by
    /// any no-op padding the hazard pass asks for.
    ///
    /// # Errors
    ///
    /// See [`AssemblerError`]; every failure is fatal to the assembly.
    pub fn assemble_line(&mut self, source: &str, line: usize) -> Result<Vec<Word>, AssemblerError> {
        match tokenize(source, line)? {
            Line::Blank => Ok(Vec::new()),

            Line::Label(name) => {
                if !self.labels.insert(name.clone()) {
                    return Err(AssemblerError::DuplicateLabel { label: name, line });
                }
                // no address is recorded; labels never resolve to offsets
                debug!(label = %name, "label recorded");
                Ok(Vec::new())
            }

            Line::Instruction(tokens) => {
                let encoded = Self::encode_instruction(&tokens, line)?;
                let padding = self.hazards.padding(&encoded.uses);
                self.hazards.record(encoded.uses.dest);

                let mut words = vec![NOP; padding];
                words.push(encoded.word);
                Ok(words)
            }
        }
    }

    /// Selects the encoding from the token count and the mnemonic's format,
    /// exactly the two arities the source language has.
    fn encode_instruction(tokens: &[String], line: usize) -> Result<Encoded, AssemblerError> {
        let name = &tokens[0];
        let mnemonic = lookup(name).ok_or_else(|| AssemblerError::UnknownMnemonic {
            mnemonic: name.clone(),
            line,
        })?;

        match (tokens.len(), mnemonic.format) {
            // op rd, rs1, rs2
            (4, Format::R) => {
                let rd = parse_register(&tokens[1], line)?;
                let rs1 = parse_register(&tokens[2], line)?;
                let rs2 = parse_register(&tokens[3], line)?;
                Ok(Encoded {
                    word: encode::r_type(
                        mnemonic.opcode,
                        mnemonic.funct3,
                        mnemonic.funct7,
                        rd.index() as u32,
                        rs1.index() as u32,
                        rs2.index() as u32,
                    ),
                    uses: RegisterUse {
                        dest: Some(rd),
                        rs1: Some(rs1),
                        rs2: Some(rs2),
                    },
                })
            }

            // op rd, rs1, imm
            (4, Format::I) => {
                let rd = parse_register(&tokens[1], line)?;
                let rs1 = parse_register(&tokens[2], line)?;
                let imm = parse_immediate(&tokens[3], line)?;
                Ok(Encoded {
                    word: encode::i_type(
                        mnemonic.opcode,
                        mnemonic.funct3,
                        rd.index() as u32,
                        rs1.index() as u32,
                        imm,
                    ),
                    uses: RegisterUse {
                        dest: Some(rd),
                        rs1: Some(rs1),
                        rs2: None,
                    },
                })
            }

            // op rs1, rs2, imm
            (4, Format::B) => {
                let rs1 = parse_register(&tokens[1], line)?;
                let rs2 = parse_register(&tokens[2], line)?;
                let imm = parse_immediate(&tokens[3], line)?;
                Ok(Encoded {
                    word: encode::b_type(
                        mnemonic.opcode,
                        mnemonic.funct3,
                        rs1.index() as u32,
                        rs2.index() as u32,
                        imm,
                    ),
                    uses: RegisterUse {
                        dest: None,
                        rs1: Some(rs1),
                        rs2: Some(rs2),
                    },
                })
            }

            // op rs2, imm(rs1)
            (3, Format::S) => {
                let rs2 = parse_register(&tokens[1], line)?;
                let (imm, rs1) = parse_base_operand(&tokens[2], line)?;
                Ok(Encoded {
                    word: encode::s_type(
                        mnemonic.opcode,
                        mnemonic.funct3,
                        rs1.index() as u32,
                        rs2.index() as u32,
                        imm,
                    ),
                    uses: RegisterUse {
                        dest: None,
                        rs1: Some(rs1),
                        rs2: Some(rs2),
                    },
                })
            }

            // op rd, imm(rs1)
            (3, Format::I) => {
                let rd = parse_register(&tokens[1], line)?;
                let (imm, rs1) = parse_base_operand(&tokens[2], line)?;
                Ok(Encoded {
                    word: encode::i_type(
                        mnemonic.opcode,
                        mnemonic.funct3,
                        rd.index() as u32,
                        rs1.index() as u32,
                        imm,
                    ),
                    uses: RegisterUse {
                        dest: Some(rd),
                        rs1: Some(rs1),
                        rs2: None,
                    },
                })
            }

            // everything else, including lui/auipc/jal at any arity
            _ => Err(AssemblerError::UnsupportedInstruction { line }),
        }
    }
}

/// Assembles a whole source text.
///
/// # Errors
///
/// Stops at the first [`AssemblerError`].
#[tracing::instrument(skip(source))]
pub fn assemble(source: &str) -> Result<Vec<Word>, AssemblerError> {
    let mut assembler = Assembler::new();
    let mut program = Vec::new();

    for (index, line) in source.lines().enumerate() {
        debug!(number = index + 1, "assembling {line:?}");
        program.extend(assembler.assemble_line(line, index + 1)?);
    }

    Ok(program)
}

fn parse_register(token: &str, line: usize) -> Result<Reg, AssemblerError> {
    token.parse().map_err(|_| AssemblerError::InvalidRegister {
        name: token.to_string(),
        line,
    })
}

fn parse_immediate(token: &str, line: usize) -> Result<i32, AssemblerError> {
    token.parse().map_err(|_| AssemblerError::InvalidImmediate {
        token: token.to_string(),
        line,
    })
}

/// Parses the `imm(reg)` memory-operand form. An empty immediate part, as in
/// `(sp)`, means zero.
fn parse_base_operand(token: &str, line: usize) -> Result<(i32, Reg), AssemblerError> {
    let invalid = || AssemblerError::InvalidOperand {
        token: token.to_string(),
        line,
    };

    let open = token.find('(').ok_or_else(invalid)?;
    let close = token.find(')').ok_or_else(invalid)?;
    if open >= close {
        return Err(invalid());
    }

    let imm_text = &token[..open];
    let imm = if imm_text.is_empty() {
        0
    } else {
        parse_immediate(imm_text, line)?
    };
    let base = parse_register(&token[open + 1..close], line)?;
    Ok((imm, base))
}
