use crate::isa::{opcodes, Format};

/// Everything the encoder needs to know about a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mnemonic {
    pub format: Format,
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
}

/// Resolves a (lowercased) mnemonic. `lui`, `auipc` and `jal` resolve but
/// their formats are rejected later: no operand arity reaches them.
pub(crate) fn lookup(name: &str) -> Option<Mnemonic> {
    use Format::{B, I, J, R, S, U};

    let (format, opcode, funct3, funct7) = match name {
        "lui" => (U, opcodes::LUI, 0b000, 0),
        "auipc" => (U, opcodes::AUIPC, 0b000, 0),
        "jal" => (J, opcodes::JAL, 0b000, 0),
        "jalr" => (I, opcodes::JALR, 0b000, 0),

        "beq" => (B, opcodes::BRANCH, 0b000, 0),
        "bne" => (B, opcodes::BRANCH, 0b001, 0),
        "blt" => (B, opcodes::BRANCH, 0b100, 0),
        "bge" => (B, opcodes::BRANCH, 0b101, 0),
        "bltu" => (B, opcodes::BRANCH, 0b110, 0),
        "bgeu" => (B, opcodes::BRANCH, 0b111, 0),

        "lb" => (I, opcodes::LOAD, 0b000, 0),
        "lh" => (I, opcodes::LOAD, 0b001, 0),
        "lw" => (I, opcodes::LOAD, 0b010, 0),
        "lbu" => (I, opcodes::LOAD, 0b100, 0),
        "lhu" => (I, opcodes::LOAD, 0b101, 0),

        "sb" => (S, opcodes::STORE, 0b000, 0),
        "sh" => (S, opcodes::STORE, 0b001, 0),
        "sw" => (S, opcodes::STORE, 0b010, 0),

        "addi" => (I, opcodes::OP_IMM, 0b000, 0),
        "slti" => (I, opcodes::OP_IMM, 0b010, 0),
        "sltiu" => (I, opcodes::OP_IMM, 0b011, 0),
        "xori" => (I, opcodes::OP_IMM, 0b100, 0),
        "ori" => (I, opcodes::OP_IMM, 0b110, 0),
        "andi" => (I, opcodes::OP_IMM, 0b111, 0),
        "slli" => (I, opcodes::OP_IMM, 0b001, 0b000_0000),
        "srli" => (I, opcodes::OP_IMM, 0b101, 0b000_0000),
        "srai" => (I, opcodes::OP_IMM, 0b101, 0b010_0000),

        "add" => (R, opcodes::OP, 0b000, 0b000_0000),
        "sub" => (R, opcodes::OP, 0b000, 0b010_0000),
        "sll" => (R, opcodes::OP, 0b001, 0b000_0000),
        "slt" => (R, opcodes::OP, 0b010, 0b000_0000),
        "sltu" => (R, opcodes::OP, 0b011, 0b000_0000),
        "xor" => (R, opcodes::OP, 0b100, 0b000_0000),
        "srl" => (R, opcodes::OP, 0b101, 0b000_0000),
        "sra" => (R, opcodes::OP, 0b101, 0b010_0000),
        "or" => (R, opcodes::OP, 0b110, 0b000_0000),
        "and" => (R, opcodes::OP, 0b111, 0b000_0000),

        _ => return None,
    };

    Some(Mnemonic {
        format,
        opcode,
        funct3,
        funct7,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn formats_and_fields() {
        let addi = lookup("addi").unwrap();
        assert_eq!(addi.format, Format::I);
        assert_eq!(addi.opcode, opcodes::OP_IMM);
        assert_eq!(addi.funct3, 0b000);

        let sub = lookup("sub").unwrap();
        assert_eq!(sub.format, Format::R);
        assert_eq!(sub.funct7, 0b010_0000);

        let bge = lookup("bge").unwrap();
        assert_eq!(bge.format, Format::B);
        assert_eq!(bge.funct3, 0b101);

        assert_eq!(lookup("mul"), None);
        // lookup is case-sensitive; the tokenizer lowercases beforehand
        assert_eq!(lookup("ADDI"), None);
    }
}
