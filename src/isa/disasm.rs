//! Instruction disassembler.

use super::abi::register_name as r;
use super::decode::{decode, Instruction};
use std::fmt;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Lui { rd, imm } => write!(f, "lui {}, {:#x}", r(rd), (imm >> 12) & 0xfffff),
            Instruction::Addi { rd, rs1, imm } => write!(f, "addi {}, {}, {}", r(rd), r(rs1), imm),
            Instruction::Ld { rd, rs1, imm } => write!(f, "ld {}, {}({})", r(rd), imm, r(rs1)),
            Instruction::Sd { rs1, rs2, imm } => write!(f, "sd {}, {}({})", r(rs2), imm, r(rs1)),
            Instruction::Add { rd, rs1, rs2 } => write!(f, "add {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Instruction::Sub { rd, rs1, rs2 } => write!(f, "sub {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Instruction::Mul { rd, rs1, rs2 } => write!(f, "mul {}, {}, {}", r(rd), r(rs1), r(rs2)),
            Instruction::Divu { rd, rs1, rs2 } => {
                write!(f, "divu {}, {}, {}", r(rd), r(rs1), r(rs2))
            }
            Instruction::Remu { rd, rs1, rs2 } => {
                write!(f, "remu {}, {}, {}", r(rd), r(rs1), r(rs2))
            }
            Instruction::Sltu { rd, rs1, rs2 } => {
                write!(f, "sltu {}, {}, {}", r(rd), r(rs1), r(rs2))
            }
            Instruction::Beq { rs1, rs2, imm } => write!(f, "beq {}, {}, {}", r(rs1), r(rs2), imm),
            Instruction::Jal { rd, imm } => write!(f, "jal {}, {}", r(rd), imm),
            Instruction::Jalr { rd, rs1, imm } => write!(f, "jalr {}, {}({})", r(rd), imm, r(rs1)),
            Instruction::Ecall => write!(f, "ecall"),
        }
    }
}

/// Disassembles a raw word, rendering words outside the subset as data.
pub fn disassemble(word: u32) -> String {
    match decode(word) {
        Ok(inst) => inst.to_string(),
        Err(_) => format!(".word {:#010x}", word),
    }
}

/// Formats one trace line: pc, raw word, mnemonic.
pub fn trace_line(pc: u64, word: u32) -> String {
    format!("{:#010x}: {:08x}  {}", pc, word, disassemble(word))
}
