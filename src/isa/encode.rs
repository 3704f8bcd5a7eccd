//! Instruction encoders.
//!
//! The inverse of [`decode`](super::decode::decode): every encoder here
//! produces a word that decodes back to the same instruction. Immediates
//! are truncated to the width of their field.

use super::decode::Instruction;
use super::opcodes::{self, funct3, funct7};

fn r_type(f7: u32, rs2: usize, rs1: usize, f3: u32, rd: usize, opcode: u32) -> u32 {
    (f7 << 25) | ((rs2 as u32) << 20) | ((rs1 as u32) << 15) | (f3 << 12) | ((rd as u32) << 7) | opcode
}

fn i_type(imm: i64, rs1: usize, f3: u32, rd: usize, opcode: u32) -> u32 {
    (((imm as u32) & 0xfff) << 20) | ((rs1 as u32) << 15) | (f3 << 12) | ((rd as u32) << 7) | opcode
}

fn s_type(imm: i64, rs2: usize, rs1: usize, f3: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7f) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (f3 << 12)
        | ((imm & 0x1f) << 7)
        | opcode
}

fn b_type(imm: i64, rs2: usize, rs1: usize, f3: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3f) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (f3 << 12)
        | (((imm >> 1) & 0xf) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | opcode
}

fn u_type(imm: i64, rd: usize, opcode: u32) -> u32 {
    ((imm as u32) & 0xffff_f000) | ((rd as u32) << 7) | opcode
}

fn j_type(imm: i64, rd: usize, opcode: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3ff) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xff) << 12)
        | ((rd as u32) << 7)
        | opcode
}

impl Instruction {
    /// Encodes the instruction into its 32-bit word.
    pub fn encode(&self) -> u32 {
        match *self {
            Instruction::Lui { rd, imm } => u_type(imm, rd, opcodes::OP_LUI),
            Instruction::Addi { rd, rs1, imm } => {
                i_type(imm, rs1, funct3::ADD_SUB, rd, opcodes::OP_IMM)
            }
            Instruction::Ld { rd, rs1, imm } => i_type(imm, rs1, funct3::DOUBLE, rd, opcodes::OP_LOAD),
            Instruction::Sd { rs1, rs2, imm } => {
                s_type(imm, rs2, rs1, funct3::DOUBLE, opcodes::OP_STORE)
            }
            Instruction::Add { rd, rs1, rs2 } => {
                r_type(funct7::DEFAULT, rs2, rs1, funct3::ADD_SUB, rd, opcodes::OP_REG)
            }
            Instruction::Sub { rd, rs1, rs2 } => {
                r_type(funct7::SUB, rs2, rs1, funct3::ADD_SUB, rd, opcodes::OP_REG)
            }
            Instruction::Mul { rd, rs1, rs2 } => {
                r_type(funct7::M_EXTENSION, rs2, rs1, funct3::ADD_SUB, rd, opcodes::OP_REG)
            }
            Instruction::Divu { rd, rs1, rs2 } => {
                r_type(funct7::M_EXTENSION, rs2, rs1, funct3::DIVU, rd, opcodes::OP_REG)
            }
            Instruction::Remu { rd, rs1, rs2 } => {
                r_type(funct7::M_EXTENSION, rs2, rs1, funct3::REMU, rd, opcodes::OP_REG)
            }
            Instruction::Sltu { rd, rs1, rs2 } => {
                r_type(funct7::DEFAULT, rs2, rs1, funct3::SLTU, rd, opcodes::OP_REG)
            }
            Instruction::Beq { rs1, rs2, imm } => b_type(imm, rs2, rs1, funct3::BEQ, opcodes::OP_BRANCH),
            Instruction::Jal { rd, imm } => j_type(imm, rd, opcodes::OP_JAL),
            Instruction::Jalr { rd, rs1, imm } => {
                i_type(imm, rs1, funct3::ADD_SUB, rd, opcodes::OP_JALR)
            }
            Instruction::Ecall => opcodes::ECALL,
        }
    }
}

/// `lui rd, imm` where `imm` is the upper 20 bits.
pub fn lui(rd: usize, upper: i64) -> u32 {
    Instruction::Lui { rd, imm: upper << 12 }.encode()
}

/// `addi rd, rs1, imm`.
pub fn addi(rd: usize, rs1: usize, imm: i64) -> u32 {
    Instruction::Addi { rd, rs1, imm }.encode()
}

/// `ld rd, imm(rs1)`.
pub fn ld(rd: usize, rs1: usize, imm: i64) -> u32 {
    Instruction::Ld { rd, rs1, imm }.encode()
}

/// `sd rs2, imm(rs1)`.
pub fn sd(rs2: usize, rs1: usize, imm: i64) -> u32 {
    Instruction::Sd { rs1, rs2, imm }.encode()
}

/// `add rd, rs1, rs2`.
pub fn add(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Add { rd, rs1, rs2 }.encode()
}

/// `sub rd, rs1, rs2`.
pub fn sub(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Sub { rd, rs1, rs2 }.encode()
}

/// `mul rd, rs1, rs2`.
pub fn mul(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Mul { rd, rs1, rs2 }.encode()
}

/// `divu rd, rs1, rs2`.
pub fn divu(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Divu { rd, rs1, rs2 }.encode()
}

/// `remu rd, rs1, rs2`.
pub fn remu(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Remu { rd, rs1, rs2 }.encode()
}

/// `sltu rd, rs1, rs2`.
pub fn sltu(rd: usize, rs1: usize, rs2: usize) -> u32 {
    Instruction::Sltu { rd, rs1, rs2 }.encode()
}

/// `beq rs1, rs2, imm` (byte offset from this instruction).
pub fn beq(rs1: usize, rs2: usize, imm: i64) -> u32 {
    Instruction::Beq { rs1, rs2, imm }.encode()
}

/// `jal rd, imm` (byte offset from this instruction).
pub fn jal(rd: usize, imm: i64) -> u32 {
    Instruction::Jal { rd, imm }.encode()
}

/// `jalr rd, imm(rs1)`.
pub fn jalr(rd: usize, rs1: usize, imm: i64) -> u32 {
    Instruction::Jalr { rd, rs1, imm }.encode()
}

/// `ecall`.
pub fn ecall() -> u32 {
    opcodes::ECALL
}

/// Loads a 32-bit signed constant into `rd` with `lui` + `addi`.
///
/// Emits a single `addi` when the value fits in 12 bits. Values above
/// `0x7fff_f7ff` round the upper part to `0x80000`, which `lui` sign-extends,
/// so they end up negative in a 64-bit register.
pub fn load_immediate(rd: usize, value: i32) -> Vec<u32> {
    let value = value as i64;
    if (-2048..2048).contains(&value) {
        return vec![addi(rd, 0, value)];
    }
    let upper = (value + 0x800) >> 12;
    let lower = value - (upper << 12);
    if lower == 0 {
        vec![lui(rd, upper)]
    } else {
        vec![lui(rd, upper), addi(rd, rd, lower)]
    }
}
