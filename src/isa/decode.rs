//! RISC-U instruction decoder.

use super::instruction::InstructionBits;
use super::opcodes::{self, funct3, funct7};
use crate::common::Fault;

/// A decoded RISC-U instruction.
///
/// Register operands are indices into the register file; immediates are
/// sign-extended to 64 bits. `Lui` carries the already shifted value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Lui { rd: usize, imm: i64 },
    Addi { rd: usize, rs1: usize, imm: i64 },
    Ld { rd: usize, rs1: usize, imm: i64 },
    Sd { rs1: usize, rs2: usize, imm: i64 },
    Add { rd: usize, rs1: usize, rs2: usize },
    Sub { rd: usize, rs1: usize, rs2: usize },
    Mul { rd: usize, rs1: usize, rs2: usize },
    Divu { rd: usize, rs1: usize, rs2: usize },
    Remu { rd: usize, rs1: usize, rs2: usize },
    Sltu { rd: usize, rs1: usize, rs2: usize },
    Beq { rs1: usize, rs2: usize, imm: i64 },
    Jal { rd: usize, imm: i64 },
    Jalr { rd: usize, rs1: usize, imm: i64 },
    Ecall,
}

/// Decodes one instruction word.
///
/// # Errors
///
/// Returns `Fault::IllegalInstruction` carrying the word for anything
/// outside the RISC-U subset, including valid RV64 instructions the subset
/// does not contain.
pub fn decode(word: u32) -> Result<Instruction, Fault> {
    let illegal = Fault::IllegalInstruction(word);
    let (rd, rs1, rs2) = (word.rd(), word.rs1(), word.rs2());

    let inst = match word.opcode() {
        opcodes::OP_LUI => Instruction::Lui {
            rd,
            imm: word.imm_u(),
        },
        opcodes::OP_IMM if word.funct3() == funct3::ADD_SUB => Instruction::Addi {
            rd,
            rs1,
            imm: word.imm_i(),
        },
        opcodes::OP_LOAD if word.funct3() == funct3::DOUBLE => Instruction::Ld {
            rd,
            rs1,
            imm: word.imm_i(),
        },
        opcodes::OP_STORE if word.funct3() == funct3::DOUBLE => Instruction::Sd {
            rs1,
            rs2,
            imm: word.imm_s(),
        },
        opcodes::OP_REG => match (word.funct3(), word.funct7()) {
            (funct3::ADD_SUB, funct7::DEFAULT) => Instruction::Add { rd, rs1, rs2 },
            (funct3::ADD_SUB, funct7::SUB) => Instruction::Sub { rd, rs1, rs2 },
            (funct3::ADD_SUB, funct7::M_EXTENSION) => Instruction::Mul { rd, rs1, rs2 },
            (funct3::DIVU, funct7::M_EXTENSION) => Instruction::Divu { rd, rs1, rs2 },
            (funct3::REMU, funct7::M_EXTENSION) => Instruction::Remu { rd, rs1, rs2 },
            (funct3::SLTU, funct7::DEFAULT) => Instruction::Sltu { rd, rs1, rs2 },
            _ => return Err(illegal),
        },
        opcodes::OP_BRANCH if word.funct3() == funct3::BEQ => Instruction::Beq {
            rs1,
            rs2,
            imm: word.imm_b(),
        },
        opcodes::OP_JAL => Instruction::Jal {
            rd,
            imm: word.imm_j(),
        },
        opcodes::OP_JALR if word.funct3() == funct3::ADD_SUB => Instruction::Jalr {
            rd,
            rs1,
            imm: word.imm_i(),
        },
        opcodes::OP_SYSTEM if word == opcodes::ECALL => Instruction::Ecall,
        _ => return Err(illegal),
    };

    Ok(inst)
}
