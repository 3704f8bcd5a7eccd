//! RISC-U opcode map.
//!
//! Changing anything in this file changes the meaning of existing code
//! images; bump [`ENCODING_VERSION`] when doing so.

/// Version of the instruction encoding and image layout.
pub const ENCODING_VERSION: u32 = 1;

/// LUI opcode.
pub const OP_LUI: u32 = 0b011_0111;
/// OP-IMM opcode (ADDI).
pub const OP_IMM: u32 = 0b001_0011;
/// LOAD opcode (LD).
pub const OP_LOAD: u32 = 0b000_0011;
/// STORE opcode (SD).
pub const OP_STORE: u32 = 0b010_0011;
/// OP opcode (register-register arithmetic).
pub const OP_REG: u32 = 0b011_0011;
/// BRANCH opcode (BEQ).
pub const OP_BRANCH: u32 = 0b110_0011;
/// JAL opcode.
pub const OP_JAL: u32 = 0b110_1111;
/// JALR opcode.
pub const OP_JALR: u32 = 0b110_0111;
/// SYSTEM opcode (ECALL).
pub const OP_SYSTEM: u32 = 0b111_0011;

/// The only SYSTEM word in the subset.
pub const ECALL: u32 = 0x0000_0073;

/// funct3 values.
pub mod funct3 {
    /// ADDI, ADD, SUB, MUL, BEQ, JALR.
    pub const ADD_SUB: u32 = 0b000;
    /// LD, SD, SLTU.
    pub const DOUBLE: u32 = 0b011;
    /// SLTU shares its funct3 with 64-bit loads and stores.
    pub const SLTU: u32 = 0b011;
    /// DIVU.
    pub const DIVU: u32 = 0b101;
    /// REMU.
    pub const REMU: u32 = 0b111;
    /// BEQ.
    pub const BEQ: u32 = 0b000;
}

/// funct7 values.
pub mod funct7 {
    /// ADD, SLTU.
    pub const DEFAULT: u32 = 0b000_0000;
    /// SUB.
    pub const SUB: u32 = 0b010_0000;
    /// MUL, DIVU, REMU.
    pub const M_EXTENSION: u32 = 0b000_0001;
}
