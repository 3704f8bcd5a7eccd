//! Instruction Set Architecture Definitions.
//!
//! This module is the shared, versioned description of the RISC-U
//! encoding: the subset of RV64I/M that compiled guest programs use. The
//! decoder in this crate and any external assembler or translator must
//! agree on [`opcodes::ENCODING_VERSION`]; code images carry it.
//!
//! # Instructions
//!
//! * `lui`, `addi`
//! * `ld`, `sd`
//! * `add`, `sub`, `mul`, `divu`, `remu`, `sltu`
//! * `beq`, `jal`, `jalr`
//! * `ecall`

/// Register ABI names and the syscall number table.
pub mod abi;

/// Instruction decoding.
pub mod decode;

/// Instruction disassembler for tracing and debugging.
pub mod disasm;

/// Instruction encoding helpers.
pub mod encode;

/// Bit-field extraction from raw instruction words.
pub mod instruction;

/// Opcode, funct3 and funct7 constants and the encoding version.
pub mod opcodes;

pub use decode::{decode, Instruction};
pub use instruction::InstructionBits;
