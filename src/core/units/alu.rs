//! Arithmetic Logic Unit (ALU).
//!
//! This module implements the integer ALU used in the Execute stage. It
//! covers the RISC-U register-register operations, all on 64-bit operands
//! with wrapping arithmetic. Unsigned division by zero is a fault rather
//! than the RISC-V all-ones result.

use crate::common::Fault;

/// ALU operation selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication (low 64 bits).
    Mul,
    /// Unsigned division.
    Divu,
    /// Unsigned remainder.
    Remu,
    /// Set if less than, unsigned.
    Sltu,
}

/// Arithmetic Logic Unit (ALU) for integer operations.
pub struct Alu;

impl Alu {
    /// Executes an integer ALU operation on operands `a` and `b`.
    ///
    /// # Errors
    ///
    /// `Fault::DivisionByZero` for `Divu` and `Remu` with `b == 0`.
    pub fn execute(op: AluOp, a: u64, b: u64) -> Result<u64, Fault> {
        let res = match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Divu => a.checked_div(b).ok_or(Fault::DivisionByZero)?,
            AluOp::Remu => a.checked_rem(b).ok_or(Fault::DivisionByZero)?,
            AluOp::Sltu => (a < b) as u64,
        };
        Ok(res)
    }
}
