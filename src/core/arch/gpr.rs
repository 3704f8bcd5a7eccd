//! RISC-U General-Purpose Register File.
//!
//! This module implements the General-Purpose Register (GPR) file, containing
//! 32 registers (x0-x31). It enforces the architectural invariant that
//! register x0 is always hardwired to zero.

use crate::common::constants::NUM_REGISTERS;
use crate::isa::abi::ABI_NAMES;
use std::fmt;

/// General-Purpose Register file.
///
/// Contains 32 general-purpose registers (x0-x31) used for integer
/// operations. Register x0 is hardwired to zero and cannot be modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gpr {
    regs: [u64; NUM_REGISTERS],
}

impl Default for Gpr {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpr {
    /// Creates a new general-purpose register file with all registers initialized to zero.
    pub fn new() -> Self {
        Self {
            regs: [0; NUM_REGISTERS],
        }
    }

    /// Reads a general-purpose register value.
    ///
    /// Register x0 (index 0) always returns 0 regardless of storage.
    pub fn read(&self, idx: usize) -> u64 {
        if idx == 0 {
            0
        } else {
            self.regs[idx]
        }
    }

    /// Writes a value to a general-purpose register.
    ///
    /// # Note
    ///
    /// Writes to register x0 (index 0) are silently ignored as x0 is hardwired to zero.
    pub fn write(&mut self, idx: usize, val: u64) {
        if idx != 0 {
            self.regs[idx] = val;
        }
    }

    /// Returns a copy of all 32 registers, x0 first.
    pub fn snapshot(&self) -> [u64; NUM_REGISTERS] {
        let mut regs = self.regs;
        regs[0] = 0;
        regs
    }

    /// Renders the register file two registers per line with ABI names.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..NUM_REGISTERS).step_by(2) {
            writeln!(
                f,
                "x{:<2} {:<4}={:#018x}  x{:<2} {:<4}={:#018x}",
                i,
                ABI_NAMES[i],
                self.read(i),
                i + 1,
                ABI_NAMES[i + 1],
                self.read(i + 1)
            )?;
        }
        Ok(())
    }
}
