//! RISC-U architectural state.
//!
//! This module contains the register file of a context and the trap values
//! that flow from the executor back to the owning hypervisor.

/// General-Purpose Register file implementation.
pub mod gpr;

/// Trap and exit status definitions.
pub mod trap;
