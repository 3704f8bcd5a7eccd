//! Functional units of the executor.

/// Arithmetic Logic Unit.
pub mod alu;

/// Load/Store Unit address generation.
pub mod lsu;
