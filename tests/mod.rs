//! Test module organization.
//!
//! This module organizes all integration tests for the RISC-U hypervisor.

/// ALU, load/store unit and register file tests.
mod alu_tests;




/// Instruction decoding, encoding and disassembly tests.
mod isa_tests;




/// Scheduling, fork/wait and fault handling tests.
mod scheduler_tests;

/// Guest system call tests.
mod syscall_tests;
