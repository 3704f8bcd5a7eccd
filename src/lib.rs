//! RISC-U Emulator and Self-Virtualizing Hypervisor.
//!
//! This crate interprets RISC-U machine code (a small RV64IM subset used by
//! self-hosting teaching toolchains), isolates guest programs in paged
//! address spaces, schedules them preemptively, emulates a small syscall
//! ABI and can host itself: a hypervisor is a machine, so levels stack.
//!
//! # Architecture
//!
//! * **Level 0**: the `Cpu` interprets instructions and owns all memory.
//! * **Levels 1+**: each `Hypervisor` schedules its contexts on the level
//!   below and services their syscalls.
//! * **Memory**: a bounded frame pool, per-context page tables, demand or
//!   fully-mapped paging.
//!
//! # Modules
//!
//! * `common`: Shared types, constants, and error handling.
//! * `config`: Configuration loading and parsing.
//! * `core`: The `Machine` contract, contexts and the interpreter.
//! * `isa`: Instruction Set Architecture definitions.
//! * `sim`: Hypervisor, syscalls, loaders, replay, debugging.
//! * `soc`: Frame pool, pager and host I/O backends.
//! * `stats`: Per-level statistics.

/// Shared types, constants and error handling.
///
/// Provides addresses, access kinds, the guest fault taxonomy and the host
/// error type used throughout the crate.
pub mod common;

/// Configuration for memory, scheduling, replay and logging.
///
/// Parses TOML configuration files; every field has a default.
pub mod config;

/// Execution engines: the `Machine` trait, contexts and the interpreter.
pub mod core;

/// RISC-U encoding, decoder, encoder and disassembler.
pub mod isa;

/// Hypervisor, syscall layer, image loading, record/replay and debugging.
pub mod sim;

/// Guest memory management and host I/O backends.
pub mod soc;

/// Statistics collection and reporting.
pub mod stats;
