//! Machine constants.
//!
//! Sizes shared by the pager, the loader and the executor. The values
//! describing the guest address space are part of the contract with
//! code images produced by external tools.

/// Bit shift for page size (12 bits = 4 KiB pages).
pub const PAGE_SHIFT: u64 = 12;

/// Page and frame size in bytes.
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Mask selecting the offset within a page.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Size of a machine word (RV64) in bytes.
pub const WORD_SIZE: u64 = 8;

/// Size of one fixed-width instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 32;

/// Size of every guest virtual address space (4 GiB).
pub const VIRTUAL_MEMORY_SIZE: u64 = 1 << 32;

/// Virtual address at which the code segment is loaded.
pub const CODE_START: u64 = 0x1_0000;

/// Default maximum stack size of a context.
pub const DEFAULT_STACK_SIZE: u64 = 64 * 1024;

/// Default capacity of the physical frame pool (16 MiB of frames).
pub const DEFAULT_FRAMES: usize = 4096;

/// Default scheduling quantum in instructions.
pub const DEFAULT_QUANTUM: u64 = 10_000;

/// Longest path accepted by the `openat` syscall, including the NUL.
pub const MAX_PATH_LENGTH: u64 = 4096;
