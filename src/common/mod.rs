//! Common utilities and types used throughout the emulator.
//!
//! This module provides fundamental types for addresses, memory access
//! kinds, error handling and constants that are shared by the ISA, the
//! executor, the pager and the hypervisor.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Constants describing the machine and the guest address space.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Guest faults and host errors.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use data::AccessType;
pub use error::{Fault, HostError, HostResult};

pub use constants::{PAGE_SHIFT, PAGE_SIZE, WORD_SIZE};
