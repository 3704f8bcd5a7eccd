//! Guest Faults and Host Errors.
//!
//! Two error families exist. A [`Fault`] is raised by guest code and is
//! delivered to the owning hypervisor as a trap value; it terminates the
//! faulting context but never the host. A [`HostError`] is fatal to the
//! hosting process and always names the context (and program counter)
//! involved when there is one.

use crate::core::context::ContextId;
use thiserror::Error;

/// Result type of every host-level operation.
pub type HostResult<T> = Result<T, HostError>;

/// Exit code of a context terminated by a segmentation fault.
pub const EXITCODE_SEGMENTATION_FAULT: i64 = 6;
/// Exit code of a context whose page could not be backed by a frame.
pub const EXITCODE_PAGE_TABLE_EXHAUSTED: i64 = 7;
/// Exit code of a context that divided by zero.
pub const EXITCODE_DIVISION_BY_ZERO: i64 = 8;
/// Exit code of a context that executed an unknown instruction word.
pub const EXITCODE_ILLEGAL_INSTRUCTION: i64 = 9;
/// Exit code of a context that issued an unknown syscall.
pub const EXITCODE_SYSCALL_ARGUMENT_INVALID: i64 = 10;
/// Exit code of a context that performed a misaligned access.
pub const EXITCODE_MISALIGNED_ACCESS: i64 = 11;
/// Exit code of a context killed by its parent.
pub const EXITCODE_KILLED: i64 = 137;

/// Guest-level fault taxonomy.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The instruction word is not part of the RISC-U subset.
    #[error("illegal instruction {0:#010x}")]
    IllegalInstruction(u32),

    /// A fetch or word access was not naturally aligned.
    #[error("misaligned access at {0:#x}")]
    MisalignedAccess(u64),

    /// An access fell outside the context's segments or violated page
    /// permissions.
    #[error("segmentation fault at {0:#x}")]
    SegmentationFault(u64),

    /// `divu` or `remu` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// No physical frame was available to back a page.
    #[error("page table exhausted: no free physical frame")]
    PageTableExhausted,

    /// The syscall number (carried) is not part of the ABI.
    #[error("invalid syscall {0}")]
    SyscallArgumentInvalid(u64),
}

impl Fault {
    /// Returns the exit code a context terminated by this fault reports.
    pub fn exit_code(&self) -> i64 {
        match self {
            Fault::SegmentationFault(_) => EXITCODE_SEGMENTATION_FAULT,
            Fault::PageTableExhausted => EXITCODE_PAGE_TABLE_EXHAUSTED,
            Fault::DivisionByZero => EXITCODE_DIVISION_BY_ZERO,
            Fault::IllegalInstruction(_) => EXITCODE_ILLEGAL_INSTRUCTION,
            Fault::SyscallArgumentInvalid(_) => EXITCODE_SYSCALL_ARGUMENT_INVALID,
            Fault::MisalignedAccess(_) => EXITCODE_MISALIGNED_ACCESS,
        }
    }
}

/// Host-level errors. Any of these ends the hosting run.
#[derive(Error, Debug)]
pub enum HostError {
    /// The frame pool ran dry while backing a page of a running context.
    #[error("physical memory exhausted in context {context} at pc {pc:#x}")]
    ResourceExhausted {
        /// Context that touched the page.
        context: ContextId,
        /// Program counter of the faulting instruction.
        pc: u64,
    },

    /// A context id that this machine does not host.
    #[error("unknown context {0}")]
    UnknownContext(ContextId),

    /// The scheduler reached a state that cannot make progress or is
    /// inconsistent.
    #[error("scheduler invariant violated by context {context} at pc {pc:#x}: {reason}")]
    SchedulerInvariant {
        /// Context involved.
        context: ContextId,
        /// Its program counter.
        pc: u64,
        /// What went wrong.
        reason: String,
    },

    /// A replayed syscall does not match the next trace record.
    #[error(
        "replay diverged at record {index}: expected syscall {expected_syscall} at {expected_pc:#x}, \
         got syscall {syscall} at {pc:#x}"
    )]
    ReplayDivergence {
        /// Position in the trace log.
        index: usize,
        /// Recorded program counter.
        expected_pc: u64,
        /// Recorded syscall id.
        expected_syscall: u64,
        /// Program counter of the replayed syscall.
        pc: u64,
        /// Id of the replayed syscall.
        syscall: u64,
    },

    /// A hypervisor-internal syscall produced a different result than the
    /// one recorded.
    #[error(
        "replay diverged at record {index}: syscall {syscall} returned {result}, recorded {expected}"
    )]
    ReplayResultMismatch {
        /// Position in the trace log.
        index: usize,
        /// Syscall id.
        syscall: u64,
        /// Recorded result.
        expected: i64,
        /// Result of re-execution.
        result: i64,
    },

    /// The guest issued more syscalls than the trace recorded.
    #[error("replay trace exhausted: syscall {syscall} at {pc:#x} has no record")]
    ReplayExhausted {
        /// Program counter of the unmatched syscall.
        pc: u64,
        /// Id of the unmatched syscall.
        syscall: u64,
    },

    /// A code image or trace file is malformed or has the wrong version.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A context could not be created.
    #[error("load failed: {0}")]
    LoadFailed(String),

    /// Virtualization levels start at 1.
    #[error("invalid virtualization level {0}")]
    InvalidLevel(u32),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Trace file could not be (de)serialized.
    #[error("invalid trace file: {0}")]
    Trace(#[from] serde_json::Error),

    /// Host I/O failure outside of guest syscalls.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
