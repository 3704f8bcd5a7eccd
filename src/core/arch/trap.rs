//! Traps and exit statuses.
//!
//! A [`Trap`] is what a machine hands back to the hypervisor that switched
//! to a context: the quantum ran out, the guest asked for a syscall, or the
//! guest faulted. An [`ExitStatus`] is the final word on a terminated
//! context.

use crate::common::error::{Fault, EXITCODE_KILLED};
use std::fmt;

/// Reason control returned from a context to its hypervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// The instruction quantum expired.
    TimerInterrupt,
    /// The context executed `ecall`; its pc still points at the `ecall`.
    EnvironmentCall,
    /// The context faulted at `pc`.
    Fault {
        /// What went wrong.
        fault: Fault,
        /// Address of the faulting instruction.
        pc: u64,
    },
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::TimerInterrupt => write!(f, "timer interrupt"),
            Trap::EnvironmentCall => write!(f, "environment call"),
            Trap::Fault { fault, pc } => write!(f, "{} at pc {:#x}", fault, pc),
        }
    }
}

/// Terminal status of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// The context called `exit` with this code.
    Exited(i64),
    /// The context was terminated by a guest-level fault.
    Faulted {
        /// The fault.
        fault: Fault,
        /// Address of the faulting instruction.
        pc: u64,
    },
    /// The context was killed by its parent.
    Killed,
}

impl ExitStatus {
    /// Returns the integer exit code.
    pub fn code(&self) -> i64 {
        match self {
            ExitStatus::Exited(code) => *code,
            ExitStatus::Faulted { fault, .. } => fault.exit_code(),
            ExitStatus::Killed => EXITCODE_KILLED,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exited with code {}", code),
            ExitStatus::Faulted { fault, pc } => {
                write!(f, "terminated by {} at pc {:#x}", fault, pc)
            }
            ExitStatus::Killed => write!(f, "killed"),
        }
    }
}
