//! RISC-U calling convention and syscall numbers.

/// Hardwired zero.
pub const REG_ZERO: usize = 0;
/// Return address.
pub const REG_RA: usize = 1;
/// Stack pointer.
pub const REG_SP: usize = 2;
/// Global pointer.
pub const REG_GP: usize = 3;
/// Thread pointer.
pub const REG_TP: usize = 4;
/// Temporaries.
pub const REG_T0: usize = 5;
pub const REG_T1: usize = 6;
pub const REG_T2: usize = 7;
/// Frame pointer.
pub const REG_S0: usize = 8;
pub const REG_S1: usize = 9;
pub const REG_S2: usize = 18;
/// Argument and return registers.
pub const REG_A0: usize = 10;
pub const REG_A1: usize = 11;
pub const REG_A2: usize = 12;
pub const REG_A3: usize = 13;
pub const REG_A4: usize = 14;
pub const REG_A5: usize = 15;
pub const REG_A6: usize = 16;
/// Syscall number register.
pub const REG_A7: usize = 17;
pub const REG_T3: usize = 28;
pub const REG_T4: usize = 29;
pub const REG_T5: usize = 30;
pub const REG_T6: usize = 31;

/// ABI names indexed by register number.
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Returns the ABI name of register `index`, or `"?"` when out of range.
pub fn register_name(index: usize) -> &'static str {
    ABI_NAMES.get(index).copied().unwrap_or("?")
}

/// Returns the index of the register named `name` (ABI or `xN` form).
pub fn register_index(name: &str) -> Option<usize> {
    if let Some(pos) = ABI_NAMES.iter().position(|n| *n == name) {
        return Some(pos);
    }
    if name == "fp" {
        return Some(REG_S0);
    }
    name.strip_prefix('x')
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n < ABI_NAMES.len())
}

/// Syscall numbers (Linux RISC-V numbering).
pub mod syscall {
    pub const SYS_OPENAT: u64 = 56;
    pub const SYS_READ: u64 = 63;
    pub const SYS_WRITE: u64 = 64;
    pub const SYS_EXIT: u64 = 93;
    pub const SYS_SCHED_YIELD: u64 = 124;
    pub const SYS_KILL: u64 = 129;
    pub const SYS_BRK: u64 = 214;
    pub const SYS_FORK: u64 = 220;
    pub const SYS_WAIT: u64 = 260;

    /// Returns the mnemonic of a syscall number.
    pub fn name(id: u64) -> &'static str {
        match id {
            SYS_OPENAT => "openat",
            SYS_READ => "read",
            SYS_WRITE => "write",
            SYS_EXIT => "exit",
            SYS_SCHED_YIELD => "sched_yield",
            SYS_KILL => "kill",
            SYS_BRK => "brk",
            SYS_FORK => "fork",
            SYS_WAIT => "wait",
            _ => "unknown",
        }
    }
}

/// Guest `openat` flag bits.
pub mod open_flags {
    pub const O_RDONLY: u64 = 0;
    pub const O_WRONLY: u64 = 0x1;
    pub const O_RDWR: u64 = 0x2;
    pub const O_ACCMODE: u64 = 0x3;
    pub const O_CREAT: u64 = 0x40;
    pub const O_TRUNC: u64 = 0x200;
    pub const O_APPEND: u64 = 0x400;
}

/// Standard file descriptors.
pub const STDIN_FD: u64 = 0;
pub const STDOUT_FD: u64 = 1;
pub const STDERR_FD: u64 = 2;
