//! Unit tests for the ALU, address generation and the register file.

use riscu_hypervisor::common::Fault;
use riscu_hypervisor::core::arch::gpr::Gpr;
use riscu_hypervisor::core::units::alu::{Alu, AluOp};
use riscu_hypervisor::core::units::lsu::Lsu;

/// Tests wrapping 64-bit addition.
#[test]
fn test_alu_add() {
    assert_eq!(Alu::execute(AluOp::Add, 10, 20), Ok(30));
    assert_eq!(Alu::execute(AluOp::Add, u64::MAX, 1), Ok(0));
}

/// Tests wrapping 64-bit subtraction.
#[test]
fn test_alu_sub() {
    assert_eq!(Alu::execute(AluOp::Sub, 30, 10), Ok(20));
    assert_eq!(Alu::execute(AluOp::Sub, 0, 1), Ok(u64::MAX));
}

/// Tests that multiplication keeps the low 64 bits.
#[test]
fn test_alu_mul() {
    assert_eq!(Alu::execute(AluOp::Mul, 6, 7), Ok(42));
    assert_eq!(
        Alu::execute(AluOp::Mul, 0x1_0000_0000, 0x1_0000_0001),
        Ok(0x1_0000_0000)
    );
}

/// Tests unsigned division and remainder.
#[test]
fn test_alu_divu_remu() {
    assert_eq!(Alu::execute(AluOp::Divu, 43, 5), Ok(8));
    assert_eq!(Alu::execute(AluOp::Remu, 43, 5), Ok(3));
    // -1 as unsigned
    assert_eq!(Alu::execute(AluOp::Divu, u64::MAX, 2), Ok(u64::MAX / 2));
}

/// Tests that a zero divisor faults instead of producing a value.
#[test]
fn test_alu_division_by_zero() {
    assert_eq!(
        Alu::execute(AluOp::Divu, 7, 0),
        Err(Fault::DivisionByZero)
    );
    assert_eq!(
        Alu::execute(AluOp::Remu, 7, 0),
        Err(Fault::DivisionByZero)
    );
}

/// Tests unsigned set-less-than.
#[test]
fn test_alu_sltu() {
    assert_eq!(Alu::execute(AluOp::Sltu, 1, 2), Ok(1));
    assert_eq!(Alu::execute(AluOp::Sltu, 2, 1), Ok(0));
    assert_eq!(Alu::execute(AluOp::Sltu, 2, 2), Ok(0));
    assert_eq!(Alu::execute(AluOp::Sltu, 1, u64::MAX), Ok(1));
}

/// Tests doubleword address generation.
#[test]
fn test_lsu_effective_address() {
    assert_eq!(
        Lsu::effective_address(0x11000, 8).map(|a| a.val()),
        Ok(0x11008)
    );
    assert_eq!(
        Lsu::effective_address(0x11010, -16).map(|a| a.val()),
        Ok(0x11000)
    );
}

/// Tests that unaligned doubleword addresses fault with the address.
#[test]
fn test_lsu_misaligned() {
    assert_eq!(
        Lsu::effective_address(0x11000, 4).map(|a| a.val()),
        Err(Fault::MisalignedAccess(0x11004))
    );
    assert_eq!(
        Lsu::effective_address(0x11001, 0).map(|a| a.val()),
        Err(Fault::MisalignedAccess(0x11001))
    );
}

/// Tests that x0 is hardwired to zero.
#[test]
fn test_gpr_zero_register() {
    let mut gpr = Gpr::new();
    gpr.write(0, 0xdead_beef);
    gpr.write(5, 0xdead_beef);
    assert_eq!(gpr.read(0), 0);
    assert_eq!(gpr.read(5), 0xdead_beef);
    assert_eq!(gpr.snapshot()[0], 0);
    assert_eq!(gpr.snapshot()[5], 0xdead_beef);
}

/// Tests the register dump format.
#[test]
fn test_gpr_dump() {
    let mut gpr = Gpr::new();
    gpr.write(10, 42);
    let dump = gpr.dump();
    assert_eq!(dump.lines().count(), 16);
    assert!(dump.contains("a0  =0x000000000000002a"));
}
