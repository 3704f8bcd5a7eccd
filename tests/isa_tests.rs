//! Unit tests for RISC-U instruction decoding, encoding and disassembly.

use riscu_hypervisor::common::Fault;
use riscu_hypervisor::isa::abi::{self, syscall};
use riscu_hypervisor::isa::disasm::{disassemble, trace_line};
use riscu_hypervisor::isa::encode::*;
use riscu_hypervisor::isa::{decode, Instruction, InstructionBits};

/// Tests decoding of I-type instructions with negative immediates.
#[test]
fn test_decode_addi_negative() {
    assert_eq!(
        decode(addi(abi::REG_A0, abi::REG_ZERO, -5)),
        Ok(Instruction::Addi {
            rd: 10,
            rs1: 0,
            imm: -5
        })
    );
}

/// Tests that `lui` carries the shifted, sign-extended upper immediate.
#[test]
fn test_decode_lui() {
    assert_eq!(
        decode(lui(abi::REG_T0, 0x12345)),
        Ok(Instruction::Lui {
            rd: 5,
            imm: 0x1234_5000
        })
    );
    assert_eq!(
        decode(lui(abi::REG_T0, 0x80000)),
        Ok(Instruction::Lui {
            rd: 5,
            imm: -0x8000_0000
        })
    );
}

/// Tests load and store operand placement.
#[test]
fn test_decode_ld_sd() {
    assert_eq!(
        decode(ld(abi::REG_A0, abi::REG_SP, 24)),
        Ok(Instruction::Ld {
            rd: 10,
            rs1: 2,
            imm: 24
        })
    );
    assert_eq!(
        decode(sd(abi::REG_A1, abi::REG_SP, -16)),
        Ok(Instruction::Sd {
            rs1: 2,
            rs2: 11,
            imm: -16
        })
    );
}

/// Tests branch and jump offsets in both directions.
#[test]
fn test_decode_control_flow() {
    assert_eq!(
        decode(beq(abi::REG_T0, abi::REG_T1, -8)),
        Ok(Instruction::Beq {
            rs1: 5,
            rs2: 6,
            imm: -8
        })
    );
    assert_eq!(
        decode(jal(abi::REG_RA, 2048)),
        Ok(Instruction::Jal { rd: 1, imm: 2048 })
    );
    assert_eq!(
        decode(jal(abi::REG_ZERO, -4096)),
        Ok(Instruction::Jal { rd: 0, imm: -4096 })
    );
    assert_eq!(
        decode(jalr(abi::REG_ZERO, abi::REG_RA, 0)),
        Ok(Instruction::Jalr {
            rd: 0,
            rs1: 1,
            imm: 0
        })
    );
}

/// Tests the register-register arithmetic group, including the M subset.
#[test]
fn test_decode_register_ops() {
    let cases = [
        (add(10, 11, 12), Instruction::Add { rd: 10, rs1: 11, rs2: 12 }),
        (sub(10, 11, 12), Instruction::Sub { rd: 10, rs1: 11, rs2: 12 }),
        (mul(10, 11, 12), Instruction::Mul { rd: 10, rs1: 11, rs2: 12 }),
        (divu(10, 11, 12), Instruction::Divu { rd: 10, rs1: 11, rs2: 12 }),
        (remu(10, 11, 12), Instruction::Remu { rd: 10, rs1: 11, rs2: 12 }),
        (sltu(10, 11, 12), Instruction::Sltu { rd: 10, rs1: 11, rs2: 12 }),
    ];
    for (word, expected) in cases {
        assert_eq!(decode(word), Ok(expected));
        assert_eq!(expected.encode(), word);
    }
}

/// Tests the `ecall` encoding.
#[test]
fn test_decode_ecall() {
    assert_eq!(ecall(), 0x0000_0073);
    assert_eq!(decode(ecall()), Ok(Instruction::Ecall));
}

/// Tests that words outside the subset are illegal, including valid RV64
/// instructions the subset leaves out.
#[test]
fn test_decode_illegal() {
    assert_eq!(decode(0), Err(Fault::IllegalInstruction(0)));

    // xor a0, a1, a2
    assert_eq!(
        decode(0x00c5_c533),
        Err(Fault::IllegalInstruction(0x00c5_c533))
    );

    // ebreak
    assert_eq!(
        decode(0x0010_0073),
        Err(Fault::IllegalInstruction(0x0010_0073))
    );

    // lw a0, 0(a1): the ld encoding with funct3 = 2
    let lw = (ld(10, 11, 0) & !(0x7 << 12)) | (0x2 << 12);
    assert_eq!(decode(lw), Err(Fault::IllegalInstruction(lw)));

    // addi encoding with funct3 = 1 (slli)
    let slli = addi(10, 11, 3) | (0x1 << 12);
    assert!(decode(slli).is_err());
}

/// Tests raw field extraction.
#[test]
fn test_instruction_bits() {
    let word = sd(abi::REG_A1, abi::REG_SP, -16);
    assert_eq!(word.opcode(), 0b010_0011);
    assert_eq!(word.rs1(), 2);
    assert_eq!(word.rs2(), 11);
    assert_eq!(word.funct3(), 0b011);
    assert_eq!(word.imm_s(), -16);
}

/// Tests `load_immediate` instruction selection.
#[test]
fn test_load_immediate_shapes() {
    assert_eq!(load_immediate(5, 100), vec![addi(5, 0, 100)]);
    assert_eq!(load_immediate(5, -2048), vec![addi(5, 0, -2048)]);
    assert_eq!(load_immediate(5, 0x11000), vec![lui(5, 0x11)]);
    assert_eq!(load_immediate(5, 0x1001).len(), 2);
}

/// Tests that `lui` + `addi` reconstructs the constant, including values
/// whose low part is negative.
#[test]
fn test_load_immediate_values() {
    for value in [0x1001, 0x1234_5678, 0x7fff_f7ff, -0x1234_5678, 0x800, 0xfff] {
        let mut acc: i64 = 0;
        for word in load_immediate(5, value) {
            match decode(word) {
                Ok(Instruction::Lui { imm, .. }) => acc = imm,
                Ok(Instruction::Addi { rs1, imm, .. }) => {
                    acc = if rs1 == 0 { imm } else { acc + imm };
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(acc, value as i64, "value {:#x}", value);
    }
}

/// Tests disassembly with ABI register names.
#[test]
fn test_disassemble() {
    assert_eq!(disassemble(divu(10, 11, 12)), "divu a0, a1, a2");
    assert_eq!(disassemble(ld(10, 2, 8)), "ld a0, 8(sp)");
    assert_eq!(disassemble(sd(11, 2, -8)), "sd a1, -8(sp)");
    assert_eq!(disassemble(ecall()), "ecall");
    assert_eq!(disassemble(0xffff_ffff), ".word 0xffffffff");
}

/// Tests the instruction trace line format.
#[test]
fn test_trace_line() {
    assert_eq!(
        trace_line(0x10000, ecall()),
        "0x00010000: 00000073  ecall"
    );
}

/// Tests register names and the syscall table.
#[test]
fn test_abi_names() {
    assert_eq!(abi::register_name(0), "zero");
    assert_eq!(abi::register_name(10), "a0");
    assert_eq!(abi::register_index("sp"), Some(2));
    assert_eq!(abi::register_index("x31"), Some(31));
    assert_eq!(abi::register_index("x32"), None);
    assert_eq!(syscall::name(syscall::SYS_WRITE), "write");
    assert_eq!(syscall::name(syscall::SYS_WAIT), "wait");
    assert_eq!(syscall::name(1), "unknown");
}
