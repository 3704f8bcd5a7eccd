//! Instruction word field extraction.

/// Accessors for the fields of a 32-bit RISC-V instruction word.
pub trait InstructionBits {
    /// Bits 6:0.
    fn opcode(self) -> u32;
    /// Bits 11:7.
    fn rd(self) -> usize;
    /// Bits 19:15.
    fn rs1(self) -> usize;
    /// Bits 24:20.
    fn rs2(self) -> usize;
    /// Bits 14:12.
    fn funct3(self) -> u32;
    /// Bits 31:25.
    fn funct7(self) -> u32;
    /// Sign-extended I-type immediate.
    fn imm_i(self) -> i64;
    /// Sign-extended S-type immediate.
    fn imm_s(self) -> i64;
    /// Sign-extended B-type immediate (always even).
    fn imm_b(self) -> i64;
    /// U-type immediate, already shifted and sign-extended from 32 bits.
    fn imm_u(self) -> i64;
    /// Sign-extended J-type immediate (always even).
    fn imm_j(self) -> i64;
}

impl InstructionBits for u32 {
    #[inline(always)]
    fn opcode(self) -> u32 {
        self & 0x7f
    }

    #[inline(always)]
    fn rd(self) -> usize {
        ((self >> 7) & 0x1f) as usize
    }

    #[inline(always)]
    fn rs1(self) -> usize {
        ((self >> 15) & 0x1f) as usize
    }

    #[inline(always)]
    fn rs2(self) -> usize {
        ((self >> 20) & 0x1f) as usize
    }

    #[inline(always)]
    fn funct3(self) -> u32 {
        (self >> 12) & 0x7
    }

    #[inline(always)]
    fn funct7(self) -> u32 {
        (self >> 25) & 0x7f
    }

    #[inline(always)]
    fn imm_i(self) -> i64 {
        ((self as i32) >> 20) as i64
    }

    #[inline(always)]
    fn imm_s(self) -> i64 {
        ((((self as i32) >> 25) << 5) | ((self >> 7) & 0x1f) as i32) as i64
    }

    #[inline(always)]
    fn imm_b(self) -> i64 {
        let imm = (((self as i32) >> 31) << 12)
            | (((self >> 7) & 0x1) << 11) as i32
            | (((self >> 25) & 0x3f) << 5) as i32
            | (((self >> 8) & 0xf) << 1) as i32;
        imm as i64
    }

    #[inline(always)]
    fn imm_u(self) -> i64 {
        (self & 0xffff_f000) as i32 as i64
    }

    #[inline(always)]
    fn imm_j(self) -> i64 {
        let imm = (((self as i32) >> 31) << 20)
            | (((self >> 12) & 0xff) << 12) as i32
            | (((self >> 20) & 0x1) << 11) as i32
            | (((self >> 21) & 0x3ff) << 1) as i32;
        imm as i64
    }
}
