//! Execute stage.
//!
//! Applies one decoded instruction. The new register values and pc are only
//! committed after every fallible step (ALU, address generation, memory
//! access) has succeeded.

use crate::common::constants::INSTRUCTION_SIZE;
use crate::common::Fault;
use crate::core::arch::gpr::Gpr;
use crate::core::units::alu::{Alu, AluOp};
use crate::core::units::lsu::Lsu;
use crate::isa::Instruction;
use crate::soc::memory::Pager;

/// What the instruction asks of the machine after it completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next instruction.
    Next,
    /// `ecall`: hand control to the owning hypervisor. The pc is left on
    /// the `ecall`.
    EnvironmentCall,
}

fn alu_op(inst: &Instruction) -> Option<(AluOp, usize, usize, usize)> {
    match *inst {
        Instruction::Add { rd, rs1, rs2 } => Some((AluOp::Add, rd, rs1, rs2)),
        Instruction::Sub { rd, rs1, rs2 } => Some((AluOp::Sub, rd, rs1, rs2)),
        Instruction::Mul { rd, rs1, rs2 } => Some((AluOp::Mul, rd, rs1, rs2)),
        Instruction::Divu { rd, rs1, rs2 } => Some((AluOp::Divu, rd, rs1, rs2)),
        Instruction::Remu { rd, rs1, rs2 } => Some((AluOp::Remu, rd, rs1, rs2)),
        Instruction::Sltu { rd, rs1, rs2 } => Some((AluOp::Sltu, rd, rs1, rs2)),
        _ => None,
    }
}

/// Executes `inst` located at `*pc`.
pub fn execute_stage(
    inst: Instruction,
    regs: &mut Gpr,
    pc: &mut u64,
    pager: &mut Pager<'_>,
) -> Result<Flow, Fault> {
    let here = *pc;
    let mut next_pc = here.wrapping_add(INSTRUCTION_SIZE);

    if let Some((op, rd, rs1, rs2)) = alu_op(&inst) {
        let res = Alu::execute(op, regs.read(rs1), regs.read(rs2))?;
        regs.write(rd, res);
        *pc = next_pc;
        return Ok(Flow::Next);
    }

    match inst {
        Instruction::Lui { rd, imm } => regs.write(rd, imm as u64),
        Instruction::Addi { rd, rs1, imm } => {
            regs.write(rd, regs.read(rs1).wrapping_add(imm as u64))
        }
        Instruction::Ld { rd, rs1, imm } => {
            let addr = Lsu::effective_address(regs.read(rs1), imm)?;
            let val = pager.load_u64(addr.val())?;
            regs.write(rd, val);
        }
        Instruction::Sd { rs1, rs2, imm } => {
            let addr = Lsu::effective_address(regs.read(rs1), imm)?;
            pager.store_u64(addr.val(), regs.read(rs2))?;
        }
        Instruction::Beq { rs1, rs2, imm } => {
            if regs.read(rs1) == regs.read(rs2) {
                next_pc = here.wrapping_add(imm as u64);
            }
        }
        Instruction::Jal { rd, imm } => {
            regs.write(rd, next_pc);
            next_pc = here.wrapping_add(imm as u64);
        }
        Instruction::Jalr { rd, rs1, imm } => {
            let target = regs.read(rs1).wrapping_add(imm as u64) & !1;
            regs.write(rd, next_pc);
            next_pc = target;
        }
        Instruction::Ecall => return Ok(Flow::EnvironmentCall),
        _ => {}
    }

    *pc = next_pc;
    Ok(Flow::Next)
}
