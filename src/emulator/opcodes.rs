//! Implemented operations for the LC 3.
//!
//! All address and value arithmetic wraps modulo 2^16.
//! PC already points to the next instruction when an operation is executed.
use crate::emulator::instruction::{JumpTarget, Operand};
use crate::hardware::console::Console;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Registers, from_binary};
use std::io;

fn second_operand(operand: Operand, r: &Registers) -> u16 {
    match operand {
        Operand::Register(sr2) => r.get(sr2).as_binary(),
        Operand::Immediate(imm5) => imm5,
    }
}

/// ADD: Mathematical addition in 2 variants
/// - DR is set with result of SR 1 + SR 2
/// ```text
///  15__12__11_9__8_6___5___4_3__2_0_
/// | 0001 |  DR | SR1 | 0 | 00 | SR2 |
///  ---------------------------------
/// ```
/// - DR is set with result of SR 1 + sign extended immediate
/// ```text
///  15__12__11_9__8_6___5___4___0_
/// | 0001 |  DR | SR1 | 1 |  IMM5 |
///  ------------------------------
/// ```
pub fn add(dr: u8, sr1: u8, operand: Operand, r: &mut Registers) {
    let sum = r
        .get(sr1)
        .as_binary()
        .wrapping_add(second_operand(operand, r));
    r.set(dr, from_binary(sum));
    r.update_conditional_register(dr);
}
/// AND: bit-wise AND in 2 variants
/// - DR is set with result of SR 1 AND SR 2
/// ```text
///  15__12__11_9__8_6___5___4_3__2_0_
/// | 0101 |  DR | SR1 | 0 | 00 | SR2 |
///  ---------------------------------
/// ```
/// - DR is set with result of SR 1 AND sign extended immediate
/// ```text
///  15__12__11_9__8_6___5___4___0_
/// | 0101 |  DR | SR1 | 1 |  IMM5 |
///  ------------------------------
/// ```
pub fn and(dr: u8, sr1: u8, operand: Operand, r: &mut Registers) {
    let res = r.get(sr1).as_binary() & second_operand(operand, r);
    r.set(dr, from_binary(res));
    r.update_conditional_register(dr);
}

/// NOT: bit-wise complement of the value in SR
/// ```text
///  15__12__11_9__8_6___5___0_
/// | 1001 |  DR |  SR | 11111 |
///  --------------------------
/// ```
pub fn not(dr: u8, sr: u8, r: &mut Registers) {
    r.set(dr, from_binary(!r.get(sr).as_binary()));
    r.update_conditional_register(dr);
}
/// BR: Conditional Branch
/// Adds the sign extended offset to PC if one of the `nzp` bits matches the current
/// [`ConditionFlag`](crate::hardware::registers::ConditionFlag). With no bit set it never
/// branches.
/// ```text
///  15__12__11_9___8_______0_
/// | 0000 |  nzp | PCoffset9 |
///  -------------------------
/// ```
pub fn br(nzp: u8, pc_offset: u16, r: &mut Registers) {
    if nzp & r.get_conditional_register().nzp_mask() != 0 {
        r.set_pc(address_by_pc_offset(pc_offset, r));
    }
}
/// JSR: Jump to Sub-Routine.
/// Two variants:
/// - JSR to `PCOffset11`
/// ```text
///  15__12__11_10_________0
/// | 0100 | 1 | PCOffset11 |
///  -----------------------
/// ```
/// - JSRR: JSR to location in `BaseR`
/// ```text
///  15__12__11_9__8___6___5____0_
/// | 0100 | 000 | BaseR | 000000 |
///  -----------------------------
/// ```
/// The former PC is saved in R7.
pub fn jsr(target: JumpTarget, r: &mut Registers) {
    let return_address = r.pc();
    let new_pc = match target {
        JumpTarget::PcOffset(pc_offset) => address_by_pc_offset(pc_offset, r),
        JumpTarget::BaseRegister(base_r) => r.get(base_r).as_binary(),
    };
    r.set(7, return_address);
    r.set_pc(new_pc);
}
/// JMP or RET operation.
/// - JMP sets the PC to the value of register `BaseR`
/// ```text
///  15__12__11_9___8_6____5____0_
/// | 1100 | 000 | BaseR | 000000 |
///  -----------------------------
/// ```
/// - RET same as JMP, but special case for returning from JSR where former PC is saved in R7.
pub fn jmp_or_ret(base_r: u8, r: &mut Registers) {
    r.set_pc(r.get(base_r).as_binary());
}

/// LD: Loads content of memory address of PC + sign extended offset into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 0010 |  DR  | PCoffset9 |
///  -------------------------
/// ```
///
/// # Errors
/// - see [`Memory::read`]
pub fn ld(
    dr: u8,
    pc_offset: u16,
    r: &mut Registers,
    memory: &mut Memory,
    console: &mut impl Console,
) -> io::Result<()> {
    let value = memory.read(address_by_pc_offset(pc_offset, r), console)?;
    r.set(dr, from_binary(value));
    r.update_conditional_register(dr);
    Ok(())
}

/// LDI: Load indirect.
/// Calculates memory address of PC + sign extended offset and reads another address from there,
/// the content of the memory at that indirectly loaded address is put into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 1010 |  DR  | PCoffset9 |
///  -------------------------
/// ```
///
/// # Errors
/// - see [`Memory::read`]
pub fn ldi(
    dr: u8,
    pc_offset: u16,
    r: &mut Registers,
    memory: &mut Memory,
    console: &mut impl Console,
) -> io::Result<()> {
    let value_address = memory.read(address_by_pc_offset(pc_offset, r), console)?;
    let value = memory.read(value_address, console)?;
    r.set(dr, from_binary(value));
    r.update_conditional_register(dr);
    Ok(())
}
/// LDR: Load address from base register and adds sign extended offset to load the memory content
/// from there into DR.
/// ```text
///  15__12__11_9__8___6____5____0_
/// | 0110 |  DR | BaseR | offset6 |
///  ------------------------------
/// ```
///
/// # Errors
/// - see [`Memory::read`]
pub fn ldr(
    dr: u8,
    base_r: u8,
    offset: u16,
    r: &mut Registers,
    memory: &mut Memory,
    console: &mut impl Console,
) -> io::Result<()> {
    let value = memory.read(address_by_baser_offset(base_r, offset, r), console)?;
    r.set(dr, from_binary(value));
    r.update_conditional_register(dr);
    Ok(())
}

fn address_by_pc_offset(pc_offset: u16, r: &Registers) -> u16 {
    r.pc().as_binary().wrapping_add(pc_offset)
}
fn address_by_baser_offset(base_r: u8, offset: u16, r: &Registers) -> u16 {
    r.get(base_r).as_binary().wrapping_add(offset)
}

/// LEA: Load Effective Address loads PC + sign extended offset into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 1110 |  DR  | PCoffset9 |
///  -------------------------
/// ```
pub fn lea(dr: u8, pc_offset: u16, r: &mut Registers) {
    r.set(dr, from_binary(address_by_pc_offset(pc_offset, r)));
    r.update_conditional_register(dr);
}
/// ST: Store. The contents of the SR are written to memory address PC + sign extended offset.
/// ```text
///  15__12__11_9___8_______0_
/// | 0011 |  SR  | PCoffset9 |
///  -------------------------
/// ```
pub fn st(sr: u8, pc_offset: u16, r: &Registers, memory: &mut Memory) {
    memory.write(address_by_pc_offset(pc_offset, r), r.get(sr).as_binary());
}
/// STI: Store Indirect. The contents of the SR are written to the address which is loaded from
/// memory address PC + sign extended offset.
/// ```text
///  15__12__11_9___8_______0_
/// | 1011 |  SR  | PCoffset9 |
///  -------------------------
/// ```
///
/// # Errors
/// - see [`Memory::read`]
pub fn sti(
    sr: u8,
    pc_offset: u16,
    r: &Registers,
    memory: &mut Memory,
    console: &mut impl Console,
) -> io::Result<()> {
    let store_address = memory.read(address_by_pc_offset(pc_offset, r), console)?;
    memory.write(store_address, r.get(sr).as_binary());
    Ok(())
}
/// STR: Store contents of SR to memory address of base register plus sign extended offset.
/// ```text
///  15__12__11_9__8___6____5____0_
/// | 0111 |  SR | BaseR | offset6 |
///  ------------------------------
/// ```
pub fn str(sr: u8, base_r: u8, offset: u16, r: &Registers, memory: &mut Memory) {
    memory.write(address_by_baser_offset(base_r, offset, r), r.get(sr).as_binary());
}
