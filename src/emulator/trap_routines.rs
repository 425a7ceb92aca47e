use crate::errors::ExecutionError;
use crate::hardware::console::Console;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Registers, from_binary};
use std::io;
use std::ops::ControlFlow;

pub const IN_PROMPT: &str = "Enter a character: ";
pub const HALT_MESSAGE: &str = "HALT\n";

/// Vectors of the implemented trap routines, taken from the low 8 bits of a TRAP instruction.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapVector {
    GetC = 0x20,
    Out = 0x21,
    PutS = 0x22,
    In = 0x23,
    PutSp = 0x24,
    Halt = 0x25,
}

/// Saves PC in R7 and executes the trap routine for `vector`.
/// Unknown vectors do nothing.
pub fn trap(
    vector: u8,
    regs: &mut Registers,
    mem: &Memory,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    regs.set(7, regs.pc());
    let Some(trap_vector) = TrapVector::n(vector) else {
        log::debug!("Ignoring unknown trap vector {vector:#04X}");
        return ControlFlow::Continue(());
    };
    match trap_vector {
        TrapVector::GetC => get_c(regs, console),
        TrapVector::Out => out(regs, console),
        TrapVector::PutS => put_s(regs, mem, console),
        TrapVector::In => in_trap(regs, console),
        TrapVector::PutSp => put_sp(regs, mem, console),
        TrapVector::Halt => halt(console),
    }
}

fn read_character_from_console(
    regs: &mut Registers,
    console: &mut impl Console,
    echo: bool,
) -> io::Result<()> {
    let c = console.read_char_blocking()?;
    if echo {
        console.write_char(c)?;
    }
    regs.set(0, from_binary(u16::from(c)));
    regs.update_conditional_register(0);
    Ok(())
}

/// GETC: Read a single character from the keyboard. The character is not echoed onto the console.
///
/// Its ASCII code is copied into R0. The high eight bits of R0 are cleared.
pub fn get_c(
    regs: &mut Registers,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    continue_or_break(read_character_from_console(regs, console, false))
}

/// IN: Print a prompt on the screen and read a single character echoed back from the keyboard.
///
/// Otherwise, like 0x20 GETC.
pub fn in_trap(
    regs: &mut Registers,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    continue_or_break(
        console
            .write_str(IN_PROMPT)
            .and_then(|()| read_character_from_console(regs, console, true)),
    )
}

/// OUT: Write a character in R0[7:0] to the console display.
pub fn out(regs: &Registers, console: &mut impl Console) -> ControlFlow<Result<(), ExecutionError>> {
    let [low, _high] = regs.get(0).as_binary().to_le_bytes();
    continue_or_break(console.write_char(low))
}

fn put_one_char_per_u16(input: u16, console: &mut impl Console) -> io::Result<()> {
    let [low, _high] = input.to_le_bytes();
    console.write_char(low)
}

fn put_two_chars_per_u16(input: u16, console: &mut impl Console) -> io::Result<()> {
    let [low, high] = input.to_le_bytes();
    console.write_char(low)?;
    if high != 0 {
        console.write_char(high)?;
    }
    Ok(())
}

fn put<C: Console>(
    regs: &Registers,
    mem: &Memory,
    console: &mut C,
    handle_word: fn(u16, &mut C) -> io::Result<()>,
) -> ControlFlow<Result<(), ExecutionError>> {
    let mut address = regs.get(0).as_binary();
    while mem[address] != 0 {
        continue_or_break(handle_word(mem[address], console))?;
        address = address.wrapping_add(1);
    }
    ControlFlow::Continue(())
}

/// PUTS: print null-delimited string with one character per word starting from R0's address.
pub fn put_s(
    regs: &Registers,
    mem: &Memory,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, console, put_one_char_per_u16)
}

/// PUTSP: Packed version of PUTS
///
/// The ASCII code contained in bits [7:0] of a memory location is written to the console first.
/// The second character in bits [15:8] is only written if it is not 0x00.
/// Writing terminates with a 0x0000 word, so a word with only the high byte set ends the string.
pub fn put_sp(
    regs: &Registers,
    mem: &Memory,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, console, put_two_chars_per_u16)
}

/// HALT: End program and print a message
pub fn halt(console: &mut impl Console) -> ControlFlow<Result<(), ExecutionError>> {
    continue_or_break(console.write_str(HALT_MESSAGE))?;
    ControlFlow::Break(Ok(()))
}

fn continue_or_break(res: io::Result<()>) -> ControlFlow<Result<(), ExecutionError>> {
    match res {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => ControlFlow::Break(Err(ExecutionError::from(e))),
    }
}
