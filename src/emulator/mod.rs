//! Fetch, decode and execute loop tying memory, registers, operations and trap routines together.
pub mod image;
pub mod instruction;
pub mod opcodes;
pub mod trap_routines;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::emulator::instruction::{Instruction, Operation};
use crate::errors::{ExecutionError, LoadProgramError};
use crate::hardware::console::Console;
use crate::hardware::memory::Memory;
use crate::hardware::registers::Registers;
use std::fmt::Debug;
use std::ops::ControlFlow;
use std::path::Path;

/// The public facing emulator used to run LC-3 programs.
pub struct Emulator<C: Console> {
    pub(crate) memory: Memory,
    pub(crate) registers: Registers,
    console: C,
    running: bool,
}

impl<C: Console> Debug for Emulator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("registers", &self.registers)
            .field("memory", &self.memory)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl<C: Console> Emulator<C> {
    /// Creates an emulator with zeroed memory and registers, PC pointing to `0x3000`.
    #[must_use]
    pub fn new(console: C) -> Self {
        Self {
            memory: Memory::new(),
            registers: Registers::new(),
            console,
            running: true,
        }
    }
    /// Loads `program` whose first word is the origin address.
    /// Can be called multiple times, later programs overwrite earlier ones.
    ///
    /// # Errors
    /// - Program is missing valid .ORIG header
    /// - Program does not fit into memory after its origin
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), LoadProgramError> {
        let (&origin, rest) = program
            .split_first()
            .ok_or(LoadProgramError::ProgramMissingOrigHeader)?;
        self.memory.load_image(origin, rest)?;
        log::debug!("Loaded {} words at {origin:#06X}", rest.len());
        Ok(())
    }
    /// Reads the object image at `path` and loads it like [`Emulator::load_program`].
    ///
    /// # Errors
    /// - [`LoadProgramError::ImageLoadError`] naming `path` for every failure of
    ///   [`image::read_image_file`] and [`Emulator::load_program`]
    pub fn load_program_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadProgramError> {
        let path = path.as_ref();
        log::debug!("Loading image {}", path.display());
        image::read_image_file(path)
            .and_then(|program| self.load_program(&program))
            .map_err(|e| match e {
                LoadProgramError::ImageLoadError { .. } => e,
                _ => LoadProgramError::ImageLoadError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                },
            })
    }
    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }
    #[must_use]
    pub const fn console(&self) -> &C {
        &self.console
    }
    pub const fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }
    /// Resets registers so the loaded program can be executed again, memory is kept.
    pub fn reset_registers(&mut self) {
        self.registers = Registers::new();
        self.running = true;
    }

    /// Executes instructions until the program halts.
    ///
    /// # Errors
    /// - Illegal opcode
    /// - Console input or output failed
    /// - Execution was interrupted
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        loop {
            if let ControlFlow::Break(res) = self.step() {
                return res;
            }
        }
    }

    /// Fetches, decodes and executes a single instruction.
    ///
    /// PC is incremented before execution, so all PC relative offsets are relative to the next
    /// instruction. Breaks with `Ok(())` once halted without fetching anything.
    pub fn step(&mut self) -> ControlFlow<Result<(), ExecutionError>> {
        if !self.running {
            return ControlFlow::Break(Ok(()));
        }
        let res = self.fetch_and_execute();
        if res.is_break() {
            self.running = false;
        }
        res
    }

    fn fetch_and_execute(&mut self) -> ControlFlow<Result<(), ExecutionError>> {
        match self.console.check_interrupted() {
            Ok(false) => {}
            Ok(true) => return ControlFlow::Break(Err(ExecutionError::Interrupted)),
            Err(e) => return ControlFlow::Break(Err(e.into())),
        }
        let address = self.registers.increment_pc();
        let bits = match self.memory.read(address, &mut self.console) {
            Ok(bits) => bits,
            Err(e) => return ControlFlow::Break(Err(e.into())),
        };
        let instruction = Instruction::from(bits);
        log::trace!("{address:#06X}: {bits:#06X} {instruction:?}");
        match instruction.decode(address) {
            Ok(operation) => self.execute_operation(operation),
            Err(e) => {
                log::debug!("{e}");
                ControlFlow::Break(Err(e))
            }
        }
    }

    fn execute_operation(&mut self, operation: Operation) -> ControlFlow<Result<(), ExecutionError>> {
        let r = &mut self.registers;
        let memory = &mut self.memory;
        let console = &mut self.console;
        let io_res = match operation {
            Operation::Add { dr, sr1, operand } => {
                opcodes::add(dr, sr1, operand, r);
                Ok(())
            }
            Operation::And { dr, sr1, operand } => {
                opcodes::and(dr, sr1, operand, r);
                Ok(())
            }
            Operation::Not { dr, sr } => {
                opcodes::not(dr, sr, r);
                Ok(())
            }
            Operation::Br { nzp, pc_offset } => {
                opcodes::br(nzp, pc_offset, r);
                Ok(())
            }
            Operation::Jmp { base_r } => {
                opcodes::jmp_or_ret(base_r, r);
                Ok(())
            }
            Operation::Jsr { target } => {
                opcodes::jsr(target, r);
                Ok(())
            }
            Operation::Ld { dr, pc_offset } => opcodes::ld(dr, pc_offset, r, memory, console),
            Operation::Ldi { dr, pc_offset } => opcodes::ldi(dr, pc_offset, r, memory, console),
            Operation::Ldr { dr, base_r, offset } => {
                opcodes::ldr(dr, base_r, offset, r, memory, console)
            }
            Operation::Lea { dr, pc_offset } => {
                opcodes::lea(dr, pc_offset, r);
                Ok(())
            }
            Operation::St { sr, pc_offset } => {
                opcodes::st(sr, pc_offset, r, memory);
                Ok(())
            }
            Operation::Sti { sr, pc_offset } => opcodes::sti(sr, pc_offset, r, memory, console),
            Operation::Str { sr, base_r, offset } => {
                opcodes::str(sr, base_r, offset, r, memory);
                Ok(())
            }
            Operation::Trap { vector } => {
                return trap_routines::trap(vector, r, memory, console);
            }
        };
        match io_res {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(Err(e.into())),
        }
    }
}

#[expect(clippy::unusual_byte_groupings)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::test_helpers::{FakeConsole, fake_emulator};
    use crate::hardware::registers::{ConditionFlag, from_binary, from_decimal};
    use googletest::prelude::*;

    const HALT: u16 = 0xF025;
    const PUTS: u16 = 0xF022;

    #[gtest]
    pub fn test_load_program_empty() {
        let mut emu = Emulator::new(FakeConsole::new(b""));
        expect_that!(
            emu.load_program(&[]).unwrap_err().to_string(),
            eq("Program is missing valid .ORIG header")
        );
    }
    #[gtest]
    pub fn test_load_program_at_origin() {
        let mut emu = Emulator::new(FakeConsole::new(b""));
        emu.load_program(&[0x4000, 0x1234, 0x5678]).unwrap();
        expect_that!(emu.memory()[0x4000], eq(0x1234));
        expect_that!(emu.memory()[0x4001], eq(0x5678));
        expect_that!(emu.registers().pc(), eq(from_binary(0x3000)));
    }
    #[gtest]
    pub fn test_load_program_too_large() {
        let mut emu = Emulator::new(FakeConsole::new(b""));
        let mut program = vec![0x0u16; 0x1_0000 - 0x3000 + 2];
        program[0] = 0x3000;
        expect_that!(
            emu.load_program(&program).unwrap_err().to_string(),
            eq("Program too long, got 53249 u16 instructions at origin 0x3000 while limit is 53248")
        );
    }
    #[gtest]
    pub fn test_hello_world() {
        let mut emu = fake_emulator(
            &[
                0b1110_000_000000010, // LEA R0, msg
                PUTS,
                HALT,
                u16::from(b'H'),
                u16::from(b'i'),
                0,
            ],
            b"",
        );
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.console().get_string(), eq("HiHALT\n"));
        expect_that!(emu.is_running(), eq(false));
        // HALT at 0x3002 was the last fetched instruction
        expect_that!(emu.registers().pc(), eq(from_binary(0x3003)));
        expect_that!(emu.registers().get(7), eq(from_binary(0x3003)));
    }
    #[gtest]
    pub fn test_no_fetch_after_halt() {
        let mut emu = fake_emulator(&[HALT, 0x1021], b"");
        expect_that!(emu.execute(), ok(eq(&())));
        assert!(emu.step().is_break());
        expect_that!(emu.registers().pc(), eq(from_binary(0x3001)));
        expect_that!(emu.registers().get(0), eq(from_binary(0)));
    }
    #[gtest]
    pub fn test_illegal_opcode_stops_immediately() {
        for illegal in [0x8000, 0xD123] {
            let mut emu = fake_emulator(
                &[
                    0b0001_000_000_1_00001, // ADD R0, R0, #1
                    illegal,
                    0b0001_000_000_1_00001,
                    HALT,
                ],
                b"",
            );
            expect_that!(
                emu.execute(),
                err(eq(&ExecutionError::IllegalOpcode {
                    opcode: (illegal >> 12) as u8,
                    address: 0x3001
                }))
            );
            expect_that!(emu.registers().get(0), eq(from_binary(1)));
            expect_that!(emu.console().get_string(), eq(""));
            expect_that!(emu.is_running(), eq(false));
        }
    }
    #[gtest]
    pub fn test_count_down_loop() {
        let mut emu = fake_emulator(
            &[
                0b0101_001_001_1_00000, // AND R1, R1, #0
                0b0001_001_001_1_00101, // ADD R1, R1, #5
                0b0001_010_010_1_00011, // loop: ADD R2, R2, #3
                0b0001_001_001_1_11111, // ADD R1, R1, #-1
                0b0000_001_111111101,   // BRp loop
                HALT,
            ],
            b"",
        );
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.registers().get(2), eq(from_decimal(15)));
        expect_that!(emu.registers().get(1), eq(from_decimal(0)));
        expect_that!(
            emu.registers().get_conditional_register(),
            eq(ConditionFlag::Zero)
        );
    }
    #[gtest]
    pub fn test_subroutine_call_and_return() {
        let mut emu = fake_emulator(
            &[
                0b0100_1_00000000010, // JSR sub (0x3003)
                0b0001_000_000_1_00010, // ADD R0, R0, #2
                HALT,
                0b0001_000_000_1_00001, // sub: ADD R0, R0, #1
                0b1100_000_111_000000,  // RET
            ],
            b"",
        );
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.registers().get(0), eq(from_decimal(3)));
    }
    #[gtest]
    pub fn test_keyboard_polling_program() {
        let mut emu = fake_emulator(
            &[
                0b1010_001_000000100, // poll: LDI R1, KBSR_PTR
                0b0000_011_111111110, // BRzp poll
                0b1010_000_000000011, // LDI R0, KBDR_PTR
                0xF021,               // OUT
                HALT,
                0xFE00, // KBSR_PTR
                0xFE02, // KBDR_PTR
            ],
            b"z",
        );
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.console().get_string(), eq("zHALT\n"));
    }
    #[gtest]
    pub fn test_self_modifying_code() {
        let mut emu = fake_emulator(
            &[
                0b0010_000_000000010, // LD R0, new_instr
                0b0011_000_000000000, // ST R0, next
                0x8000,               // next: illegal, replaced by HALT
                HALT,                 // new_instr
            ],
            b"",
        );
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.memory()[0x3002], eq(HALT));
    }
    #[gtest]
    pub fn test_unknown_trap_is_ignored() {
        let mut emu = fake_emulator(&[0xF0FF, 0b0001_000_000_1_00111, HALT], b"");
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.registers().get(0), eq(from_decimal(7)));
    }
    #[gtest]
    pub fn test_get_c_without_input_fails() {
        let mut emu = fake_emulator(&[0xF020, HALT], b"");
        expect_that!(
            emu.execute(),
            err(eq(&ExecutionError::IOInputOutputError(
                "unexpected end of file".into()
            )))
        );
    }
    #[gtest]
    pub fn test_interrupt_stops_before_next_fetch() {
        let mut emu = fake_emulator(
            &[
                0b0001_000_000_1_00001, // ADD R0, R0, #1
                0b0001_000_000_1_00001,
                HALT,
            ],
            b"",
        );
        assert!(emu.step().is_continue());
        emu.console_mut().interrupt();
        expect_that!(emu.execute(), err(eq(&ExecutionError::Interrupted)));
        expect_that!(emu.registers().pc(), eq(from_binary(0x3001)));
        expect_that!(emu.registers().get(0), eq(from_binary(1)));
        expect_that!(emu.is_running(), eq(false));
        expect_that!(emu.console().get_string(), eq(""));
    }
    #[gtest]
    pub fn test_load_program_file_errors_name_the_path() {
        let empty = tempfile::NamedTempFile::new().unwrap();
        let mut emu = Emulator::new(FakeConsole::new(b""));
        let path = empty.path().display().to_string();
        expect_that!(
            emu.load_program_file(empty.path()),
            err(eq(&LoadProgramError::ImageLoadError {
                path,
                message: "Program is missing valid .ORIG header".into()
            }))
        );
    }
    #[gtest]
    pub fn test_reset_registers_allows_rerun() {
        let mut emu = fake_emulator(&[0b0001_011_011_1_00001, HALT], b"");
        expect_that!(emu.execute(), ok(eq(&())));
        emu.reset_registers();
        expect_that!(emu.is_running(), eq(true));
        expect_that!(emu.execute(), ok(eq(&())));
        expect_that!(emu.registers().get(3), eq(from_decimal(1)));
        expect_that!(emu.console().get_string(), eq("HALT\nHALT\n"));
    }
}
