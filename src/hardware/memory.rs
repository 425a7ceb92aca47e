use crate::errors::LoadProgramError;
use crate::hardware::console::Console;
use std::fmt::{Debug, Formatter};
use std::io;
use std::ops::{Index, IndexMut};

pub const PROGRAM_SECTION_START: u16 = 0x3000;
pub const MEMORY_SIZE_U16: usize = 1 << 16;

/// An abstraction for the LC-3 memory including memory mapped IO but excluding registers.
pub struct Memory {
    /// Index equals memory address
    data: Box<[u16]>,
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|w| **w != 0).count();
        write!(f, "Memory {{ non-zero words: {used} }}")
    }
}
/// Memory regions mapped to IO functionality.
#[repr(u16)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryMappedIOLocations {
    /// Keyboard Status Register
    Kbsr = 0xFE00,
    /// Keyboard Data Register
    Kbdr = 0xFE02,
}

/// Raw access without any memory mapped IO side effects.
impl Index<u16> for Memory {
    type Output = u16;
    fn index(&self, index: u16) -> &Self::Output {
        &self.data[usize::from(index)]
    }
}
impl IndexMut<u16> for Memory {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        &mut self.data[usize::from(index)]
    }
}
impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
impl Memory {
    pub const KEYBOARD_STATUS_REGISTER_SET: u16 = 1 << 15;
    pub const KEYBOARD_STATUS_REGISTER_UNSET: u16 = 0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            data: vec![0x0u16; MEMORY_SIZE_U16].into_boxed_slice(),
        }
    }
    /// Reads the word at `address`.
    ///
    /// Reading the keyboard status register polls `console` without blocking. If a character is
    /// available the status register gets its high bit set and the character is stored in the
    /// keyboard data register, otherwise the status register is cleared.
    /// Reading the keyboard data register does not poll and returns the last stored character.
    ///
    /// # Errors
    /// - polling or reading the console failed
    pub fn read(&mut self, address: u16, console: &mut impl Console) -> io::Result<u16> {
        if MemoryMappedIOLocations::n(address) == Some(MemoryMappedIOLocations::Kbsr) {
            if console.poll_input_ready()? {
                self[MemoryMappedIOLocations::Kbsr as u16] = Self::KEYBOARD_STATUS_REGISTER_SET;
                self[MemoryMappedIOLocations::Kbdr as u16] =
                    u16::from(console.read_char_blocking()?);
            } else {
                self[MemoryMappedIOLocations::Kbsr as u16] = Self::KEYBOARD_STATUS_REGISTER_UNSET;
            }
        }
        Ok(self[address])
    }
    /// Stores `value` at `address`, no region is protected.
    pub fn write(&mut self, address: u16, value: u16) {
        self[address] = value;
    }
    /// Loads `program` into memory starting from address `origin`.
    ///
    /// # Errors
    /// - Program does not fit between `origin` and the end of memory
    pub fn load_image(&mut self, origin: u16, program: &[u16]) -> Result<(), LoadProgramError> {
        let start = usize::from(origin);
        let maximum_instructions = MEMORY_SIZE_U16 - start;
        if program.len() > maximum_instructions {
            return Err(LoadProgramError::ProgramTooLong {
                origin,
                actual_instructions: program.len(),
                maximum_instructions,
            });
        }
        self.data[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::test_helpers::FakeConsole;
    use googletest::prelude::*;

    const KBSR: u16 = MemoryMappedIOLocations::Kbsr as u16;
    const KBDR: u16 = MemoryMappedIOLocations::Kbdr as u16;

    #[gtest]
    pub fn test_keyboard_status_without_input() {
        let mut console = FakeConsole::new(b"");
        let mut memory = Memory::new();
        memory[KBSR] = 0xFFFF;
        expect_that!(memory.read(KBSR, &mut console).unwrap(), eq(0));
        expect_that!(memory.read(KBDR, &mut console).unwrap(), eq(0));
    }
    #[gtest]
    pub fn test_keyboard_status_with_input_stages_character() {
        let mut console = FakeConsole::new(b"xy");
        let mut memory = Memory::new();
        expect_that!(
            memory.read(KBSR, &mut console).unwrap(),
            eq(Memory::KEYBOARD_STATUS_REGISTER_SET)
        );
        expect_that!(memory.read(KBDR, &mut console).unwrap(), eq(u16::from(b'x')));
        // no new poll when reading the data register
        expect_that!(memory.read(KBDR, &mut console).unwrap(), eq(u16::from(b'x')));
        expect_that!(
            memory.read(KBSR, &mut console).unwrap(),
            eq(Memory::KEYBOARD_STATUS_REGISTER_SET)
        );
        expect_that!(memory.read(KBDR, &mut console).unwrap(), eq(u16::from(b'y')));
        expect_that!(memory.read(KBSR, &mut console).unwrap(), eq(0));
        // stale data stays available
        expect_that!(memory.read(KBDR, &mut console).unwrap(), eq(u16::from(b'y')));
    }
    #[gtest]
    pub fn test_write_anywhere_and_read_back() {
        let mut console = FakeConsole::new(b"");
        let mut memory = Memory::new();
        for address in [0x0000, 0x3000, 0xFE02, 0xFFFF] {
            memory.write(address, 0xBEEF);
            expect_that!(memory.read(address, &mut console).unwrap(), eq(0xBEEF));
        }
    }
    #[gtest]
    pub fn test_load_image() {
        let mut memory = Memory::new();
        memory.load_image(0x4000, &[1, 2, 3]).unwrap();
        expect_that!(memory[0x3FFF], eq(0));
        expect_that!(memory[0x4000], eq(1));
        expect_that!(memory[0x4002], eq(3));
        expect_that!(memory[0x4003], eq(0));
    }
    #[gtest]
    pub fn test_load_image_up_to_end_of_memory() {
        let mut memory = Memory::new();
        memory.load_image(0xFFFE, &[7, 8]).unwrap();
        expect_that!(memory[0xFFFF], eq(8));
    }
    #[gtest]
    pub fn test_load_image_too_long() {
        let mut memory = Memory::new();
        expect_that!(
            memory.load_image(0xFFFE, &[1, 2, 3]).unwrap_err().to_string(),
            eq("Program too long, got 3 u16 instructions at origin 0xFFFE while limit is 2")
        );
    }
}
