use crate::emulator::Emulator;
use crate::hardware::console::Console;
use std::collections::VecDeque;
use std::io;

/// Console with scripted input which captures all output.
pub struct FakeConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    fail_reads: bool,
    interrupted: bool,
}
impl FakeConsole {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::with_capacity(120),
            fail_reads: false,
            interrupted: false,
        }
    }
    pub fn with_read_error() -> Self {
        let mut res = Self::new(b"");
        res.fail_reads = true;
        res
    }
    /// Acts like CTRL-C was pressed.
    pub const fn interrupt(&mut self) {
        self.interrupted = true;
    }
    pub fn get_string(&self) -> String {
        String::from_utf8(self.output.clone()).unwrap()
    }
}
impl Console for FakeConsole {
    fn poll_input_ready(&mut self) -> io::Result<bool> {
        Ok(!self.input.is_empty())
    }
    fn read_char_blocking(&mut self) -> io::Result<u8> {
        if self.fail_reads {
            return Err(io::Error::other("Error during read"));
        }
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
    fn write_char(&mut self, c: u8) -> io::Result<()> {
        self.output.push(c);
        Ok(())
    }
    fn check_interrupted(&mut self) -> io::Result<bool> {
        Ok(self.interrupted)
    }
}

/// Creates an emulator with `program_no_header` loaded at `0x3000`.
pub fn fake_emulator(program_no_header: &[u16], input: &[u8]) -> Emulator<FakeConsole> {
    let mut program = Vec::with_capacity(program_no_header.len() + 1);
    program.push(0x3000u16);
    program.extend_from_slice(program_no_header);
    let mut emu = Emulator::new(FakeConsole::new(input));
    emu.load_program(&program).unwrap();
    emu
}
