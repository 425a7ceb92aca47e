use displaydoc::Display;
use std::error::Error;

/// Errors while reading an object image or placing it into memory.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum LoadProgramError {
    /// failed to load image: {path}: {message}
    ImageLoadError { path: String, message: String },
    /// Program is missing valid .ORIG header
    ProgramMissingOrigHeader,
    /// Program too long, got {actual_instructions} u16 instructions at origin {origin:#06X} while limit is {maximum_instructions}
    ProgramTooLong {
        origin: u16,
        actual_instructions: usize,
        maximum_instructions: usize,
    },
}
impl Error for LoadProgramError {}

/// Errors stopping the execution of a loaded program.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Illegal opcode {opcode:#06b} at address {address:#06X}
    IllegalOpcode { opcode: u8, address: u16 },
    /// Error during reading Stdin or writing program output to Stdout: {0}
    IOInputOutputError(String),
    /// Execution interrupted
    Interrupted,
}
impl Error for ExecutionError {}

impl From<std::io::Error> for ExecutionError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::IOInputOutputError(e.to_string())
        }
    }
}
