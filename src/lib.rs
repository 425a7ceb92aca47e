//! # LC-3 Simulator.
//!
//! `lc3-simulator` executes binary object images for the LC-3, a 16 bit instructional computer.
//! Programs are loaded via [`emulator::Emulator::load_program_file`] and run with
//! [`emulator::Emulator::execute`] until they halt.
//!
//!  # Example
//! ```no_run
//! use lc3_simulator::emulator::Emulator;
//! use lc3_simulator::terminal::TerminalConsole;
//! let mut emu = Emulator::new(TerminalConsole::new(std::io::stdout()));
//! emu.load_program_file("hello_world.obj").unwrap();
//! emu.execute().unwrap();
//! ```
//! # Errors
//! - Image is missing or has no origin header
//! - Illegal opcode during execution
//! - Console input or output failure

pub mod emulator;
pub mod errors;
pub mod hardware;
pub mod terminal;
