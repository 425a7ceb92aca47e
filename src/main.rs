use clap::Parser;
use lc3_simulator::emulator::Emulator;
use lc3_simulator::errors::ExecutionError;
use lc3_simulator::terminal::{TerminalConsole, set_terminal_raw};
use std::io::{IsTerminal, stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_IMAGE_LOAD_FAILED: u8 = 1;
const EXIT_CONSOLE_FAILED: u8 = 74;
/// Status of a process stopped by `SIGABRT`
const EXIT_ILLEGAL_OPCODE: u8 = 134;
/// Status of `exit(-2)`
const EXIT_INTERRUPTED: u8 = 254;

/// Simulator for the LC-3 executing binary object images.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Object images to load, the first word of each is its origin address
    #[arg(required = true, value_name = "OBJ_FILE")]
    images: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut emu = Emulator::new(TerminalConsole::new(stdout()));
    for path in &args.images {
        if let Err(e) = emu.load_program_file(path) {
            eprintln!("{e}");
            return ExitCode::from(EXIT_IMAGE_LOAD_FAILED);
        }
    }

    let res = if stdin().is_terminal() {
        let lock = set_terminal_raw();
        emu.console_mut()
            .set_translate_new_lines(lock.is_enabled() && stdout().is_terminal());
        emu.execute()
    } else {
        emu.execute()
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(ExecutionError::Interrupted) => {
            println!();
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e @ ExecutionError::IllegalOpcode { .. }) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_ILLEGAL_OPCODE)
        }
        Err(e @ ExecutionError::IOInputOutputError(_)) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_CONSOLE_FAILED)
        }
    }
}
