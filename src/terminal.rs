use crate::hardware::console::Console;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, poll, read};
use crossterm::terminal;
use std::io;
use std::io::{IsTerminal, Read, Write};
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// Number of instructions between two checks of the terminal for CTRL-C.
const INTERRUPT_POLL_INTERVAL: u16 = 1024;

pub struct RawLock {
    enabled: bool,
}

impl RawLock {
    /// True if raw mode could be enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for RawLock {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        // terminal stays in raw mode but no means to repair
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Error resetting terminal {e}");
        }
    }
}

/// Set terminal to raw in best-effort mode, only log on failure, since it does not work without
/// a tty, e.g. in tests.
/// Raw mode is left again when the returned lock is dropped.
#[must_use]
pub fn set_terminal_raw() -> RawLock {
    let enabled = match terminal::enable_raw_mode() {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Could not set terminal to raw mode: {e}");
            false
        }
    };
    RawLock { enabled }
}

/// Where input characters come from.
enum Input {
    /// Key presses read via crossterm events.
    Terminal,
    /// Bytes of a redirected stdin, read by a background thread.
    Piped(Receiver<u8>),
}

/// Console reading from the terminal or from redirected stdin and writing to `W`.
pub struct TerminalConsole<W: Write> {
    stdout: W,
    input: Input,
    available_char: Option<u8>,
    is_interrupted: bool,
    translate_new_lines: bool,
    steps_since_interrupt_poll: u16,
}
impl<W: Write> TerminalConsole<W> {
    /// Reads key presses if stdin is a terminal, plain bytes of stdin otherwise.
    pub fn new(stdout: W) -> Self {
        if io::stdin().is_terminal() {
            Self::with_input(stdout, Input::Terminal)
        } else {
            Self::from_receiver(stdout, spawn_stdin_reader())
        }
    }
    /// Reads input bytes from `receiver` instead of the terminal.
    pub const fn from_receiver(stdout: W, receiver: Receiver<u8>) -> Self {
        Self::with_input(stdout, Input::Piped(receiver))
    }
    const fn with_input(stdout: W, input: Input) -> Self {
        Self {
            stdout,
            input,
            available_char: None,
            is_interrupted: false,
            translate_new_lines: false,
            steps_since_interrupt_poll: 0,
        }
    }
    /// Writes `\n` as `\r\n`, needed while the terminal is in raw mode.
    pub const fn set_translate_new_lines(&mut self, translate: bool) {
        self.translate_new_lines = translate;
    }

    /// Maps a key press to the character seen by LC-3 programs.
    /// Returns `None` for keys without one. CTRL-C sets the interrupted flag.
    fn key_to_char(&mut self, event: KeyEvent) -> Option<u8> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.is_interrupted = true;
                None
            }
            KeyCode::Char(c) if c.is_ascii() => u8::try_from(c).ok(),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Esc => Some(0x1B),
            _ => None,
        }
    }
    fn interrupted_error() -> io::Error {
        io::Error::new(io::ErrorKind::Interrupted, "interrupted by CTRL-C")
    }
}

fn spawn_stdin_reader() -> Receiver<u8> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for byte in io::stdin().lock().bytes() {
            let Ok(byte) = byte else { break };
            if sender.send(byte).is_err() {
                break;
            }
        }
    });
    receiver
}

impl<W: Write> Console for TerminalConsole<W> {
    fn poll_input_ready(&mut self) -> io::Result<bool> {
        if self.available_char.is_some() {
            return Ok(true);
        }
        if let Input::Piped(receiver) = &self.input {
            match receiver.try_recv() {
                Ok(c) => self.available_char = Some(c),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }
        } else if poll(Duration::from_secs(0))?
            && let Event::Key(event) = read()?
        {
            self.available_char = self.key_to_char(event);
        }
        Ok(self.available_char.is_some())
    }
    fn read_char_blocking(&mut self) -> io::Result<u8> {
        if let Some(c) = self.available_char.take() {
            return Ok(c);
        }
        if let Input::Piped(receiver) = &self.input {
            return receiver
                .recv()
                .map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        while !self.is_interrupted {
            if let Event::Key(event) = read()?
                && let Some(c) = self.key_to_char(event)
            {
                return Ok(c);
            }
        }
        Err(Self::interrupted_error())
    }
    fn write_char(&mut self, c: u8) -> io::Result<()> {
        if c == b'\n' && self.translate_new_lines {
            self.stdout.write_all(b"\r\n")?;
        } else {
            self.stdout.write_all(&[c])?;
        }
        self.stdout.flush()
    }
    fn check_interrupted(&mut self) -> io::Result<bool> {
        // raw mode disables SIGINT, so CTRL-C only arrives as key press
        if matches!(self.input, Input::Terminal) && self.available_char.is_none() {
            self.steps_since_interrupt_poll += 1;
            if self.steps_since_interrupt_poll >= INTERRUPT_POLL_INTERVAL {
                self.steps_since_interrupt_poll = 0;
                self.poll_input_ready()?;
            }
        }
        Ok(self.is_interrupted)
    }
}
