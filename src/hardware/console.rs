use std::io;

/// Console I/O independent of an implementation, used by memory mapped IO and trap routines.
pub trait Console {
    /// Checks if input is available, does not block.
    ///
    /// # Errors
    /// - underlying input device can not be polled
    fn poll_input_ready(&mut self) -> io::Result<bool>;
    /// Returns the character found by `poll_input_ready`, otherwise blocks until one is typed.
    ///
    /// # Errors
    /// - underlying input device failed or input was interrupted with
    ///   [`io::ErrorKind::Interrupted`]
    fn read_char_blocking(&mut self) -> io::Result<u8>;
    /// Writes one character and flushes it.
    ///
    /// # Errors
    /// - underlying output device failed
    fn write_char(&mut self, c: u8) -> io::Result<()>;
    /// True if CTRL-C was triggered, checked before every instruction.
    /// May poll the input device for it.
    ///
    /// # Errors
    /// - underlying input device can not be polled
    fn check_interrupted(&mut self) -> io::Result<bool>;

    /// Writes all bytes of `s` via [`Console::write_char`].
    ///
    /// # Errors
    /// - see [`Console::write_char`]
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        s.bytes().try_for_each(|b| self.write_char(b))
    }
}
