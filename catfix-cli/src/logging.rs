//! Structured logging set-up for the binary.

use std::io::{self, Write};

use camino::Utf8Path;
use structured_logger::Builder;
use structured_logger::json::new_writer;

/// Log file written beside the working files.
pub const LOG_FILE: &str = "catfix.log";

/// Install the JSON logger, writing every record to stderr and appending it
/// to `log_file`.
///
/// When the log file cannot be opened, records go to stderr only and the
/// failure is returned so the caller can report it.
///
/// # Errors
/// Returns the I/O error raised while opening `log_file`.
pub fn init_logging(log_file: &Utf8Path) -> io::Result<()> {
    match catfix_fs::open_append(log_file) {
        Ok(file) => {
            Builder::with_level("info")
                .with_target_writer("*", new_writer(Tee::new(io::stderr(), file)))
                .init();
            Ok(())
        }
        Err(err) => {
            Builder::with_level("info")
                .with_target_writer("*", new_writer(io::stderr()))
                .init();
            Err(err)
        }
    }
}

/// Writer duplicating every write into two sinks.
#[derive(Debug)]
pub(crate) struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub(crate) const fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}
