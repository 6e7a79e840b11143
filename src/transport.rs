// SPDX-License-Identifier: GPL-3.0-only
//! Line transport
//!
//! The sensor streams newline-terminated text over a serial port. Reads block
//! for at most the configured timeout; a timeout and a blank line both mean
//! "no data this cycle" and surface as [`TransportError::Timeout`].

use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;

use serialport::SerialPort;

use crate::config::SerialSettings;
use crate::error::{AppError, TransportError};

/// Source of newline-terminated text lines
pub trait LineSource {
    /// Next non-blank line with surrounding whitespace trimmed
    fn next_line(&mut self) -> Result<String, TransportError>;
}

/// Longest accepted line; anything longer is dropped up to its newline
pub const MAX_LINE_BYTES: usize = 4096;

/// Line framing over any buffered reader.
///
/// Bytes of a line interrupted by a timeout are kept and completed by the
/// next read instead of being dropped. At most [`MAX_LINE_BYTES`] are held,
/// so a stream without newlines cannot grow the buffer or keep a call busy
/// past one buffer's worth of data.
pub struct LineReader<R> {
    reader: R,
    pending: Vec<u8>,
    discarding: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            discarding: false,
        }
    }

    fn take_line(&mut self) -> Result<String, TransportError> {
        let bytes = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&bytes).trim().to_string();
        if line.is_empty() {
            Err(TransportError::Timeout)
        } else {
            Ok(line)
        }
    }
}

impl<R: BufRead> LineSource for LineReader<R> {
    fn next_line(&mut self) -> Result<String, TransportError> {
        loop {
            let chunk = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    return Err(TransportError::Timeout);
                }
                Err(e) => return Err(TransportError::Io(e)),
            };

            if chunk.is_empty() {
                self.discarding = false;
                // Either nothing left, or the tail of the stream without a newline
                return if self.pending.is_empty() {
                    Err(TransportError::Closed)
                } else {
                    self.take_line()
                };
            }

            let (used, complete) = match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (chunk.len(), false),
            };

            if self.discarding {
                self.reader.consume(used);
                self.discarding = !complete;
                return Err(TransportError::Timeout);
            }

            if self.pending.len() + used > MAX_LINE_BYTES {
                warn!(limit = MAX_LINE_BYTES, "Sensor line too long, discarding");
                self.pending.clear();
                self.reader.consume(used);
                self.discarding = !complete;
                return Err(TransportError::Timeout);
            }

            self.pending.extend_from_slice(&chunk[..used]);
            self.reader.consume(used);
            if complete {
                return self.take_line();
            }
        }
    }
}

pub type SerialLineReader = LineReader<BufReader<Box<dyn SerialPort>>>;

/// Open the configured serial port as a line source
pub fn open_serial(settings: &SerialSettings) -> Result<SerialLineReader, AppError> {
    let port = serialport::new(&settings.port_name, settings.baud_rate)
        .timeout(Duration::from_millis(settings.read_timeout_ms))
        .open()
        .map_err(|source| AppError::SerialOpen {
            port: settings.port_name.clone(),
            source,
        })?;

    info!(port = %settings.port_name, baud = settings.baud_rate, "Serial port opened");
    Ok(LineReader::new(BufReader::new(port)))
}
