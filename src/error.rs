// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the application
//!
//! Processing-domain errors (calibration, malformed lines) are recovered
//! locally by the caller and only logged. Transport and backend errors travel
//! up to the control loop, which decides whether the process keeps running.

use std::path::PathBuf;

use thiserror::Error;

use crate::brightness::CalibrationError;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration file is missing or unreadable
    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for the expected shape
    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration parsed but violates a range rule
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Startup calibration could not be performed
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// A brightness backend could not enumerate, read or write
    #[error("Brightness backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A sensor line was not a valid wire record
    #[error("Malformed sensor message {line:?}: {source}")]
    MalformedMessage {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// The line transport failed and cannot deliver more data
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// Failed to open the serial port
    #[error("Failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Failed to install the Ctrl+C handler
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Errors produced by a line transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// No complete line arrived within the read timeout
    #[error("read timed out")]
    Timeout,

    /// The underlying stream reached end of file
    #[error("stream closed")]
    Closed,

    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;
