//! Wire-protocol error type.

use thiserror::Error;

/// Errors raised by the serial transport and the line protocol.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Response framing or checksum did not follow the wire protocol.
    #[error("Response does not match the expected checksum:\n{0}")]
    MalformedResponse(String),

    /// The device answered with one of its error mnemonics
    /// (CER/AER/RER/VER).
    #[error("Device reported {code}: {line}")]
    Device { code: String, line: String },

    /// A response field could not be parsed.
    #[error("Unparseable response field: {0}")]
    Parse(String),

    /// No delimiter arrived within the configured read timeout.
    #[error("Timed out waiting for device response")]
    Timeout,

    /// The serial port reached end-of-file mid-read.
    #[error("Unexpected EOF from serial port")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
