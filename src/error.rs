// ABOUTME: Crate-wide error type covering config, transport, framing and upstream failures
// ABOUTME: Mirrors the error kinds enumerated in the gateway's error handling design

use std::io;
use thiserror::Error;

/// Error returned by gateway operations.
///
/// Config errors are fatal at startup. Connect/Timeout/IncompleteRead/Frame
/// errors are recoverable at the Upstream level (retried per `attempts`) and
/// at the Bridge level (the offending client session is dropped).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad URL, missing required config fields, or an unparseable config file.
    #[error("configuration error: {0}")]
    Config(String),

    /// TCP connect refused, or the serial port could not be opened.
    #[error("connect error: {0}")]
    Connect(#[source] io::Error),

    /// An exchange (connect, write or read) exceeded its configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The peer closed the connection before a complete frame was read.
    #[error("incomplete read: have {have} bytes, wanted {want}")]
    IncompleteRead { have: usize, want: usize },

    /// An unknown or unparseable function code was encountered while framing.
    #[error("frame error: {0}")]
    Frame(String),

    /// Catch-all I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GatewayError {
    /// True for a clean EOF with nothing read yet (spec: log at info, not error).
    pub fn is_clean_disconnect(&self) -> bool {
        matches!(self, GatewayError::IncompleteRead { have: 0, .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
