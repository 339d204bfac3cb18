//! Error types for udsock-core

use nix::errno::Errno;
use thiserror::Error;

/// Result type alias for udsock-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by endpoint operations.
///
/// Interrupted system calls never show up here: they are retried in place.
/// A non-blocking `accept` with nothing queued is not an error either; it is
/// reported as `Ok(None)`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An OS-level operation failed.
    #[error("{context}: {}", os_detail(.source))]
    Resource {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied argument was rejected before any system call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The handshake value read from the peer was not the ack magic.
    #[error("ack mismatch: received {received:#06x}, expected {expected:#06x}")]
    AckMismatch { received: u16, expected: u16 },

    /// The peer ended the stream before the requested byte count arrived.
    #[error("connection closed by peer after {transferred} of {expected} bytes")]
    ConnectionClosed { transferred: usize, expected: usize },

    /// The endpoint's descriptor has already been released.
    #[error("endpoint is closed")]
    Closed,
}

impl Error {
    /// Wrap an `io::Error` produced while performing `context`.
    pub fn resource(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    /// Build a resource error from a message and a raw OS error code.
    pub fn os(context: impl Into<String>, code: i32) -> Self {
        Self::resource(context, std::io::Error::from_raw_os_error(code))
    }

    /// The OS error code behind a resource error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Resource { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }
}

/// Human-readable description of an OS error code.
pub fn errno_string(code: i32) -> String {
    Errno::from_raw(code).desc().to_string()
}

/// The calling thread's most recent OS error code.
pub fn last_os_error_code() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn os_detail(err: &std::io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => format!("{code} - {}", errno_string(code)),
        None => err.to_string(),
    }
}
