//! Error types for the listener and its sessions.
//!
//! Only `BindError` ever reaches the caller. Accept and session errors are
//! reported to the `EventSink` and recovered where they happen.

use std::fmt;
use std::io;
use std::net::SocketAddr;

/// The listening endpoint could not be established.
#[derive(Debug)]
pub struct BindError {
    pub addr: SocketAddr,
    pub source: io::Error,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to bind {}: {}", self.addr, self.source)
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A single accept attempt failed. The accept loop carries on.
#[derive(Debug)]
pub struct AcceptError(pub io::Error);

impl From<io::Error> for AcceptError {
    fn from(e: io::Error) -> Self {
        AcceptError(e)
    }
}

impl fmt::Display for AcceptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to accept connection: {}", self.0)
    }
}

impl std::error::Error for AcceptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Terminal condition of a session's read loop.
#[derive(Debug)]
pub enum SessionError {
    /// Peer closed the stream. `discarded` counts trailing bytes that never
    /// saw a delimiter.
    Closed { discarded: usize },
    /// The transport failed.
    Io(io::Error),
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        SessionError::Io(e)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Closed { discarded: 0 } => write!(f, "Connection closed by peer"),
            SessionError::Closed { discarded } => write!(
                f,
                "Connection closed by peer with {discarded} unterminated bytes"
            ),
            SessionError::Io(e) => write!(f, "Read error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Io(e) => Some(e),
            SessionError::Closed { .. } => None,
        }
    }
}

/// A payload cannot be framed because it contains the delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeError {
    pub position: usize,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message contains a NUL byte at offset {}", self.position)
    }
}

impl std::error::Error for EncodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        assert_eq!(
            SessionError::Closed { discarded: 0 }.to_string(),
            "Connection closed by peer"
        );
        assert_eq!(
            SessionError::Closed { discarded: 3 }.to_string(),
            "Connection closed by peer with 3 unterminated bytes"
        );

        let err: SessionError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert!(matches!(err, SessionError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_bind_error_display() {
        let err = BindError {
            addr: "127.0.0.1:25000".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("Failed to bind 127.0.0.1:25000"));
    }
}
