//! Collaborators invoked by sessions and the listener.
//!
//! `MessageHandler` receives every framed message. `EventSink` receives
//! diagnostics; its default methods log through `tracing`, so an
//! implementation only overrides what it cares about.

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;
use tracing::{debug, error, info, warn};

use crate::error::{AcceptError, SessionError};

/// Listener-assigned identifier of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the session a callback is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub id: SessionId,
    pub peer: SocketAddr,
}

/// Consumer of framed messages.
///
/// Called synchronously from the session's read loop, once per message and
/// in arrival order. Nothing it does affects whether the session keeps
/// reading.
pub trait MessageHandler: Send + Sync + 'static {
    fn on_message(&self, ctx: &SessionContext, payload: Bytes);
}

/// Fire-and-forget diagnostics.
pub trait EventSink: Send + Sync + 'static {
    fn on_accept_error(&self, err: &AcceptError) {
        error!(error = %err.0, "Failed to accept connection");
    }

    fn on_session_error(&self, ctx: &SessionContext, err: &SessionError) {
        match err {
            SessionError::Closed { discarded: 0 } => {
                debug!(session = %ctx.id, peer = %ctx.peer, "Connection closed");
            }
            SessionError::Closed { discarded } => {
                warn!(
                    session = %ctx.id,
                    peer = %ctx.peer,
                    discarded,
                    "Connection closed, unterminated message discarded"
                );
            }
            SessionError::Io(e) => {
                warn!(session = %ctx.id, peer = %ctx.peer, error = %e, "Session read error");
            }
        }
    }
}

/// Handler that logs every message it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl MessageHandler for LogHandler {
    fn on_message(&self, ctx: &SessionContext, payload: Bytes) {
        info!(
            session = %ctx.id,
            peer = %ctx.peer,
            len = payload.len(),
            "Received: {}",
            String::from_utf8_lossy(&payload)
        );
    }
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn ctx() -> SessionContext {
        SessionContext {
            id: SessionId(7),
            peer: "127.0.0.1:40000".parse().unwrap(),
        }
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(42).to_string(), "42");
        assert!(SessionId(1) < SessionId(2));
    }

    #[test]
    fn test_defaults_accept_any_input() {
        // Non-UTF-8 payloads and every error shape must be loggable.
        LogHandler.on_message(&ctx(), Bytes::from_static(&[0xff, 0xfe, b'a']));
        TracingSink.on_accept_error(&AcceptError(io::Error::from(io::ErrorKind::Other)));
        TracingSink.on_session_error(&ctx(), &SessionError::Closed { discarded: 0 });
        TracingSink.on_session_error(&ctx(), &SessionError::Closed { discarded: 5 });
        TracingSink.on_session_error(
            &ctx(),
            &SessionError::Io(io::Error::from(io::ErrorKind::ConnectionReset)),
        );
    }
}
