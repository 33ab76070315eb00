//! exchange-server: a long-running TCP listener for NUL-delimited messages.
//!
//! - `listener`: binds the port and accepts connections forever
//! - `session`: per-connection read loop, one task per connection
//! - `framing`: `0x00`-terminated message codec with a retained remainder
//! - `handler`: message and diagnostic callbacks
//! - `config`: CLI arguments and TOML file

pub mod config;
pub mod error;
pub mod framing;
pub mod handler;
pub mod listener;
pub mod session;

pub use error::{AcceptError, BindError, EncodeError, SessionError};
pub use handler::{EventSink, LogHandler, MessageHandler, SessionContext, SessionId, TracingSink};
pub use listener::{Acceptor, Listener};
pub use session::{Session, SessionState};
