//! TCP listener and accept loop.
//!
//! Every accepted connection becomes a `Session` running on its own task.
//! The loop never waits on a session and never stops on an accept error.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use crate::error::{AcceptError, BindError};
use crate::handler::{EventSink, LogHandler, MessageHandler, SessionContext, SessionId, TracingSink};
use crate::session::Session;

/// Initial per-session receive buffer size
const DEFAULT_READ_BUFFER: usize = 4 * 1024;

/// Source of incoming connections.
pub trait Acceptor: Send + 'static {
    type Stream: AsyncRead + Unpin + Send + 'static;

    /// Wait for the next connection.
    fn accept_next(
        &mut self,
    ) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;

    fn accept_next(
        &mut self,
    ) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        self.accept()
    }
}

/// Listener instance
pub struct Listener<A, H = LogHandler, E = TracingSink> {
    acceptor: A,
    handler: Arc<H>,
    sink: Arc<E>,
    read_buffer: usize,
    next_session_id: u64,
}

impl Listener<TcpListener> {
    /// Bind a TCP listener on `addr`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(addr: SocketAddr, backlog: u32) -> Result<Self, BindError> {
        let listener = create_listener(addr, backlog).map_err(|source| BindError { addr, source })?;
        Ok(Self::new(listener))
    }
}

impl<H, E> Listener<TcpListener, H, E> {
    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }
}

impl<A: Acceptor> Listener<A> {
    /// Wrap an acceptor with the logging handler and sink.
    pub fn new(acceptor: A) -> Self {
        Self {
            acceptor,
            handler: Arc::new(LogHandler),
            sink: Arc::new(TracingSink),
            read_buffer: DEFAULT_READ_BUFFER,
            next_session_id: 1,
        }
    }
}

impl<A, H, E> Listener<A, H, E>
where
    A: Acceptor,
    H: MessageHandler,
    E: EventSink,
{
    pub fn with_handler<H2: MessageHandler>(self, handler: Arc<H2>) -> Listener<A, H2, E> {
        Listener {
            acceptor: self.acceptor,
            handler,
            sink: self.sink,
            read_buffer: self.read_buffer,
            next_session_id: self.next_session_id,
        }
    }

    pub fn with_sink<E2: EventSink>(self, sink: Arc<E2>) -> Listener<A, H, E2> {
        Listener {
            acceptor: self.acceptor,
            handler: self.handler,
            sink,
            read_buffer: self.read_buffer,
            next_session_id: self.next_session_id,
        }
    }

    pub fn with_read_buffer(mut self, read_buffer: usize) -> Self {
        self.read_buffer = read_buffer;
        self
    }

    /// Accept connections forever.
    ///
    /// Does not return under normal operation.
    pub async fn run(mut self) {
        loop {
            match self.acceptor.accept_next().await {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(e) => self.sink.on_accept_error(&AcceptError::from(e)),
            }
        }
    }

    fn spawn_session(&mut self, stream: A::Stream, peer: SocketAddr) {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        info!(session = %id, peer = %peer, "New session");

        let ctx = SessionContext { id, peer };
        let mut session = Session::new(
            stream,
            ctx,
            Arc::clone(&self.handler),
            Arc::clone(&self.sink),
            self.read_buffer,
        );

        tokio::spawn(async move {
            session.run().await;
        });
    }
}

fn create_listener(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;

    TcpListener::from_std(socket.into())
}
