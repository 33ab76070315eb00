//! Per-connection read loop.
//!
//! A session owns its stream and receive buffer outright and runs as its own
//! task, so its state lives exactly as long as the loop does:
//!
//! ```text
//!            read ok, frame ready
//! AwaitingData ------------------> Dispatching
//!      ^   |                           |
//!      |   | EOF / I/O error           | handler returned
//!      |   v                           |
//!      | Closed                        |
//!      +-------------------------------+
//! ```
//!
//! Reads are strictly sequential. Nothing is shared with other sessions or
//! with the listener.

use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::SessionError;
use crate::framing::FrameBuffer;
use crate::handler::{EventSink, MessageHandler, SessionContext};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A read is outstanding.
    AwaitingData,
    /// A complete message is with the handler.
    Dispatching,
    /// Terminal. The stream has been released.
    Closed,
}

/// One accepted connection.
pub struct Session<S, H, E> {
    stream: Option<S>,
    buffer: FrameBuffer,
    ctx: SessionContext,
    handler: Arc<H>,
    sink: Arc<E>,
    state: SessionState,
}

impl<S, H, E> Session<S, H, E>
where
    S: AsyncRead + Unpin,
    H: MessageHandler,
    E: EventSink,
{
    pub fn new(
        stream: S,
        ctx: SessionContext,
        handler: Arc<H>,
        sink: Arc<E>,
        read_buffer: usize,
    ) -> Self {
        Self {
            stream: Some(stream),
            buffer: FrameBuffer::with_capacity(read_buffer),
            ctx,
            handler,
            sink,
            state: SessionState::AwaitingData,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Read and dispatch messages until the connection ends.
    ///
    /// The terminating condition goes to the event sink; it is never
    /// returned.
    pub async fn run(&mut self) {
        loop {
            self.state = SessionState::AwaitingData;
            match self.read_message().await {
                Ok(payload) => {
                    self.state = SessionState::Dispatching;
                    debug!(session = %self.ctx.id, len = payload.len(), "Dispatching message");
                    self.handler.on_message(&self.ctx, payload);
                }
                Err(e) => {
                    self.close();
                    self.sink.on_session_error(&self.ctx, &e);
                    return;
                }
            }
        }
    }

    /// Return the next complete message, reading from the stream as many
    /// times as needed.
    ///
    /// Messages already buffered are returned without touching the stream.
    /// End of stream is reported as `SessionError::Closed`, with the length
    /// of any unterminated tail.
    pub async fn read_message(&mut self) -> Result<Bytes, SessionError> {
        loop {
            if let Some(frame) = self.buffer.next_frame() {
                return Ok(frame);
            }

            let stream = match self.stream.as_mut() {
                Some(stream) => stream,
                None => return Err(SessionError::Closed { discarded: 0 }),
            };

            let n = self.buffer.read_from(stream).await?;
            if n == 0 {
                return Err(SessionError::Closed {
                    discarded: self.buffer.pending(),
                });
            }
        }
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        self.stream = None;
        self.buffer = FrameBuffer::with_capacity(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::recording::{Event, Recorder};
    use crate::handler::SessionId;
    use std::io;
    use tokio_test::io::Builder;

    fn ctx() -> SessionContext {
        SessionContext {
            id: SessionId(1),
            peer: "127.0.0.1:50000".parse().unwrap(),
        }
    }

    async fn run_session<S: AsyncRead + Unpin>(stream: S, read_buffer: usize) -> Vec<Event> {
        let (recorder, mut rx) = Recorder::new();
        let mut session = Session::new(stream, ctx(), recorder.clone(), recorder, read_buffer);
        assert_eq!(session.state(), SessionState::AwaitingData);

        session.run().await;
        assert_eq!(session.state(), SessionState::Closed);
        drop(session);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn message(payload: &'static [u8]) -> Event {
        Event::Message(ctx(), Bytes::from_static(payload))
    }

    #[tokio::test]
    async fn test_single_message() {
        let stream = Builder::new().read(b"hello\0").build();
        let events = run_session(stream, 64).await;

        assert_eq!(
            events,
            vec![message(b"hello"), Event::SessionClosed(ctx(), Some(0))]
        );
    }

    #[tokio::test]
    async fn test_partial_delivery() {
        let stream = Builder::new().read(b"A").read(b"B\0").build();
        let events = run_session(stream, 64).await;

        assert_eq!(
            events,
            vec![message(b"AB"), Event::SessionClosed(ctx(), Some(0))]
        );
    }

    #[tokio::test]
    async fn test_many_messages_arbitrary_chunking() {
        let stream = Builder::new()
            .read(b"first\0sec")
            .read(b"ond\0")
            .read(b"\0thi")
            .read(b"rd")
            .read(b"\0fourth\0")
            .build();
        let events = run_session(stream, 3).await;

        assert_eq!(
            events,
            vec![
                message(b"first"),
                message(b"second"),
                message(b""),
                message(b"third"),
                message(b"fourth"),
                Event::SessionClosed(ctx(), Some(0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_discarded() {
        let stream = Builder::new().read(b"done\0tail").build();
        let events = run_session(stream, 64).await;

        assert_eq!(
            events,
            vec![message(b"done"), Event::SessionClosed(ctx(), Some(4))]
        );
    }

    #[tokio::test]
    async fn test_read_error_ends_session() {
        let stream = Builder::new()
            .read(b"ok\0lost")
            .read_error(io::Error::from(io::ErrorKind::ConnectionReset))
            .build();
        let events = run_session(stream, 64).await;

        assert_eq!(
            events,
            vec![message(b"ok"), Event::SessionClosed(ctx(), None)]
        );
    }

    #[tokio::test]
    async fn test_read_message_drains_buffer_before_reading() {
        let (recorder, _rx) = Recorder::new();
        let stream = Builder::new().read(b"a\0b\0").build();
        let mut session = Session::new(stream, ctx(), recorder.clone(), recorder, 64);

        assert_eq!(session.read_message().await.unwrap(), Bytes::from_static(b"a"));
        assert_eq!(session.read_message().await.unwrap(), Bytes::from_static(b"b"));
        assert!(matches!(
            session.read_message().await,
            Err(SessionError::Closed { discarded: 0 })
        ));
        assert_eq!(session.context().id, SessionId(1));
    }

    #[tokio::test]
    async fn test_immediate_close() {
        let stream = Builder::new().build();
        let events = run_session(stream, 64).await;

        assert_eq!(events, vec![Event::SessionClosed(ctx(), Some(0))]);
    }
}
