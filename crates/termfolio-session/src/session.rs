//! One connection's session: banner, read loop, dispatch and teardown.

use std::{io, sync::Arc};

use termfolio_core::{ChatBackend, Conversation, Outcome};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    sync::{
        Mutex,
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    clients::{ClientGuard, SessionId},
    protocol::{self, LineBuffer, READ_BUFFER_SIZE, READY},
    state::ServerState,
    stream::{StreamEnd, StreamTask},
    writer::SessionWriter,
};

/// Replies a session may have waiting behind a running stream.
pub const MAX_PENDING_REPLIES: usize = 256;

/// Session error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid UTF-8 from client: {0}")]
    Decode(#[from] std::str::Utf8Error),
    #[error("Too many replies pending ({MAX_PENDING_REPLIES})")]
    Backlog,
}

/// Whether the read loop keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Output waiting for the connection, written strictly in queue order.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Chat(String),
    /// Written last; the writer task stops after it.
    Farewell(String),
}

/// Server-side state of one open connection.
///
/// The read loop never writes. It queues output for a writer task that
/// owns the write-lock while it works, so a slow chat stream delays
/// replies but never stops the session from reading `EXIT` or noticing
/// the peer leave.
pub struct Session {
    id: SessionId,
    peer: String,
    state: Arc<ServerState>,
    writer: SessionWriter,
    conversation: Arc<Mutex<Conversation>>,
    outbound: mpsc::Sender<Outbound>,
    cancel_chats: watch::Sender<bool>,
    outlet: Option<JoinHandle<()>>,
    registration: Option<ClientGuard>,
}

impl Session {
    /// Create a session, register it as connected and start its writer task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(
        state: Arc<ServerState>,
        peer: impl Into<String>,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let id = Uuid::new_v4();
        let peer = peer.into();
        let registration = state.clients().register(id, peer.clone());
        let conversation = Arc::new(Mutex::new(Conversation::new(state.max_history_turns())));
        let writer = SessionWriter::new(writer);

        let (outbound, queue) = mpsc::channel(MAX_PENDING_REPLIES);
        let (cancel_chats, cancelled) = watch::channel(false);
        let outlet = Outlet {
            session_id: id,
            writer: writer.clone(),
            conversation: Arc::clone(&conversation),
            backend: state.backend(),
            system_prompt: state.dispatcher().profile().system_prompt.clone(),
            cancelled,
        };

        tracing::info!(session_id = %id, peer = %peer, "session opened");

        Self {
            id,
            peer,
            state,
            writer,
            conversation,
            outbound,
            cancel_chats,
            outlet: Some(tokio::spawn(outlet.run(queue))),
            registration: Some(registration),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Output queued but not yet taken by the writer task.
    #[must_use]
    pub fn pending_replies(&self) -> usize {
        MAX_PENDING_REPLIES - self.outbound.capacity()
    }

    /// Whether teardown has run.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.registration.is_none()
    }

    /// Run the session to completion and tear it down.
    pub async fn serve<R>(mut self, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        if let Err(e) = self.run(reader).await {
            tracing::warn!(session_id = %self.id, peer = %self.peer, error = %e, "session ended with error");
        }
        self.shutdown().await;
    }

    /// Send the banner, then read and answer lines until the client leaves.
    ///
    /// # Errors
    /// Returns error on a read failure, undecodable input, a reply backlog
    /// or a connection that can no longer be written.
    pub async fn run<R>(&mut self, mut reader: R) -> Result<(), SessionError>
    where
        R: AsyncRead + Unpin,
    {
        let banner = self.state.dispatcher().banner();
        self.enqueue(Outbound::Text(protocol::reply(&banner)))?;

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut lines = LineBuffer::new(READ_BUFFER_SIZE);

        loop {
            let n = tokio::select! {
                read = reader.read(&mut buf) => read?,
                () = self.outbound.closed() => {
                    tracing::debug!(session_id = %self.id, "connection no longer writable");
                    return Ok(());
                }
            };
            if n == 0 {
                tracing::debug!(session_id = %self.id, "peer closed connection");
                return Ok(());
            }

            for line in lines.push(&buf[..n]) {
                if self.handle_line(&line?).await? == Flow::Exit {
                    return Ok(());
                }
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        let outcome = self
            .state
            .dispatcher()
            .dispatch(line, self.state.as_ref());

        match outcome {
            Outcome::Ready => self.enqueue(Outbound::Text(READY.to_string()))?,
            Outcome::Reply(text) => self.enqueue(Outbound::Text(protocol::reply(&text)))?,
            Outcome::Stream { prompt } => {
                tracing::debug!(session_id = %self.id, prompt_len = prompt.len(), "queueing chat stream");
                self.enqueue(Outbound::Chat(prompt))?;
            }
            Outcome::Exit(farewell) => {
                self.say_goodbye(format!("{farewell}\n")).await?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Queue output behind whatever the writer task is doing.
    fn enqueue(&self, item: Outbound) -> Result<(), SessionError> {
        self.outbound.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::Backlog,
            TrySendError::Closed(_) => not_connected().into(),
        })
    }

    /// Cancel chat streams, flush queued replies, then write the farewell.
    async fn say_goodbye(&mut self, farewell: String) -> Result<(), SessionError> {
        self.cancel_chats.send_replace(true);
        self.outbound
            .send(Outbound::Farewell(farewell))
            .await
            .map_err(|_| not_connected())?;
        if let Some(outlet) = self.outlet.take() {
            join_outlet(self.id, outlet).await;
        }
        Ok(())
    }

    /// Release everything the session holds.
    ///
    /// Stops the writer task, leaves the client set, drops the
    /// conversation and closes the connection. Safe to call more than
    /// once; only the first call does anything.
    pub async fn shutdown(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };

        // Nothing may write once the connection is closed.
        if let Some(outlet) = self.outlet.take() {
            outlet.abort();
            join_outlet(self.id, outlet).await;
        }
        drop(registration);
        self.conversation.lock().await.clear();

        if let Err(e) = self.writer.close().await {
            tracing::debug!(session_id = %self.id, error = %e, "error closing connection");
        }

        tracing::info!(session_id = %self.id, peer = %self.peer, "session closed");
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}

async fn join_outlet(session_id: SessionId, outlet: JoinHandle<()>) {
    match outlet.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => tracing::debug!(%session_id, "pending output discarded"),
        Err(e) => tracing::warn!(%session_id, error = %e, "writer task failed"),
    }
}

/// Writer task: drains a session's queue through the write-lock.
struct Outlet {
    session_id: SessionId,
    writer: SessionWriter,
    conversation: Arc<Mutex<Conversation>>,
    backend: Arc<dyn ChatBackend>,
    system_prompt: Option<String>,
    cancelled: watch::Receiver<bool>,
}

impl Outlet {
    async fn run(mut self, mut queue: mpsc::Receiver<Outbound>) {
        while let Some(item) = queue.recv().await {
            let writable = match item {
                Outbound::Text(text) => self.write(&text).await,
                Outbound::Chat(prompt) => self.chat(prompt).await,
                Outbound::Farewell(text) => {
                    self.write(&text).await;
                    break;
                }
            };
            if !writable {
                break;
            }
        }
    }

    async fn write(&self, text: &str) -> bool {
        match self.writer.send(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(session_id = %self.session_id, error = %e, "connection lost");
                false
            }
        }
    }

    /// Stream one reply unless chats were cancelled. Returns whether the
    /// connection is still writable.
    async fn chat(&mut self, prompt: String) -> bool {
        if *self.cancelled.borrow() {
            tracing::debug!(session_id = %self.session_id, "skipping cancelled chat");
            return true;
        }

        let task = StreamTask {
            session_id: self.session_id,
            out: self.writer.lock().await,
            conversation: Arc::clone(&self.conversation),
            backend: Arc::clone(&self.backend),
            system_prompt: self.system_prompt.clone(),
            prompt,
        };

        tokio::select! {
            end = task.run() => {
                tracing::debug!(session_id = %self.session_id, ?end, "stream finished");
                end != StreamEnd::Disconnected
            }
            _ = self.cancelled.wait_for(|cancelled| *cancelled) => {
                tracing::debug!(session_id = %self.session_id, "stream cancelled");
                true
            }
        }
    }
}
