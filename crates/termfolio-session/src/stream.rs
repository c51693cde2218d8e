//! Background task streaming one chat reply to a session.

use std::sync::Arc;

use futures::StreamExt;
use termfolio_core::{ChatBackend, Conversation};
use tokio::sync::Mutex;

use crate::{clients::SessionId, protocol::PROMPT, writer::WriteGuard};

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// All fragments and the closing marker were written.
    Completed,
    /// The backend failed; the closing marker was still written.
    BackendFailed,
    /// The connection failed mid-stream.
    Disconnected,
}

/// One in-flight chat reply.
///
/// Owns the session's write-lock for its whole lifetime, so fragments
/// reach the client contiguously and in emission order. Dropping the
/// task (including by abort) releases the lock.
pub struct StreamTask {
    pub(crate) session_id: SessionId,
    pub(crate) out: WriteGuard,
    pub(crate) conversation: Arc<Mutex<Conversation>>,
    pub(crate) backend: Arc<dyn ChatBackend>,
    pub(crate) system_prompt: Option<String>,
    pub(crate) prompt: String,
}

impl StreamTask {
    /// Stream the reply, then write the closing marker.
    pub async fn run(mut self) -> StreamEnd {
        let history = self.conversation.lock().await.history();

        let mut reply = String::new();
        let mut end = StreamEnd::Completed;

        match self
            .backend
            .stream_reply(self.system_prompt.as_deref(), &history, &self.prompt)
            .await
        {
            Ok(mut fragments) => {
                while let Some(next) = fragments.next().await {
                    match next {
                        Ok(fragment) => {
                            if let Err(e) = self.out.send(&fragment).await {
                                tracing::debug!(session_id = %self.session_id, error = %e, "connection lost mid-stream");
                                return StreamEnd::Disconnected;
                            }
                            reply.push_str(&fragment);
                        }
                        Err(e) => {
                            tracing::warn!(session_id = %self.session_id, error = %e, "chat stream failed");
                            end = StreamEnd::BackendFailed;
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "chat request failed");
                end = StreamEnd::BackendFailed;
            }
        }

        if let Err(e) = self.out.send(PROMPT).await {
            tracing::debug!(session_id = %self.session_id, error = %e, "connection lost before closing marker");
            return StreamEnd::Disconnected;
        }

        if end == StreamEnd::Completed {
            self.conversation.lock().await.record(self.prompt, reply);
        }
        end
    }
}
