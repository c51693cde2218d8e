//! Core traits for the chat backend and server status.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::conversation::Turn;

/// Lazy, finite sequence of reply fragments.
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

/// Chat backend error.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not configured: {0}")]
    Unavailable(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Stream error: {0}")]
    Stream(String),
}

/// Trait for conversational completion services.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a streamed reply to `prompt` given the prior turns.
    ///
    /// # Errors
    /// Returns error if the request cannot be started. Failures after the
    /// first fragment are reported through the stream.
    async fn stream_reply(
        &self,
        system_prompt: Option<&str>,
        history: &[Turn],
        prompt: &str,
    ) -> Result<FragmentStream, BackendError>;
}

/// Process-wide values reported by `INFO`.
pub trait ServerStatus: Send + Sync {
    /// Time since the server started.
    fn uptime(&self) -> Duration;

    /// Number of currently open sessions.
    fn connected_clients(&self) -> usize;
}
