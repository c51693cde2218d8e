//! Process-wide state shared by every session.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use termfolio_core::{ChatBackend, Conversation, Dispatcher, ServerStatus};

use crate::clients::ClientSet;

/// Shared server state, owned by the acceptor and handed to each session.
pub struct ServerState {
    started_at: Instant,
    clients: ClientSet,
    dispatcher: Dispatcher,
    backend: Arc<dyn ChatBackend>,
    max_history_turns: usize,
}

impl ServerState {
    /// Create state with an empty client set; uptime starts now.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            started_at: Instant::now(),
            clients: ClientSet::new(),
            dispatcher,
            backend,
            max_history_turns: Conversation::DEFAULT_MAX_TURNS,
        }
    }

    /// Cap each session's chat history.
    #[must_use]
    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = turns;
        self
    }

    #[must_use]
    pub const fn clients(&self) -> &ClientSet {
        &self.clients
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub const fn max_history_turns(&self) -> usize {
        self.max_history_turns
    }
}

impl ServerStatus for ServerState {
    fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn connected_clients(&self) -> usize {
        self.clients.len()
    }
}
