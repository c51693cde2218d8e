//! Offline backends: scripted replies and a disabled placeholder.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use termfolio_core::{BackendError, ChatBackend, FragmentStream, Turn};

/// A request observed by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub history: Vec<Turn>,
    pub prompt: String,
}

/// Backend that replays fixed fragments.
///
/// Used for offline runs and tests; can be told to fail on start or
/// partway through the stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    fragments: Vec<String>,
    delay: Option<Duration>,
    fail_on_start: bool,
    fail_after: Option<usize>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedBackend {
    /// Reply with these fragments, in order.
    #[must_use]
    pub fn new<I>(fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Wait this long before each fragment.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every request before any fragment.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    /// Yield a stream error after `count` fragments.
    #[must_use]
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn stream_reply(
        &self,
        _system_prompt: Option<&str>,
        history: &[Turn],
        prompt: &str,
    ) -> Result<FragmentStream, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                history: history.to_vec(),
                prompt: prompt.to_string(),
            });
        }

        if self.fail_on_start {
            return Err(BackendError::Request("scripted failure".to_string()));
        }

        let mut items: Vec<Result<String, BackendError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(BackendError::Stream("scripted failure".to_string())));
        }

        let delay = self.delay;
        Ok(futures::stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed())
    }
}

/// Backend used when no credential is configured; every request fails.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for UnavailableBackend {
    async fn stream_reply(
        &self,
        _system_prompt: Option<&str>,
        _history: &[Turn],
        _prompt: &str,
    ) -> Result<FragmentStream, BackendError> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }
}
