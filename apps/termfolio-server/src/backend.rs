//! Picks the chat backend described by the configuration.

use std::{sync::Arc, time::Duration};

use termfolio_backend::{GeminiBackend, GeminiConfig, ScriptedBackend, UnavailableBackend};
use termfolio_core::ChatBackend;

use crate::config::{BackendConfig, BackendKind};

/// Build the configured backend.
///
/// A Gemini backend without a usable key degrades to one that fails every
/// request, so the server still starts and `CHAT` just ends its stream.
pub fn select(config: &BackendConfig) -> Arc<dyn ChatBackend> {
    match config.kind {
        BackendKind::None => {
            tracing::info!("chat backend disabled");
            Arc::new(UnavailableBackend::new("chat is disabled"))
        }
        BackendKind::Scripted => {
            tracing::info!("using scripted chat backend");
            Arc::new(ScriptedBackend::new(config.scripted_reply.split_inclusive(' ')))
        }
        BackendKind::Gemini => {
            let Some(api_key) = config.resolve_api_key() else {
                tracing::warn!(env = %config.api_key_env, "no API key configured, chat will be unavailable");
                return Arc::new(UnavailableBackend::new(format!(
                    "{} is not set",
                    config.api_key_env
                )));
            };

            let gemini = GeminiConfig {
                api_key,
                model: config.model.clone(),
                base_url: config.base_url.clone(),
                request_timeout: Duration::from_secs(config.request_timeout_secs),
            };
            match GeminiBackend::new(gemini) {
                Ok(backend) => {
                    tracing::info!(model = %config.model, "using Gemini chat backend");
                    Arc::new(backend)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to create Gemini backend, chat will be unavailable");
                    Arc::new(UnavailableBackend::new(e.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use termfolio_core::BackendError;

    use super::*;

    async fn reply(backend: &Arc<dyn ChatBackend>) -> Result<String, BackendError> {
        let stream = backend.stream_reply(None, &[], "hi").await?;
        let fragments: Vec<_> = stream.collect().await;
        fragments.into_iter().collect()
    }

    #[tokio::test]
    async fn test_disabled_backend_fails_requests() {
        let config = BackendConfig {
            kind: BackendKind::None,
            ..BackendConfig::default()
        };
        let backend = select(&config);
        assert!(matches!(reply(&backend).await, Err(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_scripted_backend_streams_configured_reply() {
        let config = BackendConfig {
            kind: BackendKind::Scripted,
            scripted_reply: "offline for now".to_string(),
            ..BackendConfig::default()
        };
        let backend = select(&config);
        assert_eq!(reply(&backend).await.unwrap(), "offline for now");
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_unavailable() {
        let config = BackendConfig {
            kind: BackendKind::Gemini,
            api_key: None,
            api_key_env: "TERMFOLIO_UNSET_KEY_FOR_TESTS".to_string(),
            ..BackendConfig::default()
        };
        let backend = select(&config);
        match reply(&backend).await {
            Err(BackendError::Unavailable(reason)) => {
                assert!(reason.contains("TERMFOLIO_UNSET_KEY_FOR_TESTS"));
            }
            other => panic!("expected unavailable backend, got {other:?}"),
        }
    }
}
