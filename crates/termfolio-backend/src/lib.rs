//! Chat backends for the termfolio `CHAT` command.
//!
//! Provides:
//! - `GeminiBackend` - Streaming client for the Gemini API
//! - `ScriptedBackend` - Fixed replies for offline runs and tests
//! - `UnavailableBackend` - Placeholder when no credential is configured

pub mod gemini;
pub mod scripted;
pub mod sse;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use scripted::{RecordedCall, ScriptedBackend, UnavailableBackend};
