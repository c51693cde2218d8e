//! Core building blocks for the termfolio command shell.
//!
//! This crate provides:
//! - `Registry` - The static command table with fuzzy suggestions
//! - `Dispatcher` - Resolves input lines to replies or streaming requests
//! - `Profile` - Read-only portfolio content
//! - `Conversation` - Per-session chat history
//! - `ChatBackend` and `ServerStatus` traits

pub mod conversation;
pub mod dispatcher;
pub mod fuzzy;
pub mod profile;
pub mod registry;
pub mod traits;

pub use conversation::{Conversation, Role, Turn};
pub use dispatcher::{Dispatcher, Outcome};
pub use profile::{Profile, ProfileError, Project};
pub use registry::{CommandEntry, Registry};
pub use traits::{BackendError, ChatBackend, FragmentStream, ServerStatus};
