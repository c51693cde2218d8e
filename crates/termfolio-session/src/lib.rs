//! Per-connection sessions for the termfolio shell.
//!
//! Provides:
//! - `Session` - Banner, read loop, dispatch and idempotent teardown
//! - `SessionWriter` - The per-connection write-lock
//! - `StreamTask` - Streams one chat reply under the write-lock, run by
//!   each session's writer task
//! - `ServerState` / `ClientSet` - Process-wide state shared by sessions
//! - Newline framing and prompt constants

pub mod clients;
pub mod protocol;
pub mod session;
pub mod state;
pub mod stream;
pub mod writer;

pub use clients::{ClientGuard, ClientSet, SessionId};
pub use protocol::{LineBuffer, PROMPT, READY, READ_BUFFER_SIZE};
pub use session::{MAX_PENDING_REPLIES, Session, SessionError};
pub use state::ServerState;
pub use stream::{StreamEnd, StreamTask};
pub use writer::{SessionWriter, WriteGuard};
