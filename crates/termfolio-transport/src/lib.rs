//! Network transport for the termfolio shell.
//!
//! Provides:
//! - `Acceptor` - Binds a TCP listener and serves one `Session` per connection

pub mod acceptor;

pub use acceptor::{Acceptor, AcceptorError};
