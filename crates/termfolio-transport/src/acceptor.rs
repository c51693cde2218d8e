//! TCP accept loop spawning one session per connection.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use termfolio_session::{ServerState, Session};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::Instrument;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Acceptor error.
#[derive(Debug, thiserror::Error)]
pub enum AcceptorError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listening socket plus the state every session shares.
pub struct Acceptor {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Acceptor {
    /// Bind the listening socket.
    ///
    /// # Errors
    /// Returns error if the address cannot be bound.
    pub async fn bind<A>(addr: A, state: Arc<ServerState>) -> Result<Self, AcceptorError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AcceptorError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self { listener, state })
    }

    /// Address actually bound.
    ///
    /// # Errors
    /// Returns error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, AcceptorError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "listening");
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("acceptor shutting down");
                    return;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let session = Session::new(Arc::clone(&self.state), peer.to_string(), writer);
        let span = tracing::info_span!("session", %peer, session_id = %session.id());

        tracing::info!(%peer, "accepted connection");
        tokio::spawn(session.serve(reader).instrument(span));
    }
}
