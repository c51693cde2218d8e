//! Serialized writer shared by a session's read loop and its stream task.

use std::{io, sync::Arc};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::{Mutex, OwnedMutexGuard},
};

type BoxedWrite = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// Connection writer guarded by the session's write-lock.
///
/// Every write goes through [`WriteGuard`], so bytes from different
/// writers are never interleaved below whole-message granularity. The
/// lock is FIFO: waiting writers acquire it in request order.
#[derive(Clone)]
pub struct SessionWriter {
    inner: Arc<Mutex<Option<BoxedWrite>>>,
}

impl SessionWriter {
    /// Wrap the outbound half of a connection.
    #[must_use]
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(BufWriter::new(Box::new(writer))))),
        }
    }

    /// Acquire the write-lock. It is held until the guard drops.
    pub async fn lock(&self) -> WriteGuard {
        WriteGuard {
            inner: Arc::clone(&self.inner).lock_owned().await,
        }
    }

    /// Write one message under the lock.
    ///
    /// # Errors
    /// Returns error if the write fails or the connection is closed.
    pub async fn send(&self, text: &str) -> io::Result<()> {
        self.lock().await.send(text).await
    }

    /// Shut the connection down.
    ///
    /// Only the first call releases the handle; later calls are no-ops.
    ///
    /// # Errors
    /// Returns error if the shutdown itself fails.
    pub async fn close(&self) -> io::Result<bool> {
        let taken = self.inner.lock().await.take();
        match taken {
            Some(mut writer) => {
                writer.shutdown().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the connection has been closed.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

/// Exclusive access to the connection.
pub struct WriteGuard {
    inner: OwnedMutexGuard<Option<BoxedWrite>>,
}

impl WriteGuard {
    /// Write and flush one message.
    ///
    /// # Errors
    /// Returns `NotConnected` once the connection is closed, or the
    /// underlying write error.
    pub async fn send(&mut self, text: &str) -> io::Result<()> {
        let writer = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))?;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn test_guard_holds_lock_across_writes() {
        let (mut client, server) = tokio::io::duplex(1024);
        let writer = SessionWriter::new(server);

        let mut guard = writer.lock().await;
        let other = writer.clone();
        let waiting = tokio::spawn(async move { other.send("second").await });

        guard.send("first ").await.unwrap();
        tokio::task::yield_now().await;
        guard.send("part").await.unwrap();
        drop(guard);

        waiting.await.unwrap().unwrap();
        writer.close().await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "first partsecond");
    }

    #[tokio::test]
    async fn test_send_writes_whole_message() {
        let mock = tokio_test::io::Builder::new().write(b"hello\n\n> ").build();
        let writer = SessionWriter::new(mock);
        writer.send("hello\n\n> ").await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_client, server) = tokio::io::duplex(64);
        let writer = SessionWriter::new(server);

        assert!(writer.close().await.unwrap());
        assert!(!writer.close().await.unwrap());
        assert!(writer.is_closed().await);

        let err = writer.send("late").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
