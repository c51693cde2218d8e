//! Set of currently connected sessions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

/// Session identifier.
pub type SessionId = Uuid;

/// Lock-guarded set of active sessions and their peers, shared by the
/// acceptor and sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientSet {
    inner: Arc<Mutex<HashMap<SessionId, String>>>,
}

impl ClientSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SessionId, String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a session; it is removed when the returned guard drops.
    #[must_use]
    pub fn register(&self, id: SessionId, peer: impl Into<String>) -> ClientGuard {
        self.entries().insert(id, peer.into());
        ClientGuard {
            set: self.clone(),
            id,
        }
    }

    /// Number of connected sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.entries().contains_key(&id)
    }
}

/// Registration of one session in a [`ClientSet`].
#[derive(Debug)]
pub struct ClientGuard {
    set: ClientSet,
    id: SessionId,
}

impl ClientGuard {
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.set.entries().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_unregisters_on_drop() {
        let clients = ClientSet::new();
        let a = clients.register(Uuid::new_v4(), "a");
        let b = clients.register(Uuid::new_v4(), "b");
        assert_eq!(clients.len(), 2);

        let id = a.id();
        drop(a);
        assert_eq!(clients.len(), 1);
        assert!(!clients.contains(id));

        drop(b);
        assert!(clients.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let clients = ClientSet::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let clients = clients.clone();
                std::thread::spawn(move || {
                    let guard = clients.register(Uuid::new_v4(), format!("peer-{i}"));
                    std::thread::yield_now();
                    drop(guard);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(clients.is_empty());
    }
}
