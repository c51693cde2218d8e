use std::{sync::Arc, time::Duration};

use termfolio_backend::ScriptedBackend;
use termfolio_core::{Dispatcher, Profile, Registry};
use termfolio_session::{PROMPT, ServerState};
use termfolio_transport::{Acceptor, AcceptorError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

fn server_state(backend: ScriptedBackend) -> Arc<ServerState> {
    let dispatcher = Dispatcher::new(Arc::new(Registry::builtin()), Arc::new(Profile::builtin()));
    Arc::new(ServerState::new(dispatcher, Arc::new(backend)))
}

async fn start(state: Arc<ServerState>) -> std::net::SocketAddr {
    let acceptor = Acceptor::bind("127.0.0.1:0", state).await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    tokio::spawn(acceptor.run());
    addr
}

struct Client {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    async fn send(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).await.unwrap();
    }

    async fn until(&mut self, marker: &str) -> String {
        let marker = marker.as_bytes();
        let mut buf = [0u8; 1024];
        timeout(WAIT, async {
            loop {
                if let Some(pos) = self
                    .pending
                    .windows(marker.len())
                    .position(|w| w == marker)
                {
                    let taken: Vec<u8> = self.pending.drain(..pos + marker.len()).collect();
                    return String::from_utf8(taken).unwrap();
                }
                let n = self.stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "closed early: {}", String::from_utf8_lossy(&self.pending));
                self.pending.extend_from_slice(&buf[..n]);
            }
        })
        .await
        .expect("timed out waiting for output")
    }

    async fn rest(&mut self) -> String {
        let mut out = std::mem::take(&mut self.pending);
        timeout(WAIT, self.stream.read_to_end(&mut out))
            .await
            .expect("timed out waiting for close")
            .unwrap();
        String::from_utf8(out).unwrap()
    }
}

#[tokio::test]
async fn test_commands_over_tcp() {
    let addr = start(server_state(ScriptedBackend::default())).await;
    let mut client = Client::connect(addr).await;

    let banner = client.until(PROMPT).await;
    assert!(banner.contains("Type HELP"));

    client.send("HELP\r\n").await;
    let help = client.until(PROMPT).await;
    assert!(help.starts_with("Available commands:"));
    assert!(help.contains("CHAT"));

    client.send("projekts\n").await;
    let suggestion = client.until(PROMPT).await;
    assert!(suggestion.contains("PROJECTS"), "{suggestion}");

    client.send("EXIT\n").await;
    assert_eq!(client.rest().await, "Goodbye! Thanks for stopping by.\n");
}

#[tokio::test]
async fn test_chat_streams_over_tcp() {
    let backend = ScriptedBackend::new(["Hi", " there", "!"]);
    let addr = start(server_state(backend.clone())).await;
    let mut client = Client::connect(addr).await;
    client.until(PROMPT).await;

    client.send("CHAT who are you\n").await;
    assert_eq!(client.until(PROMPT).await, format!("Hi there!{PROMPT}"));

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "who are you");
}

#[tokio::test]
async fn test_info_counts_tcp_clients() {
    let state = server_state(ScriptedBackend::default());
    let addr = start(Arc::clone(&state)).await;

    let mut first = Client::connect(addr).await;
    first.until(PROMPT).await;
    let mut second = Client::connect(addr).await;
    second.until(PROMPT).await;

    second.send("INFO\n").await;
    let info = second.until(PROMPT).await;
    assert!(info.contains("Connected clients: 2"), "{info}");

    drop(first);
    timeout(WAIT, async {
        while state.clients().len() > 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed session was not unregistered");

    second.send("INFO\n").await;
    let info = second.until(PROMPT).await;
    assert!(info.contains("Connected clients: 1"), "{info}");
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let state = server_state(ScriptedBackend::default());
    let first = Acceptor::bind("127.0.0.1:0", Arc::clone(&state)).await.unwrap();
    let addr = first.local_addr().unwrap();

    let err = Acceptor::bind(addr, state).await.err().unwrap();
    assert!(matches!(err, AcceptorError::Bind { .. }));
}

#[tokio::test]
async fn test_run_until_stops_accepting() {
    let state = server_state(ScriptedBackend::default());
    let acceptor = Acceptor::bind("127.0.0.1:0", state).await.unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(acceptor.run_until(async {
        let _ = rx.await;
    }));
    tx.send(()).unwrap();

    timeout(WAIT, handle).await.unwrap().unwrap();
}
