// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

#![allow(dead_code)]

use buddygate::config::{Config, ListenerConfig};
use buddygate::core::events::ProfileEvent;
use buddygate::core::profile::{BuddyInfo, ClientInfo, LocalProfile, ProfileAction, ProfileEventSender};
use buddygate::core::service::{GatewayHandle, GatewayService};
use buddygate::core::state::{ConnectionId, GatewayState, Outbound, OutboundReceiver, TransportKind};
use buddygate::server;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, reload};

pub const SELF_ID: &str = "selfselfselfself";
pub const SESSION_ID: &str = "session-0001";
/// A connected-capable buddy with every attribute set and latency support.
pub const ALICE: &str = "alicealicealicea";
/// A buddy with nothing but defaults.
pub const BOB: &str = "bobbobbobbobbobb";
/// A well-formed identifier the profile has never heard of.
pub const CAROL: &str = "carolcarolcarolc";
pub const CHAT_ID: &str = "chat1";

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn alice() -> BuddyInfo {
    BuddyInfo {
        name: Some("Alice".to_string()),
        description: Some("Hello from Alice".to_string()),
        status: "available".to_string(),
        client: ClientInfo {
            name: Some("TorChat".to_string()),
            version: Some("0.9.9".to_string()),
        },
        supports_latency: true,
        ..BuddyInfo::new(ALICE)
    }
}

pub fn bob() -> BuddyInfo {
    BuddyInfo::new(BOB)
}

/// The profile every in-process test starts from: alice and bob on the
/// buddy list and one group chat with both of them.
pub fn test_profile() -> LocalProfile {
    let mut profile = LocalProfile::new(SELF_ID).with_session_id(SESSION_ID);
    profile.insert_buddy(alice());
    profile.insert_buddy(bob());
    profile.insert_group_chat(CHAT_ID, vec![ALICE.to_string(), BOB.to_string()]);
    profile
}

pub fn init_tracing() {
    let env_filter = EnvFilter::new("warn");
    let (filter, _reload_handle) = reload::Layer::new(env_filter);

    // Initialize tracing (ignore error if already initialized)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// TestContext drives a `GatewayState` directly, without the actor or any
/// sockets, so each line's effects can be inspected synchronously.
pub struct TestContext {
    pub state: GatewayState<LocalProfile>,
    next_id: ConnectionId,
}

impl TestContext {
    /// Creates a context with no password: every connection starts authorized.
    pub fn new() -> Self {
        Self::with_password(None)
    }

    pub fn with_password(password: Option<&str>) -> Self {
        init_tracing();
        Self {
            state: GatewayState::new(test_profile(), password.map(str::to_string), None),
            next_id: 0,
        }
    }

    /// Opens a line-protocol connection.
    pub fn connect(&mut self) -> TestClient {
        self.connect_with(TransportKind::Line)
    }

    pub fn connect_with(&mut self, kind: TransportKind) -> TestClient {
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.open_connection(self.next_id, kind, None, tx);
        TestClient { id: self.next_id, rx }
    }

    /// Submits `line` on behalf of `client` and returns the lines it got back.
    pub fn send(&mut self, client: &mut TestClient, line: &str) -> Vec<String> {
        self.state.submit(client.id, line);
        client.lines()
    }

    pub fn event(&mut self, event: ProfileEvent) {
        self.state.on_profile_event(event);
    }

    pub fn profile(&self) -> &LocalProfile {
        self.state.profile()
    }

    pub fn journal(&self) -> &[ProfileAction] {
        self.state.profile().journal()
    }

    pub fn take_journal(&mut self) -> Vec<ProfileAction> {
        self.state.profile_mut().take_journal()
    }
}

/// The receiving side of one registered connection.
pub struct TestClient {
    pub id: ConnectionId,
    pub rx: OutboundReceiver,
}

impl TestClient {
    /// Drains every queued protocol line.
    pub fn lines(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|item| match item {
                Outbound::Line(line) => Some(line),
                Outbound::StartTls => None,
            })
            .collect()
    }

    /// Drains every queued item, TLS upgrade requests included.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    /// Waits for the next line, failing the test after `RECV_TIMEOUT`.
    pub async fn next_line(&mut self) -> String {
        match tokio::time::timeout(RECV_TIMEOUT, self.rx.recv()).await {
            Ok(Some(Outbound::Line(line))) => line,
            other => panic!("expected a line, got {other:?}"),
        }
    }
}

/// A gateway actor that has not been started yet, plus what tests need to
/// talk to it.
pub struct TestService {
    pub service: GatewayService<LocalProfile>,
    pub handle: GatewayHandle,
    pub events: ProfileEventSender,
}

impl TestService {
    pub fn new(password: Option<&str>) -> Self {
        init_tracing();
        let state = GatewayState::new(test_profile(), password.map(str::to_string), None);
        let (service, handle) = GatewayService::new(state, false).expect("profile starts");
        let events = service
            .state()
            .profile()
            .event_sender()
            .expect("started profile has an event sender");
        Self {
            service,
            handle,
            events,
        }
    }

    /// Spawns the actor.
    pub fn spawn(self) -> (JoinHandle<GatewayState<LocalProfile>>, GatewayHandle, ProfileEventSender) {
        (tokio::spawn(self.service.run()), self.handle, self.events)
    }
}

/// Registers a connection through the handle.
pub fn open(handle: &GatewayHandle) -> TestClient {
    let id = handle.next_connection_id();
    let (tx, rx) = mpsc::unbounded_channel();
    handle
        .open(id, TransportKind::Line, None, tx)
        .expect("gateway is running");
    TestClient { id, rx }
}

/// A full daemon bound to ephemeral ports on localhost.
pub struct TestServer {
    pub control_addr: SocketAddr,
    pub web_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub fn config() -> Config {
        let mut config = Config::default();
        config.control = ListenerConfig::new("127.0.0.1", 0);
        config.web = ListenerConfig::new("127.0.0.1", 0);
        config.profile.id = Some(SELF_ID.to_string());
        config.profile.buddies = vec![ALICE.to_string(), BOB.to_string()];
        config
    }

    pub async fn start() -> Self {
        Self::with_config(Self::config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        init_tracing();
        let ctx = server::setup(config).await.expect("server setup");
        let control_addr = ctx.control_addr;
        let web_addr = ctx.web_addr;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server::serve(ctx, async move {
            shutdown_rx.await.ok();
        }));
        Self {
            control_addr,
            web_addr,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    /// Opens a plain line-protocol connection.
    pub async fn connect(&self) -> LineClient<TcpStream> {
        let stream = TcpStream::connect(self.control_addr)
            .await
            .expect("connect to control listener");
        LineClient::new(stream)
    }

    /// Waits for `serve` to return without firing the shutdown future.
    pub async fn finished(self, within: Duration) -> anyhow::Result<()> {
        tokio::time::timeout(within, self.task)
            .await
            .expect("server stops on its own")
            .expect("server task does not panic")
    }

    /// Fires the shutdown future and waits for `serve` to return.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .expect("server stops in time")
            .expect("server task does not panic")
    }
}

/// A line-protocol client over any byte stream.
pub struct LineClient<S> {
    framed: Framed<S, LinesCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, LinesCodec::new()),
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.framed.send(line.to_string()).await.expect("send line");
    }

    pub async fn recv(&mut self) -> String {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(line))) => line,
            other => panic!("expected a line, got {other:?}"),
        }
    }

    /// Sends `line` and waits for exactly one response.
    pub async fn request(&mut self, line: &str) -> String {
        self.send(line).await;
        self.recv().await
    }

    /// Asserts nothing arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(item) = tokio::time::timeout(wait, self.framed.next()).await {
            panic!("expected silence, got {item:?}");
        }
    }

    /// Waits for the server to close the connection.
    pub async fn expect_closed(&mut self) {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(None) | Ok(Some(Err(_))) => {}
            other => panic!("expected the connection to close, got {other:?}"),
        }
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}
