// src/server/web.rs

//! The web listener: a fixed landing page on every path, and the browser
//! event channel on `/websocket`.

use crate::core::event_channel::{CLOSE_EVENT, EventContext, EventFrame, EventRouter, OPEN_EVENT};
use crate::core::service::GatewayHandle;
use crate::core::state::Outbound;
use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

pub const LANDING_PAGE: &str = "<center><h1>Hi there</h1></center>";

/// Shared by every request on the web listener.
#[derive(Clone)]
pub struct WebState {
    pub gateway: GatewayHandle,
    pub router: Arc<EventRouter>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl WebState {
    pub fn new(gateway: GatewayHandle, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            gateway,
            router: Arc::new(EventRouter::with_gateway_handlers()),
            shutdown_tx,
        }
    }
}

pub fn app(state: WebState) -> Router {
    Router::new()
        .route("/websocket", get(websocket_handler))
        .fallback(landing_page)
        .with_state(state)
}

/// Serves the web listener until the shutdown signal fires.
pub async fn run_web_server(
    listener: TcpListener,
    state: WebState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Web listener on http://{} (event channel at /websocket).", addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.recv().await.ok();
        info!("Web server shutting down.");
    })
    .await
    .context("web server failed")
}

async fn landing_page() -> impl IntoResponse {
    (StatusCode::OK, Html(LANDING_PAGE))
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<WebState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Runs one event-channel session: `open` on entry, inbound frames to the
/// router, queued lines out as `["line", [text]]`, and `close` on exit.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: WebState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let ctx = EventContext {
        conn: state.gateway.next_connection_id(),
        addr: Some(addr),
        outbound: outbound_tx,
        gateway: state.gateway.clone(),
    };
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    let (mut sink, mut stream) = socket.split();

    debug!("Event channel {} opened from {}.", ctx.conn, addr);
    state.router.dispatch(&ctx, &EventFrame::new(OPEN_EVENT, Vec::new()));

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            item = outbound_rx.recv() => match item {
                Some(Outbound::Line(line)) => match EventFrame::line(line).encode() {
                    Ok(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Event channel {}: failed to encode line: {}", ctx.conn, e),
                },
                Some(Outbound::StartTls) => {
                    debug!("Event channel {}: STARTTLS not supported, ignored.", ctx.conn);
                }
                None => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match EventFrame::decode(text.as_str()) {
                    Ok(frame) if frame.name == OPEN_EVENT || frame.name == CLOSE_EVENT => {
                        warn!("Event channel {}: client sent reserved event '{}'.", ctx.conn, frame.name);
                    }
                    Ok(frame) => {
                        state.router.dispatch(&ctx, &frame);
                    }
                    Err(e) => warn!("Event channel {}: {}", ctx.conn, e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Event channel {} failed: {}", ctx.conn, e);
                    break;
                }
            },
        }
    }

    state.router.dispatch(&ctx, &EventFrame::new(CLOSE_EVENT, Vec::new()));
    debug!("Event channel {} closed.", ctx.conn);
}
