//! WebSocket server setup and connection handling.

use crate::config::Settings;
use crate::hub::{ConnectionId, Hub};
use crate::protocol::{ClientMessage, Outbox, ServerMessage};
use crate::session::{Membership, SessionRegistry};
use axum::body::Body;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::Request;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::future::Future;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

/// Game server: the session registry plus the connected clients.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct GameServer {
    sessions: SessionRegistry,
    hub: Hub,
}

impl GameServer {
    /// Creates a game server with shared session registry and hub.
    #[instrument(skip_all)]
    pub fn with_sessions(sessions: SessionRegistry, hub: Hub) -> Self {
        info!("Creating game server with shared session registry");
        Self { sessions, hub }
    }

    /// Creates a game server from settings.
    pub fn new(settings: &Settings) -> Self {
        Self::with_sessions(
            SessionRegistry::new(*settings.game()),
            Hub::new(*settings.server().queue_capacity()),
        )
    }

    /// The session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The connected clients.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Builds the HTTP router: `/ws` for play, `/health` for probes.
    pub fn router(self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self)
            .layer(ServiceBuilder::new().map_request(log_request))
    }

    /// Serves on `listener` until `shutdown` resolves.
    #[instrument(skip_all)]
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "Server ready at ws://{}/ws", addr);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Server stopped");
        Ok(())
    }

    /// Handles one text frame from `connection`.
    ///
    /// `membership` is the connection's seat, updated when a join succeeds.
    #[instrument(skip(self, text, membership))]
    pub fn handle_frame(
        &self,
        connection: ConnectionId,
        text: &str,
        membership: &mut Option<Membership>,
    ) {
        let outbox = self.hub.outbox(connection);
        let request = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed client message");
                outbox.reply(ServerMessage::error(format!("Malformed message: {}", e)));
                return;
            }
        };

        match request {
            ClientMessage::Join { name } => {
                let seat = membership.as_ref();
                if let Some(member) = self.sessions.join_with_seat(name, seat, &outbox) {
                    *membership = Some(member);
                }
            }
            ClientMessage::Move { column } => match membership.as_ref() {
                Some(member) => self.sessions.make_move(member, column, &outbox),
                None => outbox.reply(ServerMessage::error("Join the game before making a move")),
            },
        }
    }

    /// Cleans up after a connection closes.
    #[instrument(skip(self, membership))]
    pub fn handle_close(&self, connection: ConnectionId, membership: Option<&Membership>) {
        self.hub.unregister(connection);
        let reset = self
            .sessions
            .disconnect(membership, &self.hub.outbox(connection));
        info!(reset, "Client disconnected");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(server): State<GameServer>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

async fn health_handler(State(server): State<GameServer>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "connections": server.hub.connection_count(),
        "sessionId": server.sessions.active_session_id(),
    }))
}

fn log_request(req: Request<Body>) -> Request<Body> {
    debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

/// Runs one WebSocket connection until the client goes away.
async fn handle_socket(socket: WebSocket, server: GameServer) {
    let (connection, mut outbound) = server.hub.register();
    info!(connection, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                debug!(connection, error = %e, "Write failed, stopping writer");
                break;
            }
        }
    });

    let mut membership = None;
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => server.handle_frame(connection, text.as_str(), &mut membership),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(connection, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    server.handle_close(connection, membership.as_ref());
    writer.abort();
}
