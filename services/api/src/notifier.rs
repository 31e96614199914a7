//! Notification relay: best-effort event fan-out to connected clients
//!
//! Handlers call [`Notifier::notify`] after a mutation has committed; the
//! relay never fails the triggering operation. Delivery runs over a single
//! broadcast channel with per-connection audience filtering on the
//! WebSocket side. Clients that fall behind miss events rather than
//! applying backpressure.

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Kinds of state-transition events the core emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RideCreated,
    RideCompleted,
    RideCancelled,
    RequestCreated,
    RequestAccepted,
    RequestRejected,
    RequestCancelled,
}

/// Who should receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connected user except the given one (typically the actor)
    AllExcept(Uuid),
    /// A single user
    User(Uuid),
}

impl Audience {
    /// Whether a connected user should receive this event.
    pub fn includes(&self, user_id: Uuid) -> bool {
        match self {
            Audience::AllExcept(excluded) => *excluded != user_id,
            Audience::User(target) => *target == user_id,
        }
    }
}

/// One event on the wire
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: EventKind,
    pub audience: Audience,
    pub payload: serde_json::Value,
}

/// Broadcast fan-out for state-transition events
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    /// Create a new notifier
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event. Failures are logged and swallowed; the caller's
    /// mutation has already committed and must not be affected.
    pub fn notify(&self, kind: EventKind, audience: Audience, payload: impl Serialize) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize {:?} payload: {}", kind, e);
                return;
            }
        };

        // An Err here only means no client is connected.
        let _ = self.tx.send(Notification {
            kind,
            audience,
            payload,
        });
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters for the WebSocket upgrade.
///
/// Browsers cannot set headers on a WebSocket handshake, so the access
/// token rides in the query string instead of `Authorization`.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// WebSocket endpoint: authenticate, upgrade, then forward the events
/// whose audience includes the connected user.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let claims = state.verifier.verify_access(&params.token)?;
    let rx = state.notifier.subscribe();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, claims.sub, rx)))
}

async fn handle_socket(
    socket: WebSocket,
    user_id: Uuid,
    mut rx: broadcast::Receiver<Notification>,
) {
    debug!("WebSocket connected for user {}", user_id);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(notification) if notification.audience.includes(user_id) => {
                    let frame = serde_json::json!({
                        "event": notification.kind,
                        "payload": notification.payload,
                    });
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to serialize event frame: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("WebSocket for user {} lagged, {} events dropped", user_id, missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames are ignored; the socket is push-only.
                Some(Ok(_)) => continue,
            },
        }
    }

    debug!("WebSocket closed for user {}", user_id);
}
