/// Realtime WebSocket channel
///
/// # Endpoint
///
/// ```text
/// GET /ws[?token=<jwt>]
/// ```
///
/// The caller may identify itself with the usual bearer header or session
/// cookie, or with a `token` query parameter (browsers cannot set headers on
/// WebSocket requests). Anonymous connections are accepted and receive
/// broadcasts; invalid credentials are rejected with 401 before the upgrade.
///
/// # Session lifecycle
///
/// 1. The connection is registered, so it receives broadcasts at once.
/// 2. A `user:joined` frame whose payload equals the authenticated user ID
///    joins that user's room; any other `user:joined` is ignored.
/// 3. Outbound frames are forwarded from the connection's queue by a
///    dedicated task.
/// 4. On close or transport error the connection leaves the registry and
///    every room it joined.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use collabtask_shared::auth::jwt::validate_token;
use collabtask_shared::auth::middleware::authenticate;
use collabtask_shared::auth::AuthError;
use collabtask_shared::events::ClientEvent;
use collabtask_shared::realtime::{Connection, ConnectionId, ConnectionRegistry};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{app::AppState, error::ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> ApiResult<Response> {
    let identity = resolve_identity(&headers, params.token.as_deref(), state.jwt_secret())?;
    let registry = state.registry.clone();

    Ok(ws.on_upgrade(move |socket| run_session(socket, registry, identity)))
}

/// Identity for the session; `None` when no credentials were offered
fn resolve_identity(
    headers: &HeaderMap,
    query_token: Option<&str>,
    secret: &str,
) -> Result<Option<Uuid>, AuthError> {
    if let Some(token) = query_token.filter(|t| !t.is_empty()) {
        return Ok(Some(validate_token(token, secret)?.sub));
    }

    match authenticate(headers, secret) {
        Ok(auth) => Ok(Some(auth.user_id)),
        Err(AuthError::MissingCredentials) => Ok(None),
        Err(e) => Err(e),
    }
}

async fn run_session(
    socket: WebSocket,
    registry: Arc<dyn ConnectionRegistry>,
    identity: Option<Uuid>,
) {
    let (connection, mut outbound) = Connection::channel();
    let connection_id = connection.id;
    registry.connect(connection.clone()).await;
    info!(connection_id = %connection_id, user_id = ?identity, "realtime connection opened");

    let (mut sink, mut stream) = socket.split();

    let mut forwarder = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame.as_str().to_owned())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut forwarder => {
                debug!(connection_id = %connection_id, "outbound transport closed");
                break;
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_client_frame(registry.as_ref(), connection_id, identity, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "inbound transport error");
                    break;
                }
            }
        }
    }

    forwarder.abort();
    registry.leave(connection_id).await;
    info!(
        connection_id = %connection_id,
        duration_ms = connection.age().as_millis() as u64,
        dropped_frames = connection.drop_count(),
        "realtime connection closed"
    );
}

/// Applies one inbound frame; returns whether the connection joined a room
pub(crate) async fn handle_client_frame(
    registry: &dyn ConnectionRegistry,
    connection_id: ConnectionId,
    identity: Option<Uuid>,
    text: &str,
) -> bool {
    match ClientEvent::decode(text) {
        Ok(ClientEvent::UserJoined(user_id)) if identity == Some(user_id) => {
            let joined = registry.join(user_id, connection_id).await;
            debug!(connection_id = %connection_id, user_id = %user_id, joined, "user joined room");
            joined
        }
        Ok(ClientEvent::UserJoined(user_id)) => {
            warn!(
                connection_id = %connection_id,
                claimed = %user_id,
                authenticated = ?identity,
                "ignoring user:joined for another identity"
            );
            false
        }
        Err(e) => {
            debug!(connection_id = %connection_id, error = %e, "ignoring malformed client frame");
            false
        }
    }
}
