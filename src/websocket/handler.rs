use std::sync::Arc;
use std::time::Duration;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn, error, debug};
use futures_util::{StreamExt, SinkExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;
use crate::models::{CollabError, ErrorResponse, ReceivedMessage};
use crate::services::auth_service::{authenticate, get_auth_token};
use crate::ws::broker::{Broker, Outbox};
use crate::ws::connctx::ConnCtx;

// Removes the session from the broker however the connection ends
struct DeferDisconnect {
    broker: Arc<Broker>,
    conn_id: Uuid,
}

impl Drop for DeferDisconnect {
    fn drop(&mut self) {
        let broker = self.broker.clone();
        let conn_id = self.conn_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    broker.disconnect(conn_id).await;
                });
            }
            Err(_) => error!("No runtime left to clean up session {}", conn_id),
        }
    }
}

/// WebSocket handler. The credential is checked before the upgrade, so a
/// refused connection never becomes a session.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
    req: Request,
) -> Response {
    info!("New WebSocket connection attempt");

    let token = get_auth_token(&req).ok();
    let ctx = match authenticate(token.as_deref(), state.config.auth_jwt_secret.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Refusing WebSocket connection: {}", e);
            return ErrorResponse::reply(StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    let broker = state.broker.clone();
    let heartbeat = state.config.heartbeat_interval();
    let client_timeout = state.config.client_timeout();
    ws.on_upgrade(move |socket| handle_socket(socket, ctx, broker, heartbeat, client_timeout))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, ctx: ConnCtx, broker: Arc<Broker>, heartbeat: Duration, client_timeout: Duration) {
    let conn_id = ctx.conn_id;
    info!("WebSocket connection established for user {} with connection_id: {}", ctx.user_id, conn_id);

    let outbox = broker.connect(ctx).await;
    let _disconnect = DeferDisconnect { broker: broker.clone(), conn_id };

    let (sender, mut receiver) = socket.split();

    // Forward queued events to the client and keep pinging it
    let mut send_task = tokio::spawn(write_loop(sender, outbox, heartbeat, conn_id));

    // Handle the session's events one at a time, in arrival order
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Result<ReceivedMessage, CollabError>>();
    let worker_broker = broker.clone();
    let mut worker_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                Ok(msg) => worker_broker.handle(conn_id, msg).await,
                Err(e) => worker_broker.reject(conn_id, &e, None).await,
            }
        }
    });

    // Keep reading frames while the worker waits on permission checks or writes,
    // so a close is noticed right away
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = match tokio::time::timeout(client_timeout, receiver.next()).await {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    debug!("WebSocket error on connection {}: {}", conn_id, e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    info!("Connection {} silent for {:?}, closing", conn_id, client_timeout);
                    break;
                }
            };

            let event = match frame {
                Message::Text(text) => {
                    let parsed = ReceivedMessage::parse(&text);
                    match &parsed {
                        Ok(msg) => debug!("Received message on connection {}: {:?}", conn_id, msg),
                        Err(e) => error!("Failed to parse message on connection {}: {}", conn_id, e),
                    }
                    parsed
                }
                Message::Binary(_) => Err(CollabError::InvalidEvent("binary frames are not supported".to_string())),
                Message::Close(_) => break,
                // Any frame counts as a sign of life
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            if event_tx.send(event).is_err() {
                break;
            }
        }
    });

    // Whichever task ends first ends the connection; pending work is dropped
    tokio::select! {
        _ = (&mut send_task) => {},
        _ = (&mut recv_task) => {},
        _ = (&mut worker_task) => {},
    };
    send_task.abort();
    recv_task.abort();
    worker_task.abort();

    broker.disconnect(conn_id).await;
    info!("WebSocket connection {} terminated", conn_id);
}

async fn write_loop<S>(mut sender: S, mut outbox: Outbox, heartbeat: Duration, conn_id: Uuid)
where
    S: SinkExt<Message> + Unpin,
{
    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await;

    loop {
        tokio::select! {
            queued = outbox.recv() => {
                let Some(msg) = queued else { break };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize event for connection {}: {}", conn_id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
