//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnectionId, GameHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::hub::SessionHub;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    // Queue first so the lobby sent on connect is not lost
    let outbound = state.hub.register(connection_id);
    if state.game.connect(connection_id).await.is_err() {
        error!(connection_id = %connection_id, "Game loop unavailable");
        state.hub.unregister(connection_id);
        return;
    }

    run_session(
        connection_id,
        ws_sink,
        ws_stream,
        outbound,
        &state.game,
        &state.hub,
    )
    .await;

    let _ = state.game.disconnect(connection_id).await;
    state.hub.unregister(connection_id);

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: ConnectionId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound: mpsc::Receiver<ServerMsg>,
    game: &GameHandle,
    hub: &SessionHub,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: hub queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> game loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                        hub.send(connection_id, ServerMsg::error("invalid_message", e.to_string()));
                        continue;
                    }
                };

                if !rate_limiter.check_input() {
                    debug!(connection_id = %connection_id, "Rate limited input message");
                    if let Some(reply) = rate_limited_reply(&client_msg) {
                        hub.send(connection_id, reply);
                    }
                    continue;
                }

                if game.input(connection_id, client_msg).await.is_err() {
                    debug!(connection_id = %connection_id, "Command channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Requests dropped by the limiter still get an answer so the client is not left waiting
fn rate_limited_reply(msg: &ClientMsg) -> Option<ServerMsg> {
    msg.expects_reply()
        .then(|| ServerMsg::error("rate_limited", "Too many messages, slow down"))
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_requests_are_answered() {
        let create: ClientMsg = serde_json::from_str(
            r#"{"type":"createGame","requestId":9,"name":"Busy","mapId":"island","botCount":0}"#,
        )
        .unwrap();
        match rate_limited_reply(&create) {
            Some(ServerMsg::Error { code, .. }) => assert_eq!(code, "rate_limited"),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn throttled_moves_are_dropped_quietly() {
        let msg = ClientMsg::Move {
            x: 10.0,
            y: 10.0,
            angle: 0.0,
        };
        assert!(rate_limited_reply(&msg).is_none());
    }
}
