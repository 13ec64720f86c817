use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};

use crate::registry::Registry;

/// Inbound frames larger than this are dropped without closing the
/// connection.
pub const MAX_FRAME_BYTES: usize = 2000;

/// Drive one authenticated WebSocket connection: register with the
/// directory, pump frames both ways, unregister when either side ends.
pub async fn handle_socket(socket: WebSocket, registry: Registry, user_id: i64, username: String) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut outbound_rx) = registry.register(user_id).await;

    info!("{} ({}) connected", username, user_id);

    // Outbound: drain the registry queue into the socket. The queue
    // closing means this connection was displaced or evicted, so tell the
    // client before exiting.
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Inbound: enforce the frame cap, forward accepted text frames to the
    // broadcast path (client liveness frames only today).
    let registry_recv = registry.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if text.len() > MAX_FRAME_BYTES {
                        warn!(
                            "{} ({}) sent oversize frame ({} bytes), dropped",
                            username_recv,
                            user_id,
                            text.len()
                        );
                        continue;
                    }
                    registry_recv.broadcast(&text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either loop exiting tears down the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.unregister(user_id, conn_id).await;
    info!("{} ({}) disconnected", username, user_id);
}
