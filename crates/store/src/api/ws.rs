//! WebSocket subscriber feed
//!
//! One JSON `PersistedRecord` per text message. Inbound frames are ignored except
//! Close. When the broadcaster drops the subscription (queue overflow) the socket
//! is closed once the queued records have been sent.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use broadcaster::Subscription;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::AppState;

/// GET /ws/
pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let subscription = state.service.broadcaster().subscribe();
        feed(socket, subscription)
    })
}

async fn feed(socket: WebSocket, mut subscription: Subscription) {
    let id = subscription.id();
    let (mut outbound, mut inbound) = socket.split();

    loop {
        tokio::select! {
            record = subscription.recv() => {
                let Some(record) = record else {
                    info!(subscriber_id = id, "Subscription dropped by broadcaster, closing socket");
                    let _ = outbound.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&record) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(subscriber_id = id, error = %e, "Failed to encode record");
                        continue;
                    }
                };
                if outbound.send(Message::Text(text.into())).await.is_err() {
                    debug!(subscriber_id = id, "Socket send failed");
                    break;
                }
            }
            frame = inbound.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(subscriber_id = id, error = %e, "Socket receive failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    // dropping the subscription unregisters it
    drop(subscription);
    debug!(subscriber_id = id, "Subscriber disconnected");
}
