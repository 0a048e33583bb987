//! WebSocket support for live progress updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use deepbrief_core::progress::{ProgressEvent, ProgressSink};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Interval between heartbeats sent to each client.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// An analysis run or batch started.
    OperationStarted {
        operation_id: String,
        name: String,
        total_steps: usize,
    },
    /// Progress of a running operation (0.0 - 1.0).
    OperationProgress {
        operation_id: String,
        progress: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_step: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_step_number: Option<usize>,
    },
    OperationCompleted {
        operation_id: String,
        details: Value,
    },
    OperationFailed {
        operation_id: String,
        reason: String,
    },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    /// Tag used for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WsMessage::OperationStarted { .. } => "operation_started",
            WsMessage::OperationProgress { .. } => "operation_progress",
            WsMessage::OperationCompleted { .. } => "operation_completed",
            WsMessage::OperationFailed { .. } => "operation_failed",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

impl From<&ProgressEvent> for WsMessage {
    fn from(event: &ProgressEvent) -> Self {
        match event.clone() {
            ProgressEvent::Started {
                operation_id,
                name,
                total_steps,
                ..
            } => WsMessage::OperationStarted {
                operation_id,
                name,
                total_steps,
            },
            ProgressEvent::Updated {
                operation_id,
                progress,
                current_step,
                current_step_number,
            } => WsMessage::OperationProgress {
                operation_id,
                progress,
                current_step,
                current_step_number,
            },
            ProgressEvent::Completed {
                operation_id,
                details,
            } => WsMessage::OperationCompleted {
                operation_id,
                details,
            },
            ProgressEvent::Failed {
                operation_id,
                reason,
            } => WsMessage::OperationFailed {
                operation_id,
                reason,
            },
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
///
/// Attached to the progress tracker as a sink, it fans every progress event
/// out to the connected clients.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ProgressSink for WsBroadcaster {
    fn emit(&self, event: &ProgressEvent) {
        self.broadcast(WsMessage::from(event));
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to broadcast messages
    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    // Spawn task to forward broadcast messages to this client
    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} messages", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WsMessage: {}", e);
                }
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                // Clients are not expected to send anything
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_event_conversion() {
        let event = ProgressEvent::Updated {
            operation_id: "video_analysis_0a1b2c3d".to_string(),
            progress: 0.4,
            current_step: Some("Detecting scenes".to_string()),
            current_step_number: Some(3),
        };

        let msg = WsMessage::from(&event);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "operation_progress");
        assert_eq!(json["progress"], 0.4);
        assert_eq!(json["current_step"], "Detecting scenes");
    }

    #[test]
    fn test_started_drops_details() {
        let event = ProgressEvent::Started {
            operation_id: "batch_analysis_0a1b2c3d".to_string(),
            name: "Analyzing 2 videos".to_string(),
            total_steps: 2,
            details: json!({ "video_count": 2 }),
        };

        let json = serde_json::to_value(WsMessage::from(&event)).unwrap();
        assert_eq!(json["type"], "operation_started");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_broadcaster_as_progress_sink() {
        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster.emit(&ProgressEvent::Failed {
            operation_id: "video_analysis_0a1b2c3d".to_string(),
            reason: "Scene detection failed".to_string(),
        });

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.kind(), "operation_failed");
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        WsBroadcaster::new(4).broadcast(WsMessage::Heartbeat { timestamp: 0 });
    }
}
