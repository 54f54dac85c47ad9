//! WebSocket handler for real-time updates

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use greenhouse_core::{DeviceCommand, Element, ElementId, PageEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket message types
#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "snapshot")]
    Snapshot(BTreeMap<ElementId, Element>),
    #[serde(rename = "element_changed")]
    ElementChanged { id: ElementId, element: Element },
    #[serde(rename = "alert")]
    Alert { message: String },
    #[serde(rename = "device_command")]
    DeviceCommand { command: String, detail: DeviceCommand },
    #[serde(rename = "pong")]
    Pong,
}

impl From<PageEvent> for WsMessage {
    fn from(event: PageEvent) -> Self {
        match event {
            PageEvent::ElementChanged { id, element } => WsMessage::ElementChanged { id, element },
            PageEvent::Alert { message } => WsMessage::Alert { message },
        }
    }
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    info!("WebSocket client connected");
    run_session(sender, receiver, state).await;
    info!("WebSocket client disconnected");
}

/// Drive one client session until it closes or the channels shut down
async fn run_session<S, R, E>(mut sender: S, mut receiver: R, state: Arc<AppState>)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut page_events = state.page.subscribe();
    let mut commands = state.devices.subscribe_commands();

    // Send the current page on connect
    let snapshot = WsMessage::Snapshot(state.page.snapshot());
    if let Ok(json) = serde_json::to_string(&snapshot) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    loop {
        let msg = tokio::select! {
            // Forward page changes and alerts
            event = page_events.recv() => match event {
                Ok(event) => WsMessage::from(event),
                Err(RecvError::Lagged(n)) => {
                    // Client fell behind; resync with a full snapshot
                    debug!(skipped = n, "Page event channel lagged");
                    WsMessage::Snapshot(state.page.snapshot())
                }
                Err(e) => {
                    debug!(error = %e, "Page event channel error");
                    break;
                }
            },

            // Forward device commands
            command = commands.recv() => match command {
                Ok(command) => WsMessage::DeviceCommand {
                    command: command.to_string(),
                    detail: command,
                },
                Err(RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Device command channel lagged");
                    continue;
                }
                Err(e) => {
                    debug!(error = %e, "Device command channel error");
                    break;
                }
            },

            // Handle incoming messages from client
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                    continue;
                }
                Some(Ok(Message::Text(text))) if text.as_str() == "ping" => WsMessage::Pong,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                _ => continue,
            },
        };

        match serde_json::to_string(&msg) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize WebSocket message"),
        }
    }
}
