use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::api::SharedState;
use crate::backend::LocalBackend;
use crate::cases::models::{DisplayRecord, Notification, Session};
use crate::cases::sync::{ListUpdate, LiveCaseList};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Full list after the initial fetch.
    Snapshot {
        records: Vec<DisplayRecord>,
        loading: bool,
    },
    /// One entry replaced in place.
    CaseUpdated {
        index: usize,
        record: DisplayRecord,
    },
    Notification {
        notification: Notification,
    },
}

impl From<ListUpdate> for WsMessage {
    fn from(update: ListUpdate) -> Self {
        WsMessage::CaseUpdated {
            index: update.index,
            record: update.record,
        }
    }
}

/// Viewer identity for `/ws/cases`.
#[derive(Debug, Default, Deserialize)]
pub struct ViewerParams {
    pub user: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

impl ViewerParams {
    fn session(self) -> Session {
        Session {
            employee: self.user.filter(|u| !u.is_empty()),
            admin_scope: self.admin,
        }
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(viewer): Query<ViewerParams>,
) -> impl IntoResponse {
    let session = viewer.session();
    ws.on_upgrade(move |socket| handle_socket(socket, state, session))
}

async fn handle_socket(socket: WebSocket, state: SharedState, session: Session) {
    let (mut sender, receiver) = socket.split();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();

    debug!(employee = ?session.employee, admin = session.admin_scope, "Case list mounted");
    let list = LiveCaseList::mount(state.backend.clone(), session, notify_tx).await;

    let snapshot = WsMessage::Snapshot {
        records: list.records().to_vec(),
        loading: list.is_loading(),
    };
    if send_message(&mut sender, &snapshot).await.is_err() {
        list.unmount();
        return;
    }

    run_socket_loop(sender, receiver, list, notify_rx).await;
}

async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut list: LiveCaseList<LocalBackend>,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    info!("WebSocket pong timeout, closing");
                    break;
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            update = list.next_update() => {
                let Some(update) = update else { break };
                if send_message(&mut sender, &update.into()).await.is_err() {
                    break;
                }
            }

            Some(notification) = notifications.recv() => {
                let msg = WsMessage::Notification { notification };
                if send_message(&mut sender, &msg).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    list.unmount();
    let _ = sender.send(Message::Close(None)).await;
    debug!("Case list unmounted");
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &WsMessage,
) -> Result<(), ()> {
    let json = encode(msg).ok_or(())?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Serialize a message, logging instead of failing.
pub fn encode(msg: &WsMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WsMessage");
            None
        }
    }
}
