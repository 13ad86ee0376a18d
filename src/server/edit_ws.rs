//! WebSocket session handling for the collaborative edit protocol.
//!
//! Each connection is pinned to a single document name for its lifetime,
//! given by the first `OpRequest`/`StateQuery` it sends (`doc`). Every
//! applied op is broadcast to every other connection editing the same
//! document via a per-document `tokio::sync::broadcast` channel.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::protocol::edit::{EditMessage, OpAck, OpRequest, StateSnapshot};
use crate::server::state::AppState;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Default)]
pub struct DocBroadcasts {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl DocBroadcasts {
    pub fn new() -> Self {
        DocBroadcasts::default()
    }

    fn sender_for(&self, doc: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock();
        channels
            .entry(doc.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone()
    }
}

pub async fn handle_edit_session(socket: WebSocket, state: AppState, broadcasts: Arc<DocBroadcasts>) {
    let (mut sink, mut stream) = futures_util::StreamExt::split(socket);
    let mut subscribed_doc: Option<String> = None;
    let mut rx: Option<broadcast::Receiver<String>> = None;

    loop {
        tokio::select! {
            incoming = futures_util::StreamExt::next(&mut stream) => {
                let Some(msg) = incoming else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<EditMessage>(&text) {
                            Ok(parsed) => {
                                let doc = message_doc(&parsed).to_string();
                                if subscribed_doc.as_deref() != Some(doc.as_str()) {
                                    rx = Some(broadcasts.sender_for(&doc).subscribe());
                                    subscribed_doc = Some(doc.clone());
                                }
                                if let Some(reply) = handle_message(&state, &broadcasts, parsed).await {
                                    let payload = serde_json::to_string(&reply).unwrap_or_default();
                                    if futures_util::SinkExt::send(&mut sink, Message::Text(payload)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => warn!("malformed edit message: {e}"),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("edit session closed by client");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("edit websocket error: {e}");
                        break;
                    }
                }
            }
            broadcast_msg = async {
                match rx.as_mut() {
                    Some(r) => r.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match broadcast_msg {
                    Ok(payload) => {
                        if futures_util::SinkExt::send(&mut sink, Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("edit broadcast lagged by {n} messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }
        }
    }
}

fn message_doc(message: &EditMessage) -> &str {
    match message {
        EditMessage::Op(req) => &req.doc,
        EditMessage::Query(q) => &q.doc,
        EditMessage::Ack(_) | EditMessage::Snapshot(_) => "",
    }
}

async fn handle_message(
    state: &AppState,
    broadcasts: &Arc<DocBroadcasts>,
    message: EditMessage,
) -> Option<EditMessage> {
    match message {
        EditMessage::Op(OpRequest { doc, op }) => {
            match state.crdt.apply_remote(&doc, op.clone()) {
                Ok(()) => {
                    let rebroadcast = EditMessage::Op(OpRequest { doc: doc.clone(), op });
                    if let Ok(payload) = serde_json::to_string(&rebroadcast) {
                        let _ = broadcasts.sender_for(&doc).send(payload);
                    }
                    Some(EditMessage::Ack(OpAck::ok()))
                }
                Err(e) => {
                    error!("failed to apply op on {doc}: {e}");
                    Some(EditMessage::Ack(OpAck::err(e.to_string())))
                }
            }
        }
        EditMessage::Query(q) => {
            let content = state.crdt.read(&q.doc);
            Some(EditMessage::Snapshot(StateSnapshot { content }))
        }
        EditMessage::Ack(_) | EditMessage::Snapshot(_) => None,
    }
}
