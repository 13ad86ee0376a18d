//! Client-side collaborative editing session: a local [`CrdtManager`]
//! replica kept in sync with the server over the edit WebSocket.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::warn;

use crate::crdt::CrdtManager;
use crate::error::SyncError;
use crate::protocol::edit::{EditMessage, Op, OpRequest, StateQuery};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct EditSession {
    manager: CrdtManager,
    doc: String,
    socket: WsStream,
}

impl EditSession {
    pub async fn connect(server_ws_url: &str, site_id: impl Into<String>, doc: impl Into<String>) -> Result<Self, SyncError> {
        let (socket, _) = connect_async(server_ws_url)
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
        Ok(EditSession {
            manager: CrdtManager::new(site_id),
            doc: doc.into(),
            socket,
        })
    }

    /// Inserts `content` locally at `visible_index` and broadcasts the op.
    pub async fn insert(&mut self, visible_index: usize, content: char) -> Result<(), SyncError> {
        let op = self.manager.local_insert(&self.doc, visible_index, content)?;
        let wire_op = Op::Insert {
            site: self.manager.site_id().to_string(),
            clock: self.manager.clock(),
            content: content.to_string(),
            origin_left_site: if op.origin_left.is_sentinel() {
                String::new()
            } else {
                op.origin_left.site.to_string()
            },
            origin_left_clock: if op.origin_left.is_sentinel() { 0 } else { op.origin_left.clock },
        };
        self.send(EditMessage::Op(OpRequest {
            doc: self.doc.clone(),
            op: wire_op,
        }))
        .await
    }

    pub async fn delete(&mut self, visible_index: usize) -> Result<(), SyncError> {
        let op = self.manager.local_delete(&self.doc, visible_index)?;
        let wire_op = Op::Delete {
            target_site: op.target_id.site.to_string(),
            target_clock: op.target_id.clock,
        };
        self.send(EditMessage::Op(OpRequest {
            doc: self.doc.clone(),
            op: wire_op,
        }))
        .await
    }

    pub async fn request_snapshot(&mut self) -> Result<(), SyncError> {
        self.send(EditMessage::Query(StateQuery { doc: self.doc.clone() })).await
    }

    /// Reads the next message from the server, applying remote ops to the
    /// local replica as they arrive. Returns `None` when the socket closes.
    pub async fn recv(&mut self) -> Option<EditMessage> {
        loop {
            let msg = self.socket.next().await?;
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<EditMessage>(&text) {
                    Ok(parsed) => {
                        if let EditMessage::Op(OpRequest { doc, op }) = &parsed {
                            if doc == &self.doc {
                                if let Err(e) = self.manager.apply_remote(doc, op.clone()) {
                                    warn!("failed to apply remote op: {e}");
                                }
                            }
                        }
                        return Some(parsed);
                    }
                    Err(e) => warn!("malformed edit message from server: {e}"),
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => {
                    warn!("edit websocket error: {e}");
                    return None;
                }
            }
        }
    }

    pub fn read_local(&self) -> String {
        self.manager.read(&self.doc)
    }

    async fn send(&mut self, message: EditMessage) -> Result<(), SyncError> {
        let payload = serde_json::to_string(&message)?;
        self.socket
            .send(Message::Text(payload))
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))
    }
}
