//! Client-side file transfer: uploads and downloads driven over the
//! transfer WebSocket, chunked the same way the server chunks its replies.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::error::SyncError;
use crate::protocol::transfer::{FileChunk, FileListResponse, FileRequest};
use crate::transfer::TransferEngine;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
#[serde(tag = "action")]
enum OutgoingMessage {
    #[serde(rename = "upload_chunk")]
    UploadChunk(FileChunk),
    #[serde(rename = "download")]
    Download(FileRequest),
    #[serde(rename = "list")]
    List,
}

#[derive(Deserialize)]
#[serde(tag = "action")]
enum IncomingMessage {
    #[serde(rename = "chunk")]
    Chunk(FileChunk),
    #[serde(rename = "file_list")]
    FileList(FileListResponse),
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "upload_ack")]
    UploadAck { name: String, hash: String },
}

pub struct TransferClient {
    socket: WsStream,
}

impl TransferClient {
    pub async fn connect(server_ws_url: &str) -> Result<Self, SyncError> {
        let (socket, _) = connect_async(server_ws_url)
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
        Ok(TransferClient { socket })
    }

    /// Uploads `bytes` under `name`, returning the server-computed digest.
    pub async fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<String, SyncError> {
        let pieces = TransferEngine::chunk_bytes(bytes);
        let last_index = pieces.len().saturating_sub(1);
        let total = bytes.len() as u64;
        for (i, piece) in pieces.iter().enumerate() {
            let chunk = FileChunk {
                name: name.to_string(),
                chunk_index: i as u32,
                data: piece.to_vec(),
                is_last_chunk: i == last_index,
                total_size: if i == 0 { Some(total) } else { None },
                file_hash: None,
            };
            self.send(OutgoingMessage::UploadChunk(chunk)).await?;
        }

        match self.recv().await? {
            IncomingMessage::UploadAck { hash, .. } => Ok(hash),
            IncomingMessage::Error { message } => Err(SyncError::StreamBroken(message)),
            _ => Err(SyncError::StreamBroken("unexpected response to upload".into())),
        }
    }

    /// Downloads a file, reassembling its chunks in order.
    pub async fn download(&mut self, name: &str) -> Result<Vec<u8>, SyncError> {
        self.send(OutgoingMessage::Download(FileRequest { name: name.to_string() }))
            .await?;

        let mut buffer = Vec::new();
        loop {
            match self.recv().await? {
                IncomingMessage::Chunk(chunk) => {
                    buffer.extend_from_slice(&chunk.data);
                    if chunk.is_last_chunk {
                        return Ok(buffer);
                    }
                }
                IncomingMessage::Error { message } => return Err(SyncError::StreamBroken(message)),
                _ => return Err(SyncError::StreamBroken("unexpected response to download".into())),
            }
        }
    }

    pub async fn list(&mut self) -> Result<FileListResponse, SyncError> {
        self.send(OutgoingMessage::List).await?;
        match self.recv().await? {
            IncomingMessage::FileList(list) => Ok(list),
            IncomingMessage::Error { message } => Err(SyncError::StreamBroken(message)),
            _ => Err(SyncError::StreamBroken("unexpected response to list".into())),
        }
    }

    async fn send(&mut self, message: OutgoingMessage) -> Result<(), SyncError> {
        let payload = serde_json::to_string(&message)?;
        self.socket
            .send(Message::Text(payload))
            .await
            .map_err(|e| SyncError::StreamBroken(e.to_string()))
    }

    async fn recv(&mut self) -> Result<IncomingMessage, SyncError> {
        loop {
            let msg = self
                .socket
                .next()
                .await
                .ok_or_else(|| SyncError::StreamBroken("connection closed".into()))?
                .map_err(|e| SyncError::StreamBroken(e.to_string()))?;
            match msg {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => return Err(SyncError::StreamBroken("connection closed".into())),
                _ => continue,
            }
        }
    }
}
