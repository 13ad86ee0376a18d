//! WebSocket session handling for the file-transfer protocol: clients
//! stream `FileChunk` messages to upload and receive them back to download,
//! all as JSON text frames on the same convention as the edit protocol.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, warn};

use crate::error::SyncError;
use crate::protocol::transfer::{FileChunk, FileInfo, FileListResponse, FileRequest};
use crate::server::state::AppState;

/// Wraps an already-received first chunk plus the remainder of the
/// WebSocket stream into a `Stream<Item = Result<Vec<u8>, SyncError>>`
/// that `TransferEngine::receive_upload` can consume chunk-by-chunk,
/// writing each to primary and backup storage as it arrives instead of
/// buffering the whole file in memory first.
fn upload_chunk_stream<'a, S>(
    first: FileChunk,
    ws: &'a mut S,
) -> impl futures_util::Stream<Item = Result<Vec<u8>, SyncError>> + 'a
where
    S: futures_util::Stream<Item = Result<Message, axum::Error>> + Unpin + 'a,
{
    futures_util::stream::unfold((Some(first), ws, false), |(pending, ws, done)| async move {
        if let Some(chunk) = pending {
            let is_last = chunk.is_last_chunk;
            return Some((Ok(chunk.data), (None, ws, is_last)));
        }
        if done {
            return None;
        }
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::UploadChunk(chunk)) => {
                        let is_last = chunk.is_last_chunk;
                        return Some((Ok(chunk.data), (None, ws, is_last)));
                    }
                    Ok(_) => {
                        return Some((
                            Err(SyncError::StreamBroken(
                                "expected upload_chunk mid-upload, got another message".into(),
                            )),
                            (None, ws, true),
                        ));
                    }
                    Err(e) => return Some((Err(SyncError::StreamBroken(e.to_string())), (None, ws, true))),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Some((
                        Err(SyncError::StreamBroken("connection closed mid-upload".into())),
                        (None, ws, true),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some((Err(SyncError::StreamBroken(e.to_string())), (None, ws, true))),
            }
        }
    })
}

#[derive(serde::Deserialize)]
#[serde(tag = "action")]
enum ClientMessage {
    #[serde(rename = "upload_chunk")]
    UploadChunk(FileChunk),
    #[serde(rename = "download")]
    Download(FileRequest),
    #[serde(rename = "list")]
    List,
}

#[derive(serde::Serialize)]
#[serde(tag = "action")]
enum ServerMessage {
    #[serde(rename = "chunk")]
    Chunk(FileChunk),
    #[serde(rename = "file_list")]
    FileList(FileListResponse),
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "upload_ack")]
    UploadAck { name: String, hash: String },
}

pub async fn handle_transfer_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!("transfer websocket error: {e}");
                break;
            }
        };

        let parsed: ClientMessage = match serde_json::from_str(&msg) {
            Ok(p) => p,
            Err(e) => {
                warn!("malformed transfer message: {e}");
                continue;
            }
        };

        let reply = match parsed {
            ClientMessage::List => {
                match state.catalog.list_live_files() {
                    Ok(files) => ServerMessage::FileList(FileListResponse {
                        files: files
                            .into_iter()
                            .map(|m| FileInfo {
                                name: m.name,
                                hash: m.hash,
                                size: m.size as u64,
                                timestamp: m.timestamp,
                            })
                            .collect(),
                    }),
                    Err(e) => ServerMessage::Error { message: e.to_string() },
                }
            }
            ClientMessage::Download(req) => match state.transfer.read_whole_file(&req.name).await {
                Ok(bytes) => {
                    let sent = send_file_as_chunks(&mut sink, &req.name, &bytes).await;
                    if let Err(e) = sent {
                        error!("failed streaming {}: {e}", req.name);
                    }
                    continue;
                }
                Err(e) => ServerMessage::Error { message: e.to_string() },
            },
            ClientMessage::UploadChunk(chunk) => {
                let name = chunk.name.clone();
                let timestamp = chrono::Utc::now().timestamp();
                let chunk_stream = Box::pin(upload_chunk_stream(chunk, &mut stream));
                match state
                    .transfer
                    .receive_upload(&state.catalog, &name, chunk_stream, timestamp)
                    .await
                {
                    Ok(hash) => ServerMessage::UploadAck { name, hash },
                    Err(e) => ServerMessage::Error { message: e.to_string() },
                }
            }
        };

        let payload = serde_json::to_string(&reply).unwrap_or_default();
        if sink.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}

async fn send_file_as_chunks(
    sink: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    name: &str,
    bytes: &[u8],
) -> Result<(), axum::Error> {
    use crate::transfer::TransferEngine;

    let total = bytes.len() as u64;
    let pieces = TransferEngine::chunk_bytes(bytes);
    let last_index = pieces.len().saturating_sub(1);
    for (i, piece) in pieces.iter().enumerate() {
        let chunk = FileChunk {
            name: name.to_string(),
            chunk_index: i as u32,
            data: piece.to_vec(),
            is_last_chunk: i == last_index,
            total_size: if i == 0 { Some(total) } else { None },
            file_hash: None,
        };
        let payload = serde_json::to_string(&ServerMessage::Chunk(chunk)).unwrap_or_default();
        sink.send(Message::Text(payload)).await?;
    }
    Ok(())
}
