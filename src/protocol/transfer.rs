//! Wire-level file-transfer and catalog-query messages.
//!
//! `FileChunk.data` is carried as a base64 string so the whole message can
//! travel as a JSON text frame on the same WebSocket convention as the edit
//! protocol, instead of introducing a second binary wire format.

use serde::{Deserialize, Serialize};

pub const CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChunk {
    pub name: String,
    pub chunk_index: u32,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub is_last_chunk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub hash: String,
    pub size: u64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub alive: bool,
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_chunk_round_trips_binary_data_through_json() {
        let chunk = FileChunk {
            name: "a.bin".into(),
            chunk_index: 0,
            data: vec![0, 1, 2, 255, 254],
            is_last_chunk: true,
            total_size: Some(5),
            file_hash: Some("deadbeef".into()),
        };
        let json = serde_json::to_string(&chunk).unwrap();
        let back: FileChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![0, 1, 2, 255, 254]);
        assert_eq!(back.name, "a.bin");
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let chunk = FileChunk {
            name: "a.bin".into(),
            chunk_index: 1,
            data: vec![9],
            is_last_chunk: false,
            total_size: None,
            file_hash: None,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(!json.contains("total_size"));
        assert!(!json.contains("file_hash"));
    }
}
