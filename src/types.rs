use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

/// Decoded clipboard bitmap: 8-bit RGBA, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RawImage {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// What one poll saw on the clipboard. Recomputed every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardSnapshot {
    Image(RawImage),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Text,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Image => f.write_str("image"),
            ContentKind::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    /// Path relative to the engine's input directory, always with `/` separators.
    pub engine_path: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchContent {
    Image(SavedImage),
    Text(String),
}

impl DispatchContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            DispatchContent::Image(_) => ContentKind::Image,
            DispatchContent::Text(_) => ContentKind::Text,
        }
    }
}

/// Request body for the engine's `/prompt` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchPayload {
    pub prompt: Map<String, Value>,
    pub client_id: String,
}
