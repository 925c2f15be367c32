use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ObjectRef;

/// Where a freshly uploaded object lives and how to reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub object_ref: ObjectRef,
    /// Direct backend address, only reachable inside the deployment
    pub internal_url: String,
    /// Externally reachable address
    pub public_url: String,
    pub size: u64,
    /// Sniffed from the stored bytes, falling back to the file name
    pub content_type: String,
    /// Pixel size, when the payload is an image the decoder recognises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A time-boxed URL. Never cache one past `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl PresignedUrl {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Fallback content type for payloads nobody described
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Guess a content type from a file name's extension
pub fn content_type_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// File extension (with the dot) for a response content type
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/x-msvideo" | "video/avi" => ".avi",
        _ => ".bin",
    }
}

/// Directory every original is stored under
pub const UPLOAD_PREFIX: &str = "uploads";

/// Reduce a client-supplied file name to a safe last path segment
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Collision-free logical name for a new original
pub fn unique_upload_name(file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        UPLOAD_PREFIX,
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}
