use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use futures::StreamExt;
use image::ImageReader;

use crate::{domain::models::content_type_for_name, ports::storage::ByteStream};

/// Bytes kept from the front of an upload for sniffing. Large enough to get
/// past the EXIF block most JPEGs carry ahead of their frame header.
pub const HEAD_CAPTURE_SIZE: usize = 64 * 1024;

/// First bytes of a stream, filled in as the stream is consumed
#[derive(Clone, Default)]
pub struct CapturedHead(Arc<Mutex<Vec<u8>>>);

impl CapturedHead {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().map(|head| head.clone()).unwrap_or_default()
    }
}

/// Pass `stream` through unchanged while copying its first `max` bytes aside
pub fn capture_head(stream: ByteStream, max: usize) -> (ByteStream, CapturedHead) {
    let head = CapturedHead::default();
    let sink = head.clone();
    let captured = stream
        .inspect(move |chunk| {
            let Ok(chunk) = chunk else { return };
            if let Ok(mut buf) = sink.0.lock() {
                let room = max.saturating_sub(buf.len());
                buf.extend_from_slice(&chunk[..room.min(chunk.len())]);
            }
        })
        .boxed();
    (captured, head)
}

/// What the stored bytes turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub content_type: String,
    pub dimensions: Option<(u32, u32)>,
}

impl UploadMetadata {
    /// Sniff the leading bytes, then fall back to `declared`, then to the
    /// extension of `file_name`. Dimensions are only known for images whose
    /// header fits in `head`.
    pub fn sniff(head: &[u8], declared: Option<&str>, file_name: &str) -> Self {
        let content_type = match image::guess_format(head) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => declared
                .map(str::to_string)
                .unwrap_or_else(|| content_type_for_name(file_name).to_string()),
        };
        let dimensions = ImageReader::new(Cursor::new(head))
            .with_guessed_format()
            .ok()
            .filter(|reader| reader.format().is_some())
            .and_then(|reader| reader.into_dimensions().ok());
        Self {
            content_type,
            dimensions,
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.dimensions.map(|(w, _)| w)
    }

    pub fn height(&self) -> Option<u32> {
        self.dimensions.map(|(_, h)| h)
    }
}
