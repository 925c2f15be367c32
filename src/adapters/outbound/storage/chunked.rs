//! Shared driver for uploads of unknown length.
//!
//! Payloads up to the threshold are buffered and written in one request.
//! Anything larger goes through a backend multipart session that is either
//! completed in full or aborted, so a failed upload never leaves a readable
//! object behind.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::{
    domain::errors::{StorageError, StorageResult},
    ports::storage::{validate_part_sequence, ByteStream, CompletedPart},
};

/// Payload size above which uploads switch to multipart (10 MiB)
pub const DEFAULT_MULTIPART_THRESHOLD: usize = 10 * 1024 * 1024;
/// Size of every part but the last (5 MiB, the S3 minimum)
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub multipart_threshold: usize,
    pub chunk_size: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkPolicy {
    pub fn new(multipart_threshold: usize, chunk_size: usize) -> Self {
        Self {
            multipart_threshold,
            chunk_size: chunk_size.max(1),
        }
    }
}

/// One in-flight multipart upload on a backend
#[async_trait]
pub trait MultipartSession: Send {
    /// Upload part `part_number` (1-based)
    async fn upload_part(&mut self, part_number: u32, data: Bytes) -> StorageResult<CompletedPart>;

    /// Make the object visible. Parts are passed in upload order.
    async fn complete(&mut self, parts: Vec<CompletedPart>) -> StorageResult<()>;

    /// Discard every uploaded part
    async fn abort(&mut self) -> StorageResult<()>;
}

/// Backend hooks the driver needs
#[async_trait]
pub trait ChunkedTarget: Send + Sync {
    async fn put_single(&self, name: &str, data: Bytes) -> StorageResult<()>;

    async fn begin_multipart(&self, name: &str) -> StorageResult<Box<dyn MultipartSession>>;
}

/// Consume `stream` into `name` on `target`, returning the byte count
pub async fn upload_chunked<T>(
    target: &T,
    name: &str,
    mut stream: ByteStream,
    policy: ChunkPolicy,
) -> StorageResult<u64>
where
    T: ChunkedTarget + ?Sized,
{
    let mut buffer = BytesMut::new();

    while buffer.len() <= policy.multipart_threshold {
        match stream.next().await {
            Some(chunk) => buffer.extend_from_slice(&chunk?),
            None => {
                let size = buffer.len() as u64;
                debug!(name, size, "single request upload");
                target.put_single(name, buffer.freeze()).await?;
                return Ok(size);
            }
        }
    }

    debug!(
        name,
        threshold = policy.multipart_threshold,
        "payload exceeds threshold, starting multipart upload"
    );
    let mut session = target.begin_multipart(name).await?;

    match drive_parts(session.as_mut(), buffer, stream, policy.chunk_size).await {
        Ok(size) => {
            debug!(name, size, "multipart upload completed");
            Ok(size)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort().await {
                warn!(name, error = %abort_err, "failed to abort multipart upload");
            }
            Err(err)
        }
    }
}

async fn drive_parts(
    session: &mut dyn MultipartSession,
    mut buffer: BytesMut,
    mut stream: ByteStream,
    chunk_size: usize,
) -> StorageResult<u64> {
    let mut parts: Vec<CompletedPart> = Vec::new();
    let mut exhausted = false;

    loop {
        while buffer.len() >= chunk_size {
            let data = buffer.split_to(chunk_size).freeze();
            let part_number = parts.len() as u32 + 1;
            parts.push(session.upload_part(part_number, data).await?);
        }

        if exhausted {
            break;
        }

        match stream.next().await {
            Some(chunk) => buffer.extend_from_slice(&chunk?),
            None => exhausted = true,
        }
    }

    if !buffer.is_empty() {
        let part_number = parts.len() as u32 + 1;
        parts.push(session.upload_part(part_number, buffer.freeze()).await?);
    }

    validate_part_sequence(&parts)?;
    let total = parts.iter().map(|p| p.size).sum();
    session.complete(parts).await?;
    Ok(total)
}

/// Turn a byte count mismatch after assembly into an error
pub fn check_assembled_size(name: &str, expected: u64, actual: u64) -> StorageResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StorageError::io(format!(
            "assembled object {} has {} bytes, expected {}",
            name, actual, expected
        )))
    }
}
