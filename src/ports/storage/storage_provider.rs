use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{stream::BoxStream, StreamExt};

use crate::domain::{
    errors::{StorageError, StorageResult},
    models::PresignedUrl,
    value_objects::ObjectRef,
};

/// Stream of object bytes, used for uploads and downloads alike.
/// The consumer owns it; dropping it releases the underlying connection.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Which concrete backend sits behind a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    S3,
    DistributedFs,
    InMemory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::S3 => f.write_str("s3"),
            BackendKind::DistributedFs => f.write_str("distributed-fs"),
            BackendKind::InMemory => f.write_str("memory"),
        }
    }
}

/// Port for blob storage.
///
/// Everything outside the storage adapters talks to a backend through this
/// trait only. Implementations are cheap to share: they hold configuration
/// and client handles, nothing else, and must be usable from many tasks at
/// once.
#[async_trait]
pub trait StorageProvider: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    /// Store the stream under `logical_name`. The stream is consumed fully
    /// or the upload fails without leaving a readable object behind.
    async fn upload(&self, stream: ByteStream, logical_name: &str) -> StorageResult<ObjectRef>;

    /// Store an already buffered payload, same atomicity as [`upload`](Self::upload)
    async fn upload_bytes(&self, data: Bytes, logical_name: &str) -> StorageResult<ObjectRef>;

    /// Open the object for reading
    async fn download(&self, object_ref: &ObjectRef) -> StorageResult<ByteStream>;

    /// Remove the object. Deleting an absent object succeeds.
    async fn delete(&self, object_ref: &ObjectRef) -> StorageResult<()>;

    /// Direct backend address, no I/O
    fn internal_url(&self, object_ref: &ObjectRef) -> String;

    /// Externally reachable address, no I/O
    fn public_url(&self, object_ref: &ObjectRef) -> String;

    /// Time-boxed URL; every call signs anew
    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration)
        -> StorageResult<PresignedUrl>;

    /// Cheap connectivity probe
    async fn health_check(&self) -> StorageResult<()>;

    /// Download and buffer the whole object
    async fn download_bytes(&self, object_ref: &ObjectRef) -> StorageResult<Bytes> {
        let stream = self.download(object_ref).await?;
        collect_bytes(stream)
            .await
            .map_err(|e| StorageError::io(format!("failed reading {}: {}", object_ref, e)))
    }
}

/// Drain a byte stream into one buffer
pub async fn collect_bytes(mut stream: ByteStream) -> std::io::Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Wrap an in-memory payload as a single-chunk stream
pub fn bytes_stream(data: Bytes) -> ByteStream {
    futures::stream::once(async move { Ok(data) }).boxed()
}

/// A part accepted by the backend during a chunked upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based, strictly sequential
    pub part_number: u32,
    /// Integrity token the backend returned for the part (ETag or digest)
    pub etag: String,
    pub size: u64,
}

/// Check that parts run 1..=n without gaps or reordering
pub fn validate_part_sequence(parts: &[CompletedPart]) -> StorageResult<()> {
    if parts.is_empty() {
        return Err(StorageError::io("multipart upload has no parts"));
    }
    for (idx, part) in parts.iter().enumerate() {
        let expected = idx as u32 + 1;
        if part.part_number != expected {
            return Err(StorageError::io(format!(
                "multipart parts out of order: expected part {}, found {}",
                expected, part.part_number
            )));
        }
        if part.etag.is_empty() {
            return Err(StorageError::io(format!(
                "part {} is missing its integrity token",
                part.part_number
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(part_number: u32) -> CompletedPart {
        CompletedPart {
            part_number,
            etag: format!("etag-{}", part_number),
            size: 5,
        }
    }

    #[test]
    fn test_part_sequence_accepts_ascending_parts() {
        assert!(validate_part_sequence(&[part(1), part(2), part(3)]).is_ok());
    }

    #[test]
    fn test_part_sequence_rejects_gaps_and_reordering() {
        assert!(validate_part_sequence(&[]).is_err());
        assert!(validate_part_sequence(&[part(2)]).is_err());
        assert!(validate_part_sequence(&[part(1), part(3)]).is_err());
        assert!(validate_part_sequence(&[part(2), part(1)]).is_err());

        let mut unsigned = part(1);
        unsigned.etag.clear();
        assert!(validate_part_sequence(&[unsigned]).is_err());
    }

    #[tokio::test]
    async fn test_collect_bytes_joins_chunks() {
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ])
        .boxed();
        assert_eq!(collect_bytes(stream).await.unwrap(), Bytes::from_static(b"hello world"));
    }
}
