use std::{
    io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::StreamExt;

use crate::ports::storage::ByteStream;

/// Wrap `stream` so it fails once more than `max` bytes have passed.
///
/// The returned counter holds the number of bytes seen so far, including the
/// chunk that crossed the limit, so callers can tell a size violation apart
/// from other upload failures.
pub fn limit_stream(stream: ByteStream, max: u64) -> (ByteStream, Arc<AtomicU64>) {
    let counter = Arc::new(AtomicU64::new(0));
    let seen = counter.clone();
    let limited = stream
        .map(move |chunk| {
            let chunk = chunk?;
            let total = seen.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if total > max {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("payload exceeds {} bytes", max),
                ));
            }
            Ok(chunk)
        })
        .boxed();
    (limited, counter)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::ports::storage::collect_bytes;

    fn chunks(sizes: &[usize]) -> ByteStream {
        let items: Vec<io::Result<Bytes>> = sizes.iter().map(|n| Ok(Bytes::from(vec![0u8; *n]))).collect();
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_within_limit_passes_through() {
        let (stream, counter) = limit_stream(chunks(&[3, 3]), 6);
        assert_eq!(collect_bytes(stream).await.unwrap().len(), 6);
        assert_eq!(counter.load(Ordering::Relaxed), 6);
    }

    #[tokio::test]
    async fn test_exceeding_limit_fails() {
        let (stream, counter) = limit_stream(chunks(&[3, 3, 3]), 5);
        let err = collect_bytes(stream).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(counter.load(Ordering::Relaxed) > 5);
    }
}
