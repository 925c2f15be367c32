#![allow(dead_code)]

use std::{
    io::Cursor,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use media_store::{
    domain::models::PresignedUrl, BackendKind, ByteStream, ChunkPolicy, ImageTransformer,
    MediaServiceBuilder, MediaServiceImpl, ObjectRef, RasterTransformer, S3Storage, StorageError,
    StorageProvider, StorageResult, TransformSpec,
};

/// Encode a gradient of the given size in `format`
pub fn image_fixture(width: u32, height: u32, format: ImageFormat) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    Bytes::from(out.into_inner())
}

pub fn jpeg_fixture(width: u32, height: u32) -> Bytes {
    image_fixture(width, height, ImageFormat::Jpeg)
}

pub fn png_fixture(width: u32, height: u32) -> Bytes {
    image_fixture(width, height, ImageFormat::Png)
}

pub fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

pub fn in_memory_storage() -> Arc<dyn StorageProvider> {
    Arc::new(S3Storage::in_memory(ChunkPolicy::default()))
}

pub fn service_over(storage: Arc<dyn StorageProvider>) -> MediaServiceImpl {
    service_with(storage, Arc::new(RasterTransformer::new()))
}

pub fn service_with(
    storage: Arc<dyn StorageProvider>,
    transformer: Arc<dyn ImageTransformer>,
) -> MediaServiceImpl {
    MediaServiceBuilder::new()
        .storage(storage)
        .transformer(transformer)
        .max_upload_size(10 * 1024 * 1024)
        .build()
        .unwrap()
}

/// Store `data` under a fixed name, bypassing the unique naming of uploads
pub async fn seed(storage: &Arc<dyn StorageProvider>, name: &str, data: Bytes) -> ObjectRef {
    storage.upload_bytes(data, name).await.unwrap()
}

/// Transformer that counts how often the engine actually runs
#[derive(Default)]
pub struct CountingTransformer {
    inner: RasterTransformer,
    pub calls: AtomicUsize,
}

impl CountingTransformer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageTransformer for CountingTransformer {
    fn transform(&self, source: &[u8], spec: &TransformSpec) -> media_store::domain::errors::TransformResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.transform(source, spec)
    }
}

/// Provider wrapper whose writes can be switched off and whose calls are counted
pub struct FlakyStorage {
    inner: Arc<dyn StorageProvider>,
    pub fail_writes: AtomicBool,
    pub fail_reads_under: Option<String>,
    pub uploads: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(inner: Arc<dyn StorageProvider>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads_under: None,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn failing_reads_under(mut self, prefix: &str) -> Self {
        self.fail_reads_under = Some(prefix.to_string());
        self
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProvider for FlakyStorage {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn upload(&self, stream: ByteStream, logical_name: &str) -> StorageResult<ObjectRef> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("write rejected", "injected failure"));
        }
        self.inner.upload(stream, logical_name).await
    }

    async fn upload_bytes(&self, data: Bytes, logical_name: &str) -> StorageResult<ObjectRef> {
        self.upload(media_store::ports::storage::bytes_stream(data), logical_name)
            .await
    }

    async fn download(&self, object_ref: &ObjectRef) -> StorageResult<ByteStream> {
        if let Some(prefix) = &self.fail_reads_under {
            if object_ref.as_str().starts_with(prefix.as_str()) {
                return Err(StorageError::backend("read rejected", "injected failure"));
            }
        }
        self.inner.download(object_ref).await
    }

    async fn delete(&self, object_ref: &ObjectRef) -> StorageResult<()> {
        self.inner.delete(object_ref).await
    }

    fn internal_url(&self, object_ref: &ObjectRef) -> String {
        self.inner.internal_url(object_ref)
    }

    fn public_url(&self, object_ref: &ObjectRef) -> String {
        self.inner.public_url(object_ref)
    }

    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration) -> StorageResult<PresignedUrl> {
        self.inner.presigned_url(object_ref, ttl).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
