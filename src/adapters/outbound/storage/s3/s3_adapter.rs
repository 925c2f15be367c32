use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use object_store::{
    memory::InMemory,
    multipart::{MultipartStore, PartId},
    path::Path as ObjectPath,
    signer::Signer,
    Attribute, Attributes, MultipartId, ObjectStore as ObjectStoreBackend, PutOptions, PutPayload,
};
use tracing::{debug, info};

use super::{create_s3_client, S3Config};
use crate::{
    adapters::outbound::storage::chunked::{upload_chunked, ChunkPolicy, ChunkedTarget, MultipartSession},
    domain::{
        errors::{StorageError, StorageResult},
        models::{content_type_for_name, PresignedUrl},
        value_objects::ObjectRef,
    },
    ports::storage::{bytes_stream, BackendKind, ByteStream, CompletedPart, StorageProvider},
};

/// Longest lifetime SigV4 accepts for a presigned URL
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Key used by the health probe; its absence is the expected answer
const HEALTH_PROBE_KEY: &str = "_health/probe";

/// Address layout for a bucket
#[derive(Debug, Clone)]
pub struct S3Urls {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

impl S3Urls {
    pub fn internal(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }

    pub fn public(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => self.internal(key),
        }
    }
}

/// S3 storage adapter that implements the StorageProvider trait
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStoreBackend>,
    multipart: Arc<dyn MultipartStore>,
    signer: Option<Arc<dyn Signer>>,
    urls: S3Urls,
    policy: ChunkPolicy,
    kind: BackendKind,
}

impl S3Storage {
    /// Connect to the bucket described by `config`
    pub fn new(config: &S3Config, policy: ChunkPolicy) -> anyhow::Result<Self> {
        let client = create_s3_client(config)?;
        Ok(Self {
            store: client.clone(),
            multipart: client.clone(),
            signer: Some(client),
            urls: config.urls(),
            policy,
            kind: BackendKind::S3,
        })
    }

    /// Assemble an adapter from individual stores. Used to put S3 semantics
    /// on top of other object_store implementations.
    pub fn from_stores(
        store: Arc<dyn ObjectStoreBackend>,
        multipart: Arc<dyn MultipartStore>,
        urls: S3Urls,
        policy: ChunkPolicy,
    ) -> Self {
        Self {
            store,
            multipart,
            signer: None,
            urls,
            policy,
            kind: BackendKind::S3,
        }
    }

    /// Process-local store for development and tests; cannot sign URLs
    pub fn in_memory(policy: ChunkPolicy) -> Self {
        let memory = Arc::new(InMemory::new());
        let urls = S3Urls {
            bucket: "media".to_string(),
            region: "local".to_string(),
            endpoint: Some("memory://local".to_string()),
            public_base_url: None,
        };
        let mut storage = Self::from_stores(memory.clone(), memory, urls, policy);
        storage.kind = BackendKind::InMemory;
        storage
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    fn to_object_path(name: &str) -> StorageResult<ObjectPath> {
        ObjectRef::new(name).map_err(|e| StorageError::InvalidObjectRef {
            reason: e.to_string(),
        })?;
        ObjectPath::parse(name).map_err(|e| StorageError::InvalidObjectRef {
            reason: e.to_string(),
        })
    }

    fn to_object_ref(name: &str) -> StorageResult<ObjectRef> {
        ObjectRef::new(name).map_err(|e| StorageError::InvalidObjectRef {
            reason: e.to_string(),
        })
    }
}

struct S3MultipartSession {
    multipart: Arc<dyn MultipartStore>,
    path: ObjectPath,
    id: MultipartId,
}

#[async_trait]
impl MultipartSession for S3MultipartSession {
    async fn upload_part(&mut self, part_number: u32, data: Bytes) -> StorageResult<CompletedPart> {
        let size = data.len() as u64;
        // object_store counts parts from zero
        let part = self
            .multipart
            .put_part(&self.path, &self.id, part_number as usize - 1, PutPayload::from(data))
            .await?;
        Ok(CompletedPart {
            part_number,
            etag: part.content_id,
            size,
        })
    }

    async fn complete(&mut self, parts: Vec<CompletedPart>) -> StorageResult<()> {
        let parts = parts
            .into_iter()
            .map(|p| PartId { content_id: p.etag })
            .collect();
        self.multipart
            .complete_multipart(&self.path, &self.id, parts)
            .await?;
        Ok(())
    }

    async fn abort(&mut self) -> StorageResult<()> {
        self.multipart.abort_multipart(&self.path, &self.id).await?;
        debug!(path = %self.path, "aborted multipart upload");
        Ok(())
    }
}

#[async_trait]
impl ChunkedTarget for S3Storage {
    async fn put_single(&self, name: &str, data: Bytes) -> StorageResult<()> {
        let path = Self::to_object_path(name)?;
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type_for_name(name).into());
        self.store
            .put_opts(&path, PutPayload::from(data), PutOptions::from(attributes))
            .await?;
        Ok(())
    }

    async fn begin_multipart(&self, name: &str) -> StorageResult<Box<dyn MultipartSession>> {
        let path = Self::to_object_path(name)?;
        let id = self.multipart.create_multipart(&path).await?;
        Ok(Box::new(S3MultipartSession {
            multipart: self.multipart.clone(),
            path,
            id,
        }))
    }
}

#[async_trait]
impl StorageProvider for S3Storage {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn upload(&self, stream: ByteStream, logical_name: &str) -> StorageResult<ObjectRef> {
        let object_ref = Self::to_object_ref(logical_name)?;
        let size = upload_chunked(self, logical_name, stream, self.policy).await?;
        info!(backend = %self.kind, object = %object_ref, size, "stored object");
        Ok(object_ref)
    }

    async fn upload_bytes(&self, data: Bytes, logical_name: &str) -> StorageResult<ObjectRef> {
        self.upload(bytes_stream(data), logical_name).await
    }

    async fn download(&self, object_ref: &ObjectRef) -> StorageResult<ByteStream> {
        let path = Self::to_object_path(object_ref.as_str())?;
        let result = self.store.get(&path).await?;
        Ok(result
            .into_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }

    async fn delete(&self, object_ref: &ObjectRef) -> StorageResult<()> {
        let path = Self::to_object_path(object_ref.as_str())?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn internal_url(&self, object_ref: &ObjectRef) -> String {
        self.urls.internal(object_ref.as_str())
    }

    fn public_url(&self, object_ref: &ObjectRef) -> String {
        self.urls.public(object_ref.as_str())
    }

    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration) -> StorageResult<PresignedUrl> {
        if ttl.is_zero() || ttl > MAX_PRESIGN_TTL {
            return Err(StorageError::SigningFailure {
                message: format!(
                    "ttl must be between 1 second and {} seconds, got {}",
                    MAX_PRESIGN_TTL.as_secs(),
                    ttl.as_secs()
                ),
            });
        }
        let signer = self.signer.as_ref().ok_or_else(|| StorageError::SigningFailure {
            message: format!("{} backend has no URL signer configured", self.kind),
        })?;

        let path = Self::to_object_path(object_ref.as_str())?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).map_err(|e| StorageError::SigningFailure {
                message: e.to_string(),
            })?;
        let url = signer
            .signed_url(http::Method::GET, &path, ttl)
            .await
            .map_err(|e| StorageError::SigningFailure {
                message: e.to_string(),
            })?;

        Ok(PresignedUrl {
            url: url.to_string(),
            expires_at,
        })
    }

    async fn health_check(&self) -> StorageResult<()> {
        let path = ObjectPath::from(HEALTH_PROBE_KEY);
        match self.store.head(&path).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
