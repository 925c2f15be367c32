use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::{
    domain::{
        errors::{MediaError, MediaResult},
        models::{content_type_for_name, CacheStatus, TransformSpec, TransformedArtifact},
        value_objects::{CacheKey, ObjectRef},
    },
    ports::{storage::StorageProvider, transform::ImageTransformer},
};

/// Cache-aside layer between callers and the transform engine.
///
/// Derivatives are stored next to the originals under [`CacheKey`]s. A cache
/// read failure counts as a miss and a cache write failure is only logged,
/// so the cache can degrade but never fail a request. Sources whose name
/// leaves no room for a cache key are transformed on every request.
#[derive(Clone)]
pub struct TransformCache {
    storage: Arc<dyn StorageProvider>,
    transformer: Arc<dyn ImageTransformer>,
}

impl TransformCache {
    pub fn new(storage: Arc<dyn StorageProvider>, transformer: Arc<dyn ImageTransformer>) -> Self {
        Self {
            storage,
            transformer,
        }
    }

    pub async fn fetch(&self, source: &ObjectRef, spec: &TransformSpec) -> MediaResult<TransformedArtifact> {
        if spec.is_passthrough() {
            let data = self.storage.download_bytes(source).await?;
            debug!(object_ref = %source, "nothing to transform, serving original");
            return Ok(TransformedArtifact {
                content_type: sniff_content_type(&data, source.as_str()),
                data,
                cache_status: CacheStatus::Bypass,
                fresh: spec.fresh,
            });
        }

        let key = match CacheKey::derive(source, spec) {
            Ok(key) => key,
            Err(err) => {
                warn!(object_ref = %source, error = %err, "no cache key for source, serving uncached");
                let original = self.storage.download_bytes(source).await?;
                let output = self.run_transform(original, spec.clone()).await?;
                return Ok(self.artifact(output, spec, CacheStatus::Miss));
            }
        };

        if !spec.fresh {
            if let Some(data) = self.lookup(&key).await {
                debug!(cache_key = %key, "cache hit");
                return Ok(self.artifact(data, spec, CacheStatus::Hit));
            }
        }

        let original = self.storage.download_bytes(source).await?;
        let output = self.run_transform(original, spec.clone()).await?;

        if let Err(err) = self.storage.upload_bytes(output.clone(), key.as_str()).await {
            warn!(cache_key = %key, error = %err, "failed to store transformed image");
        } else {
            debug!(cache_key = %key, bytes = output.len(), "stored transformed image");
        }

        Ok(self.artifact(output, spec, CacheStatus::Miss))
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Bytes> {
        match self.storage.download_bytes(key.as_object_ref()).await {
            Ok(data) => Some(data),
            Err(err) if err.is_not_found() => {
                debug!(cache_key = %key, "cache miss");
                None
            }
            Err(err) => {
                warn!(cache_key = %key, error = %err, "cache lookup failed, recomputing");
                None
            }
        }
    }

    async fn run_transform(&self, original: Bytes, spec: TransformSpec) -> MediaResult<Bytes> {
        let transformer = self.transformer.clone();
        let output = tokio::task::spawn_blocking(move || transformer.transform(&original, &spec))
            .await
            .map_err(|e| MediaError::TaskFailed(e.to_string()))??;
        Ok(output)
    }

    fn artifact(&self, data: Bytes, spec: &TransformSpec, cache_status: CacheStatus) -> TransformedArtifact {
        let content_type = match spec.format {
            Some(format) => format.content_type().to_string(),
            None => sniff_content_type(&data, ""),
        };
        TransformedArtifact {
            data,
            content_type,
            cache_status,
            fresh: spec.fresh,
        }
    }
}

fn sniff_content_type(data: &[u8], name: &str) -> String {
    match image::guess_format(data) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => content_type_for_name(name).to_string(),
    }
}
