use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{
    header::{CONTENT_LENGTH, ETAG},
    multipart::{Form, Part},
    Client, Response, StatusCode, Url,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{FilerConfig, STAGING_DIR};
use crate::{
    adapters::outbound::storage::{
        chunked::{check_assembled_size, upload_chunked, ChunkPolicy, ChunkedTarget, MultipartSession},
        error::StoreError,
    },
    domain::{
        errors::{StorageError, StorageResult},
        models::{content_type_for_name, PresignedUrl},
        value_objects::ObjectRef,
    },
    ports::storage::{bytes_stream, validate_part_sequence, BackendKind, ByteStream, CompletedPart, StorageProvider},
};

/// Claims carried by a read token
#[derive(Debug, Serialize)]
struct ReadClaims {
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Thin HTTP client over the filer's path API
#[derive(Clone)]
struct FilerClient {
    http: Client,
    filer_url: Url,
}

impl FilerClient {
    fn url(&self, path: &str) -> Url {
        object_url(&self.filer_url, path)
    }

    fn file_part(name: &str, data: Bytes) -> StorageResult<Part> {
        let len = data.len() as u64;
        let file_name = name.rsplit('/').next().unwrap_or(name).to_string();
        Ok(Part::stream_with_length(data, len)
            .file_name(file_name)
            .mime_str(content_type_for_name(name))?)
    }

    /// Fail on any non-2xx answer, folding the status into a storage error
    async fn check(response: Response, path: &str) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::ObjectNotFound {
                key: path.to_string(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::http(status.as_u16(), format!("{}: {}", path, body.trim())).into())
    }

    async fn post_file(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let form = Form::new().part("file", Self::file_part(path, data)?);
        let response = self.http.post(self.url(path)).multipart(form).send().await?;
        Self::check(response, path).await?;
        Ok(())
    }

    async fn append(&self, path: &str, data: Bytes) -> StorageResult<Option<String>> {
        let form = Form::new().part("file", Self::file_part(path, data)?);
        let response = self
            .http
            .post(self.url(path))
            .query(&[("op", "append")])
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response, path).await?;
        Ok(response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .filter(|v| !v.is_empty()))
    }

    /// Size as reported by a HEAD request. The header is read directly since
    /// HEAD responses carry no body to measure.
    async fn stat_size(&self, path: &str) -> StorageResult<u64> {
        let response = self.http.head(self.url(path)).send().await?;
        let response = Self::check(response, path).await?;
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| StorageError::io(format!("filer reported no size for {}", path)))
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let response = self
            .http
            .post(self.url(to))
            .query(&[("mv.from", from)])
            .send()
            .await?;
        Self::check(response, to).await?;
        Ok(())
    }

    /// Delete a file or directory tree; absence is success
    async fn remove(&self, path: &str, recursive: bool) -> StorageResult<()> {
        let mut request = self.http.delete(self.url(path));
        if recursive {
            request = request.query(&[("recursive", "true")]);
        }
        match Self::check(request.send().await?, path).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// SeaweedFS storage adapter that implements the StorageProvider trait
#[derive(Clone)]
pub struct FilerStorage {
    client: FilerClient,
    master_url: String,
    root: String,
    public_url: Url,
    signing_key: Option<EncodingKey>,
    policy: ChunkPolicy,
}

impl FilerStorage {
    pub fn new(config: &FilerConfig, policy: ChunkPolicy) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::backend("failed to build filer HTTP client", e))?;

        let filer_url = parse_base_url("filer", &config.filer_url)?;
        let root = config.root_dir.trim_matches('/');
        let root = if root.is_empty() {
            String::new()
        } else {
            format!("/{}", root)
        };

        Ok(Self {
            public_url: match config.public_url.as_deref() {
                Some(public_url) => parse_base_url("public", public_url)?,
                None => filer_url.clone(),
            },
            client: FilerClient { http, filer_url },
            master_url: config.master_url.trim_end_matches('/').to_string(),
            root,
            signing_key: config
                .jwt_signing_key
                .as_deref()
                .map(|key| EncodingKey::from_secret(key.as_bytes())),
            policy,
        })
    }

    /// Absolute filer path of an object
    fn path(&self, name: &str) -> String {
        format!("{}/{}", self.root, name)
    }

    fn staging_dir(&self, upload_id: &str) -> String {
        format!("{}/{}/{}", self.root, STAGING_DIR, upload_id)
    }

    fn to_object_ref(name: &str) -> StorageResult<ObjectRef> {
        ObjectRef::new(name).map_err(|e| StorageError::InvalidObjectRef {
            reason: e.to_string(),
        })
    }

    fn sign(&self, path: &str, ttl: Duration) -> StorageResult<(String, chrono::DateTime<Utc>)> {
        let key = self.signing_key.as_ref().ok_or_else(|| StorageError::SigningFailure {
            message: "no filer JWT signing key configured".to_string(),
        })?;

        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(ttl).map_err(|e| StorageError::SigningFailure {
                message: e.to_string(),
            })?;
        let claims = ReadClaims {
            sub: path.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, key)
            .map_err(|e| StoreError::Signing(e.to_string()))?;
        Ok((token, expires_at))
    }
}

/// Parse a base URL that object paths get appended to
fn parse_base_url(which: &str, raw: &str) -> StorageResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| StorageError::backend(format!("invalid {} URL {:?}", which, raw), e))?;
    if url.cannot_be_a_base() {
        return Err(StorageError::backend(
            format!("invalid {} URL {:?}", which, raw),
            "URL cannot carry a path",
        ));
    }
    Ok(url)
}

/// Append a filer path to `base`, percent-encoding every segment so that
/// `#`, `?`, `%` and spaces stay part of the object name
fn object_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(path.trim_start_matches('/').split('/'));
    }
    url
}

struct FilerMultipartSession {
    client: FilerClient,
    upload_id: String,
    staging_dir: String,
    staging_path: String,
    final_path: String,
}

#[async_trait]
impl MultipartSession for FilerMultipartSession {
    async fn upload_part(&mut self, part_number: u32, data: Bytes) -> StorageResult<CompletedPart> {
        let size = data.len() as u64;
        let digest = format!("{:x}", md5::compute(&data));
        let etag = self
            .client
            .append(&self.staging_path, data)
            .await?
            .unwrap_or(digest);
        debug!(upload_id = %self.upload_id, part_number, size, "appended part");
        Ok(CompletedPart {
            part_number,
            etag,
            size,
        })
    }

    async fn complete(&mut self, parts: Vec<CompletedPart>) -> StorageResult<()> {
        validate_part_sequence(&parts)?;
        let expected: u64 = parts.iter().map(|p| p.size).sum();
        let staged = self.client.stat_size(&self.staging_path).await?;
        check_assembled_size(&self.final_path, expected, staged)?;

        self.client.rename(&self.staging_path, &self.final_path).await?;

        if let Err(err) = self.client.remove(&self.staging_dir, true).await {
            warn!(upload_id = %self.upload_id, error = %err, "failed to clean staging directory");
        }
        Ok(())
    }

    async fn abort(&mut self) -> StorageResult<()> {
        self.client.remove(&self.staging_dir, true).await?;
        debug!(upload_id = %self.upload_id, "aborted chunked upload");
        Ok(())
    }
}

#[async_trait]
impl ChunkedTarget for FilerStorage {
    async fn put_single(&self, name: &str, data: Bytes) -> StorageResult<()> {
        self.client.post_file(&self.path(name), data).await
    }

    async fn begin_multipart(&self, name: &str) -> StorageResult<Box<dyn MultipartSession>> {
        let upload_id = Uuid::new_v4().to_string();
        let staging_dir = self.staging_dir(&upload_id);
        let file_name = name.rsplit('/').next().unwrap_or(name);
        Ok(Box::new(FilerMultipartSession {
            client: self.client.clone(),
            staging_path: format!("{}/{}", staging_dir, file_name),
            staging_dir,
            upload_id,
            final_path: self.path(name),
        }))
    }
}

#[async_trait]
impl StorageProvider for FilerStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::DistributedFs
    }

    async fn upload(&self, stream: ByteStream, logical_name: &str) -> StorageResult<ObjectRef> {
        let object_ref = Self::to_object_ref(logical_name)?;
        let size = upload_chunked(self, logical_name, stream, self.policy).await?;
        info!(backend = "distributed-fs", object = %object_ref, size, "stored object");
        Ok(object_ref)
    }

    async fn upload_bytes(&self, data: Bytes, logical_name: &str) -> StorageResult<ObjectRef> {
        self.upload(bytes_stream(data), logical_name).await
    }

    async fn download(&self, object_ref: &ObjectRef) -> StorageResult<ByteStream> {
        let path = self.path(object_ref.as_str());
        let response = self.client.http.get(self.client.url(&path)).send().await?;
        let response = match FilerClient::check(response, &path).await {
            Ok(response) => response,
            Err(err) if err.is_not_found() => {
                return Err(StorageError::ObjectNotFound {
                    key: object_ref.to_string(),
                })
            }
            Err(err) => return Err(err),
        };
        Ok(response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed())
    }

    async fn delete(&self, object_ref: &ObjectRef) -> StorageResult<()> {
        self.client.remove(&self.path(object_ref.as_str()), false).await
    }

    fn internal_url(&self, object_ref: &ObjectRef) -> String {
        self.client.url(&self.path(object_ref.as_str())).to_string()
    }

    fn public_url(&self, object_ref: &ObjectRef) -> String {
        object_url(&self.public_url, &self.path(object_ref.as_str())).to_string()
    }

    async fn presigned_url(&self, object_ref: &ObjectRef, ttl: Duration) -> StorageResult<PresignedUrl> {
        if ttl.is_zero() {
            return Err(StorageError::SigningFailure {
                message: "ttl must be positive".to_string(),
            });
        }
        let path = self.path(object_ref.as_str());
        let (token, expires_at) = self.sign(&path, ttl)?;
        let mut url = object_url(&self.public_url, &path);
        url.query_pairs_mut().append_pair("jwt", &token);
        Ok(PresignedUrl {
            url: url.to_string(),
            expires_at,
        })
    }

    async fn health_check(&self) -> StorageResult<()> {
        let url = format!("{}/cluster/status", self.master_url);
        let response = self.client.http.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::BackendUnavailable {
                message: format!("master answered {}", response.status()),
                source: Some(url),
            })
        }
    }
}
