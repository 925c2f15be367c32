use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header::CONTENT_TYPE, Client, Url};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{
    stream_limit::limit_stream,
    upload_metadata::{capture_head, UploadMetadata, HEAD_CAPTURE_SIZE},
};
use crate::{
    domain::{
        errors::StorageError,
        models::{
            extension_for_content_type, unique_upload_name, BulkImportReport,
            ImportRequest, ImportResult, UploadResult,
        },
    },
    ports::storage::StorageProvider,
};

/// Parallel downloads per bulk import
pub const DEFAULT_IMPORT_CONCURRENCY: usize = 5;
/// Timeout for a single remote download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for remote ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    pub concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_IMPORT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Why a single URL could not be imported
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("download timed out")]
    Timeout,

    #[error("download failed: {0}")]
    Request(String),

    #[error("remote server answered {0}")]
    Status(u16),

    #[error("file too large: exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("empty download")]
    Empty,

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImportError::Timeout
        } else {
            ImportError::Request(err.to_string())
        }
    }
}

/// Pulls remote files into storage with a bounded number in flight
#[derive(Clone)]
pub struct BulkImporter {
    storage: Arc<dyn StorageProvider>,
    client: Client,
    concurrency: usize,
}

impl BulkImporter {
    pub fn new(storage: Arc<dyn StorageProvider>, config: IngestConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| StorageError::backend("failed to build download client", e))?;
        Ok(Self {
            storage,
            client,
            concurrency: config.concurrency.max(1),
        })
    }

    /// Import every request, at most `concurrency` at a time. Results come
    /// back in input order whatever order the downloads finish in.
    pub async fn import_all(&self, requests: Vec<ImportRequest>, max_bytes: u64) -> BulkImportReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let importer = self.clone();
                let semaphore = semaphore.clone();
                let url = request.url.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| ImportError::Request(e.to_string()))?;
                    importer.import_one(&request, max_bytes).await
                });
                (url, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in handles {
            let result = match handle.await {
                Ok(Ok(upload)) => ImportResult::imported(url, upload),
                Ok(Err(err)) => {
                    debug!(url = %url, error = %err, "import failed");
                    ImportResult::failed(url, err.to_string())
                }
                Err(err) => ImportResult::failed(url, format!("import task failed: {}", err)),
            };
            results.push(result);
        }

        let report = BulkImportReport::from_results(results);
        info!(
            total = report.total,
            succeeded = report.success_count,
            "bulk import finished"
        );
        report
    }

    async fn import_one(&self, request: &ImportRequest, max_bytes: u64) -> Result<UploadResult, ImportError> {
        let url = Url::parse(&request.url).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ImportError::InvalidUrl(format!("unsupported scheme {}", url.scheme())));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImportError::Status(response.status().as_u16()));
        }
        if let Some(declared) = response.content_length() {
            if declared > max_bytes {
                return Err(ImportError::TooLarge { limit: max_bytes });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = derive_file_name(request.filename.as_deref(), response.url(), content_type.as_deref());
        let logical_name = unique_upload_name(&file_name);

        let body = response
            .bytes_stream()
            .map_err(|e| {
                if e.is_timeout() {
                    std::io::Error::new(std::io::ErrorKind::TimedOut, "download timed out")
                } else {
                    std::io::Error::other(e)
                }
            })
            .boxed();
        let (body, received) = limit_stream(body, max_bytes);
        let (body, head) = capture_head(body, HEAD_CAPTURE_SIZE);

        let object_ref = match self.storage.upload(body, &logical_name).await {
            Ok(object_ref) => object_ref,
            Err(_) if received.load(Ordering::Relaxed) > max_bytes => {
                return Err(ImportError::TooLarge { limit: max_bytes })
            }
            Err(StorageError::TimedOut { .. }) => return Err(ImportError::Timeout),
            Err(err) => return Err(err.into()),
        };

        let size = received.load(Ordering::Relaxed);
        if size == 0 {
            if let Err(err) = self.storage.delete(&object_ref).await {
                warn!(object_ref = %object_ref, error = %err, "failed to remove empty import");
            }
            return Err(ImportError::Empty);
        }

        let metadata = UploadMetadata::sniff(&head.bytes(), content_type.as_deref(), &file_name);
        info!(url = %request.url, object_ref = %object_ref, size, "imported remote file");
        Ok(UploadResult {
            internal_url: self.storage.internal_url(&object_ref),
            public_url: self.storage.public_url(&object_ref),
            width: metadata.width(),
            height: metadata.height(),
            content_type: metadata.content_type,
            object_ref,
            size,
        })
    }
}

/// Explicit name, else the last URL path segment, else a timestamped name
/// with an extension matching the content type
pub fn derive_file_name(explicit: Option<&str>, url: &Url, content_type: Option<&str>) -> String {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(segment) = last_segment {
        return segment.to_string();
    }

    format!(
        "download_{}{}",
        Utc::now().timestamp(),
        extension_for_content_type(content_type.unwrap_or_default())
    )
}
