//! S3 storage adapter implementation using the object_store crate
//!
//! Works against AWS and any S3-compatible endpoint. Chunked uploads map to
//! native multipart uploads and presigned URLs are SigV4 query signatures.

pub mod s3_adapter;

pub use s3_adapter::{S3Storage, S3Urls};

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    ClientOptions,
};

/// Per-request timeout for S3 calls, the same budget as filer calls
pub const DEFAULT_S3_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for S3 storage backend
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Custom endpoint for S3-compatible services, always addressed path-style
    pub endpoint: Option<String>,
    /// Base of externally reachable URLs, e.g. a CDN in front of the bucket
    pub public_base_url: Option<String>,
    /// Address buckets as `<endpoint>/<bucket>` even on AWS
    pub force_path_style: bool,
    pub allow_http: bool,
    pub request_timeout: Duration,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            access_key: None,
            secret_key: None,
            endpoint: None,
            public_base_url: None,
            force_path_style: false,
            allow_http: false,
            request_timeout: DEFAULT_S3_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    pub fn urls(&self) -> S3Urls {
        S3Urls {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

/// Create an S3 client from configuration. The same client serves puts,
/// multipart uploads and URL signing.
pub fn create_s3_client(config: &S3Config) -> Result<Arc<AmazonS3>> {
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region)
        .with_client_options(ClientOptions::new().with_timeout(config.request_timeout))
        .with_allow_http(config.allow_http)
        .with_virtual_hosted_style_request(!config.force_path_style && config.endpoint.is_none());

    if let Some(access_key) = &config.access_key {
        builder = builder.with_access_key_id(access_key);
    }

    if let Some(secret_key) = &config.secret_key {
        builder = builder.with_secret_access_key(secret_key);
    }

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }

    let store = builder.build().context("Failed to build S3 store")?;

    Ok(Arc::new(store))
}
