//! SeaweedFS storage adapter speaking the filer HTTP API
//!
//! Objects are addressed by path under a root directory, so the logical name
//! is the object reference. Chunked uploads append to a hidden staging file
//! that is renamed onto the final path once every part has landed.

pub mod filer_adapter;

pub use filer_adapter::FilerStorage;

use std::time::Duration;

/// Timeout for every filer and master call
pub const DEFAULT_FILER_TIMEOUT: Duration = Duration::from_secs(10);

/// Directory, relative to the root, that holds in-progress chunked uploads
pub const STAGING_DIR: &str = ".uploads";

/// Configuration for the SeaweedFS backend
#[derive(Debug, Clone)]
pub struct FilerConfig {
    /// Filer base URL, e.g. `http://localhost:8888`
    pub filer_url: String,
    /// Master base URL, used for health checks
    pub master_url: String,
    /// Directory under which every object is stored
    pub root_dir: String,
    /// Base of externally reachable URLs; defaults to the filer URL
    pub public_url: Option<String>,
    /// HS256 key matching the filer's `jwt.filer_signing.read.key`
    pub jwt_signing_key: Option<String>,
    pub request_timeout: Duration,
}

impl FilerConfig {
    pub fn new(filer_url: impl Into<String>, master_url: impl Into<String>) -> Self {
        Self {
            filer_url: filer_url.into(),
            master_url: master_url.into(),
            root_dir: "media".to_string(),
            public_url: None,
            jwt_signing_key: None,
            request_timeout: DEFAULT_FILER_TIMEOUT,
        }
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<String>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    pub fn with_jwt_signing_key(mut self, key: impl Into<String>) -> Self {
        self.jwt_signing_key = Some(key.into());
        self
    }
}
