use std::{sync::Arc, time::Duration};

use crate::{
    adapters::outbound::{
        storage::{ChunkPolicy, FilerConfig, FilerStorage, S3Config, S3Storage},
        transform::RasterTransformer,
    },
    ports::{storage::StorageProvider, transform::ImageTransformer},
    services::{IngestConfig, MediaServiceImpl, DEFAULT_MAX_UPLOAD_SIZE},
};

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub max_upload_size: u64,
    pub chunking: ChunkPolicy,
    pub ingest: IngestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::InMemory,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            chunking: ChunkPolicy::default(),
            ingest: IngestConfig::default(),
        }
    }
}

/// Storage backend configuration, resolved once at start-up
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    S3(S3Config),
    DistributedFs(FilerConfig),
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::InMemory => "memory",
            StorageBackend::S3(_) => "s3",
            StorageBackend::DistributedFs(_) => "seaweedfs",
        }
    }
}

impl AppConfig {
    /// Read the configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source shaped like the
    /// process environment. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader(lookup);

        let storage = match env.or("STORAGE_PROVIDER", "seaweedfs").to_ascii_lowercase().as_str() {
            "s3" => {
                let bucket = env.get("AWS_BUCKET_NAME").ok_or_else(|| AppError::Configuration {
                    message: "AWS_BUCKET_NAME environment variable required".to_string(),
                })?;
                let mut config = S3Config::new(bucket, env.or("AWS_REGION", "us-east-1"));
                config.access_key = env.get("AWS_ACCESS_KEY_ID");
                config.secret_key = env.get("AWS_SECRET_ACCESS_KEY");
                config.endpoint = env.get("AWS_ENDPOINT");
                config.public_base_url = env.get("AWS_PUBLIC_URL");
                config.force_path_style = env.flag("AWS_FORCE_PATH_STYLE");
                config.allow_http = config
                    .endpoint
                    .as_deref()
                    .is_some_and(|e| e.starts_with("http://"));
                StorageBackend::S3(config)
            }
            "seaweedfs" | "distributed-fs" => {
                let mut config = FilerConfig::new(
                    env.or("SEAWEEDFS_FILER_URL", "http://localhost:8888"),
                    env.or("SEAWEEDFS_MASTER_URL", "http://localhost:9333"),
                )
                .with_root_dir(env.or("SEAWEEDFS_ROOT_DIR", "media"));
                config.public_url = env.get("SEAWEEDFS_PUBLIC_URL");
                config.jwt_signing_key = env.get("SEAWEEDFS_JWT_SIGNING_KEY");
                StorageBackend::DistributedFs(config)
            }
            "memory" => StorageBackend::InMemory,
            other => {
                return Err(AppError::Configuration {
                    message: format!("unknown STORAGE_PROVIDER {:?}", other),
                })
            }
        };

        let ingest = IngestConfig {
            concurrency: env.parse("IMPORT_CONCURRENCY", IngestConfig::default().concurrency)?,
            fetch_timeout: Duration::from_secs(env.parse(
                "IMPORT_TIMEOUT_SECS",
                IngestConfig::default().fetch_timeout.as_secs(),
            )?),
        };

        Ok(Self {
            storage,
            max_upload_size: env.parse("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE)?,
            chunking: ChunkPolicy::default(),
            ingest,
        })
    }
}

struct EnvReader<F>(F);

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "yes")
        )
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, AppError> {
        match self.get(key) {
            Some(value) => value.trim().parse().map_err(|_| AppError::Configuration {
                message: format!("{} must be a number, got {:?}", key, value),
            }),
            None => Ok(default),
        }
    }
}

/// Application dependencies container
pub struct AppDependencies {
    pub storage: Arc<dyn StorageProvider>,
    pub transformer: Arc<dyn ImageTransformer>,
}

/// Application services container
pub struct AppServices {
    pub media_service: MediaServiceImpl,
    pub storage: Arc<dyn StorageProvider>,
}

/// Application builder for dependency injection
pub struct AppBuilder {
    config: AppConfig,
    storage: Option<Arc<dyn StorageProvider>>,
}

impl AppBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            storage: None,
        }
    }

    /// Configure the application with custom settings
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure storage backend
    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage = backend;
        self
    }

    /// Use an already constructed provider instead of the configured backend
    pub fn with_storage(mut self, storage: Arc<dyn StorageProvider>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_max_upload_size(mut self, max_upload_size: u64) -> Self {
        self.config.max_upload_size = max_upload_size;
        self
    }

    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.config.chunking = policy;
        self
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.config.ingest = ingest;
        self
    }

    /// Build the application dependencies
    pub fn build_dependencies(&self) -> Result<AppDependencies, AppError> {
        let storage = match &self.storage {
            Some(storage) => storage.clone(),
            None => self.create_storage()?,
        };
        Ok(AppDependencies {
            storage,
            transformer: Arc::new(RasterTransformer::new()),
        })
    }

    /// Build the complete application with services
    pub fn build(self) -> Result<AppServices, AppError> {
        let deps = self.build_dependencies()?;

        let media_service = MediaServiceImpl::new(
            deps.storage.clone(),
            deps.transformer,
            self.config.max_upload_size,
            self.config.ingest,
        )
        .map_err(|e| AppError::ServiceInit {
            message: e.to_string(),
        })?;

        tracing::debug!(
            backend = self.config.storage.name(),
            max_upload_size = self.config.max_upload_size,
            "application assembled"
        );

        Ok(AppServices {
            media_service,
            storage: deps.storage,
        })
    }

    /// Create the storage provider based on configuration
    fn create_storage(&self) -> Result<Arc<dyn StorageProvider>, AppError> {
        let policy = self.config.chunking;
        match &self.config.storage {
            StorageBackend::InMemory => Ok(Arc::new(S3Storage::in_memory(policy))),
            StorageBackend::S3(config) => {
                let storage = S3Storage::new(config, policy).map_err(|e| AppError::StorageInit {
                    message: format!("{:#}", e),
                })?;
                Ok(Arc::new(storage))
            }
            StorageBackend::DistributedFs(config) => {
                let storage = FilerStorage::new(config, policy).map_err(|e| AppError::StorageInit {
                    message: e.to_string(),
                })?;
                Ok(Arc::new(storage))
            }
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage initialization error: {message}")]
    StorageInit { message: String },

    #[error("Service initialization error: {message}")]
    ServiceInit { message: String },
}

/// Convenience functions for common configurations
///
/// Create an in-memory application for testing and development
pub fn create_in_memory_app() -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_storage_backend(StorageBackend::InMemory)
        .build()
}

/// Create an S3-backed application
pub fn create_s3_app(config: S3Config) -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_storage_backend(StorageBackend::S3(config))
        .build()
}

/// Create a SeaweedFS-backed application
pub fn create_seaweedfs_app(config: FilerConfig) -> Result<AppServices, AppError> {
    AppBuilder::new()
        .with_storage_backend(StorageBackend::DistributedFs(config))
        .build()
}

/// Create application from environment variables
pub fn create_app_from_env() -> Result<AppServices, AppError> {
    AppBuilder::new().with_config(AppConfig::from_env()?).build()
}
